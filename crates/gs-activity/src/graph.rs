//! `DependencyGraph` — predecessor/successor edges between activities.
//!
//! Edges are stored on both endpoints and keyed by `ActionId`, so neither
//! side owns the other: removing an activity walks its two adjacency lists
//! and erases the mirrored entries.  Nothing can dangle.
//!
//! # Edge consumption
//!
//! ```text
//!   complete(a):  for b in successors(a):  predecessors(b) -= a
//!                 b is returned if predecessors(b) is now empty
//! ```
//!
//! Successors are visited in the order their edges were added.

use std::collections::{BTreeMap, BTreeSet};

use gs_core::ActionId;
use tracing::trace;

use crate::{ActivityError, ActivityResult};

#[derive(Default, Clone, Debug)]
struct Node {
    predecessors: BTreeSet<ActionId>,
    successors:   Vec<ActionId>,
    started:      bool,
}

/// Dependency edges of every registered activity.
#[derive(Default, Clone, Debug)]
pub struct DependencyGraph {
    nodes: BTreeMap<ActionId, Node>,
    edges: usize,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an activity with no edges.
    pub fn insert(&mut self, id: ActionId) -> ActivityResult<()> {
        if self.nodes.contains_key(&id) {
            return Err(ActivityError::DuplicateActivity(id));
        }
        self.nodes.insert(id, Node::default());
        Ok(())
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of registered activities.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    // ── Edges ─────────────────────────────────────────────────────────────

    /// Make `to` wait for `from`.
    ///
    /// Fails on a self-edge, a duplicate edge, a successor that already
    /// started, or an edge that would close a cycle.
    pub fn add_successor(&mut self, from: ActionId, to: ActionId) -> ActivityResult<()> {
        if from == to {
            return Err(ActivityError::SelfEdge(from));
        }
        let source = self.node(from)?;
        if source.successors.contains(&to) {
            return Err(ActivityError::DuplicateEdge { from, to });
        }
        if self.node(to)?.started {
            return Err(ActivityError::SuccessorStarted { from, to });
        }
        if self.reaches(to, from) {
            return Err(ActivityError::Cycle { from, to });
        }
        self.node_mut(from)?.successors.push(to);
        self.node_mut(to)?.predecessors.insert(from);
        self.edges += 1;
        trace!(%from, %to, "dependency added");
        Ok(())
    }

    pub fn remove_successor(&mut self, from: ActionId, to: ActionId) -> ActivityResult<()> {
        self.node(to)?;
        let source = self.node_mut(from)?;
        let Some(pos) = source.successors.iter().position(|&s| s == to) else {
            return Err(ActivityError::NoSuchEdge { from, to });
        };
        source.successors.remove(pos);
        self.node_mut(to)?.predecessors.remove(&from);
        self.edges -= 1;
        trace!(%from, %to, "dependency removed");
        Ok(())
    }

    /// Drop every outgoing edge of `from` and return the former successors.
    pub fn remove_all_successors(&mut self, from: ActionId) -> ActivityResult<Vec<ActionId>> {
        let successors = std::mem::take(&mut self.node_mut(from)?.successors);
        for &to in &successors {
            if let Some(node) = self.nodes.get_mut(&to) {
                node.predecessors.remove(&from);
            }
        }
        self.edges -= successors.len();
        Ok(successors)
    }

    pub fn predecessors(&self, id: ActionId) -> ActivityResult<&BTreeSet<ActionId>> {
        Ok(&self.node(id)?.predecessors)
    }

    pub fn successors(&self, id: ActionId) -> ActivityResult<&[ActionId]> {
        Ok(&self.node(id)?.successors)
    }

    /// Every predecessor of `id` has completed (or the edge was removed).
    pub fn dependencies_solved(&self, id: ActionId) -> ActivityResult<bool> {
        Ok(self.node(id)?.predecessors.is_empty())
    }

    // ── Life cycle ────────────────────────────────────────────────────────

    /// Record that `id` entered the solver.  No edge may point to it anymore.
    pub fn mark_started(&mut self, id: ActionId) -> ActivityResult<()> {
        self.node_mut(id)?.started = true;
        Ok(())
    }

    pub fn is_started(&self, id: ActionId) -> ActivityResult<bool> {
        Ok(self.node(id)?.started)
    }

    /// `id` completed: consume its outgoing edges and return the successors
    /// whose dependencies are now all solved.
    pub fn complete(&mut self, id: ActionId) -> ActivityResult<Vec<ActionId>> {
        let successors = self.remove_all_successors(id)?;
        Ok(successors
            .into_iter()
            .filter(|to| self.nodes.get(to).is_some_and(|n| n.predecessors.is_empty() && !n.started))
            .collect())
    }

    /// Successors left waiting on `id`, which ended without completing.
    /// The edges are kept: those successors stay blocked until someone
    /// removes the edge.
    pub fn blocked_by(&self, id: ActionId) -> ActivityResult<Vec<ActionId>> {
        Ok(self.node(id)?.successors.clone())
    }

    /// Detach `id` from all neighbours and forget it.  Returns the former
    /// successors whose dependencies are now all solved.
    pub fn remove(&mut self, id: ActionId) -> ActivityResult<Vec<ActionId>> {
        let freed = self.complete(id)?;
        let node = self.nodes.remove(&id).ok_or(ActivityError::UnknownActivity(id))?;
        for pred in &node.predecessors {
            if let Some(p) = self.nodes.get_mut(pred) {
                p.successors.retain(|&s| s != id);
            }
        }
        self.edges -= node.predecessors.len();
        Ok(freed)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn node(&self, id: ActionId) -> ActivityResult<&Node> {
        self.nodes.get(&id).ok_or(ActivityError::UnknownActivity(id))
    }

    fn node_mut(&mut self, id: ActionId) -> ActivityResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(ActivityError::UnknownActivity(id))
    }

    /// `target` is reachable from `start` along successor edges.
    fn reaches(&self, start: ActionId, target: ActionId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.successors.iter().copied());
            }
        }
        false
    }
}
