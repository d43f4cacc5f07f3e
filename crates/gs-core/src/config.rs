//! Engine-wide configuration.
//!
//! Typically built with `EngineConfig::default()` and a few field overrides,
//! or deserialized from JSON by the application (with the `serde` feature).
//! [`EngineConfig::validate`] runs before any model is constructed.

use crate::{CoreError, CoreResult};

/// How a model advances its actions between events.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateAlgorithm {
    /// Integrate every running action every round.  O(n) per round.
    Full,
    /// Keep a heap of predicted completion dates and refresh only the
    /// actions whose share changed.  O(log n) per event.
    #[default]
    Lazy,
}

/// How resources are grouped into sharing systems.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModelLayout {
    /// One system per resource kind: CPUs, links, disks.
    #[default]
    Separate,
    /// CPUs and links share one system, which parallel tasks with
    /// communications require.  Disks stay separate.
    Shared,
}

/// Which staged variable receives a freed concurrency slot.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StagingPolicy {
    /// The variable that registered on the constraint first.
    #[default]
    FirstRegistered,
    /// The most recently registered variable.
    LastRegistered,
}

/// Terminal state of an action whose `max_duration` elapses.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaxDurationOutcome {
    #[default]
    Done,
    Failed,
}

/// Top-level engine configuration.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Solver tolerance ε.  Residues below it are clamped to zero.
    pub maxmin_precision: f64,

    /// Tolerance on dates and durations.
    pub timing_precision: f64,

    pub update_algorithm: UpdateAlgorithm,

    /// Re-solve only the constraints touched since the last solve.  Always
    /// on under [`UpdateAlgorithm::Lazy`].
    pub selective_update: bool,

    /// Concurrency limit applied to every constraint at creation.
    /// `-1` means unlimited; `0` is rejected.
    pub concurrency_limit: i32,

    pub staging_policy: StagingPolicy,

    /// Make every transfer also consume a fraction of the reverse route.
    pub crosstraffic: bool,

    /// Coefficient of the reverse-route elements when `crosstraffic` is on.
    pub crosstraffic_ratio: f64,

    /// TCP window size in bytes; bounds a flow by `gamma / (2 * latency)`.
    /// `0` disables the bound.
    pub tcp_gamma: f64,

    /// Bandwidth of the implicit loopback link used for same-host transfers.
    pub loopback_bandwidth: f64,

    pub loopback_latency: f64,

    pub layout: ModelLayout,

    pub max_duration_outcome: MaxDurationOutcome,

    /// Make `run` return as soon as a dependency-solved activity is vetoed
    /// for lack of resource assignment.
    pub stop_on_veto: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            maxmin_precision:     1e-5,
            timing_precision:     1e-9,
            update_algorithm:     UpdateAlgorithm::Lazy,
            selective_update:     false,
            concurrency_limit:    -1,
            staging_policy:       StagingPolicy::FirstRegistered,
            crosstraffic:         false,
            crosstraffic_ratio:   0.05,
            tcp_gamma:            0.0,
            loopback_bandwidth:   10e9,
            loopback_latency:     0.0,
            layout:               ModelLayout::Separate,
            max_duration_outcome: MaxDurationOutcome::Done,
            stop_on_veto:         false,
        }
    }
}

impl EngineConfig {
    /// Whether the solver should run selectively for this configuration.
    #[inline]
    pub fn effective_selective_update(&self) -> bool {
        self.selective_update || self.update_algorithm == UpdateAlgorithm::Lazy
    }

    /// Reject values no model can work with.
    pub fn validate(&self) -> CoreResult<()> {
        positive("maxmin_precision", self.maxmin_precision)?;
        positive("timing_precision", self.timing_precision)?;
        positive("loopback_bandwidth", self.loopback_bandwidth)?;
        if self.concurrency_limit == 0 || self.concurrency_limit < -1 {
            return Err(CoreError::Config(format!(
                "concurrency_limit must be -1 or at least 1, got {}",
                self.concurrency_limit
            )));
        }
        if !(self.crosstraffic_ratio > 0.0 && self.crosstraffic_ratio < 1.0) {
            return Err(CoreError::Config(format!(
                "crosstraffic_ratio must lie in (0, 1), got {}",
                self.crosstraffic_ratio
            )));
        }
        if !(self.tcp_gamma >= 0.0 && self.tcp_gamma.is_finite()) {
            return Err(CoreError::Config(format!("tcp_gamma must be >= 0, got {}", self.tcp_gamma)));
        }
        if !(self.loopback_latency >= 0.0 && self.loopback_latency.is_finite()) {
            return Err(CoreError::Config(format!(
                "loopback_latency must be >= 0, got {}",
                self.loopback_latency
            )));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> CoreResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(CoreError::Config(format!("{name} must be positive and finite, got {value}")))
    }
}
