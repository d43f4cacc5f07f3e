//! `gs-activity` — dependency edges between activities and veto bookkeeping.
//!
//! An activity is an action that may wait for other actions.  It enters the
//! solver only once every predecessor has completed *and* its resources are
//! assigned; every refused attempt is recorded in a [`VetoSet`] so that the
//! code placing activities can see what is waiting on it.
//!
//! This crate knows nothing about resources or time: the engine asks it
//! whether an activity may start and tells it when one completes.
//!
//! # Crate layout
//!
//! | Module    | Contents                                                   |
//! |-----------|------------------------------------------------------------|
//! | [`graph`] | `DependencyGraph`: edges, cycle check, edge consumption    |
//! | [`veto`]  | `VetoSet`, `VetoReason`                                    |
//! | [`error`] | `ActivityError`, `ActivityResult<T>`                       |

pub mod error;
pub mod graph;
pub mod veto;


pub use error::{ActivityError, ActivityResult};
pub use graph::DependencyGraph;
pub use veto::{VetoReason, VetoSet};
