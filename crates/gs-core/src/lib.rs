//! `gs-core` — foundational types for the `gridsim` resource-sharing kernel.
//!
//! Every other `gs-*` crate depends on this one.  It has no `gs-*`
//! dependencies and a single external one (`thiserror`, plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `ConstraintId`, `VariableId`, `ResourceId`, `ActionId`, …  |
//! | [`time`]        | `SimTime` (totally ordered `f64`), `SimClock`              |
//! | [`precision`]   | `double_positive`, `double_equals`, `double_update`        |
//! | [`config`]      | `EngineConfig` and its policy enums                        |
//! | [`error`]       | `CoreError`, `ErrorCategory`, action `Failure`             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod ids;
pub mod precision;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{EngineConfig, MaxDurationOutcome, ModelLayout, StagingPolicy, UpdateAlgorithm};
pub use error::{CoreError, CoreResult, ErrorCategory, Failure};
pub use ids::{ActionId, ConstraintId, ModelId, NetPointId, ResourceId, TimerId, VariableId, WaitId};
pub use precision::{double_equals, double_positive, double_update};
pub use time::{SimClock, SimTime};
