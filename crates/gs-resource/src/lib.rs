//! `gs-resource` — resource models and the actions that run on them.
//!
//! A [`ModelSet`] binds every resource of a sealed platform to a constraint
//! of a max-min sharing system and drives the actions competing for them.
//! The simulation loop only ever talks to the set:
//!
//! 1. [`ModelSet::next_event`] solves each model and returns the earliest
//!    date at which some action changes state.
//! 2. The loop advances the clock to that date (or to an earlier timer).
//! 3. [`ModelSet::update`] integrates progress up to the new date and
//!    reports every terminal transition as an [`ActionEvent`].
//!
//! # Crate layout
//!
//! | Module     | Contents                                                       |
//! |------------|----------------------------------------------------------------|
//! | [`action`] | `Action`, `ActionState`, `Target`, `ActionReport`, events      |
//! | [`heap`]   | `ActionHeap`: predicted event dates for the lazy update        |
//! | [`model`]  | `Model`: one sharing system, full and lazy update              |
//! | [`table`]  | `ResourceTable`: on/off state and availability per resource    |
//! | [`set`]    | `ModelSet`: binding, start/cancel/suspend, resource failures   |
//! | [`error`]  | `ResourceError`, `ResourceResult<T>`                           |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                           |
//! |------------|------------------------------------------------------------------|
//! | `parallel` | Solves models concurrently with Rayon.  Results are merged in    |
//! |            | model order so the simulation stays deterministic.               |
//! | `fx-hash`  | FxHash for the action → model map and the route cache.          |
//! | `serde`    | Derives `Serialize`/`Deserialize` on states, targets, reports.   |

pub mod action;
pub mod error;
pub mod heap;
pub mod model;
pub mod set;
pub mod table;


pub use action::{Action, ActionEvent, ActionKind, ActionReport, ActionState, IoOp, Target};
pub use error::{ResourceError, ResourceResult};
pub use heap::{ActionHeap, HeapKind};
pub use model::Model;
pub use set::ModelSet;
pub use table::{ResourceState, ResourceTable};
