//! `gs-engine` — the orchestrating loop of the gridsim kernel.
//!
//! # Round loop
//!
//! ```text
//! loop:
//!   ① Solve     — each resource model solves its sharing system and
//!                 predicts the date of its next action event.
//!   ② Advance   — the clock jumps to the earliest of those dates, the next
//!                 timer, wait deadline, profile change, or run limit.
//!   ③ Update    — models integrate progress; terminal transitions come
//!                 back in action creation order.
//!   ④ Cascade   — completions release successors, which start at once;
//!                 failures mark pending successors with a dependency error.
//!   ⑤ Scheduled — profile changes apply, timers fire, wait deadlines expire.
//!   ⑥ Notify    — observers receive every notice of the round.
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`engine`]   | `Engine`, `RoundReport`, `RunOutcome`, `StartOutcome`      |
//! | [`builder`]  | `EngineBuilder`                                            |
//! | [`observer`] | `EngineObserver` hooks and `NoopObserver`                  |
//! | [`timer`]    | `TimerQueue`                                               |
//! | [`wait`]     | `WaitTable`, `WaitOutcome`                                 |
//! | [`profile`]  | `ProfileQueue`, `ProfileChange`                            |
//! | [`error`]    | `EngineError`, `EngineResult<T>`                           |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Solves resource models on Rayon's thread pool.         |
//! | `fx-hash`  | FxHash for the model set's internal maps.              |
//! | `serde`    | Serde derives on outcomes and profile changes.         |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use gs_engine::{EngineBuilder, NoopObserver};
//! use gs_platform::PlatformBuilder;
//!
//! let mut b = PlatformBuilder::new();
//! let host = b.add_host("h0", 1e9, 1)?;
//! let mut engine = EngineBuilder::new(b.build()?).build()?;
//! let exec = engine.execute(host, 2e9)?;
//! engine.start(exec)?;
//! engine.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod engine;
pub mod error;
pub mod observer;
pub mod profile;
pub mod timer;
pub mod wait;

#[cfg(test)]
mod tests;

pub use builder::EngineBuilder;
pub use engine::{Engine, RoundReport, RunOutcome, StartOutcome};
pub use error::{EngineError, EngineResult};
pub use observer::{EngineObserver, NoopObserver};
pub use profile::{ProfileChange, ProfileQueue};
pub use timer::TimerQueue;
pub use wait::{WaitOutcome, WaitTable};
