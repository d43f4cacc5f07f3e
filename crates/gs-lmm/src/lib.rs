//! `gs-lmm` — the max-min fair resource-sharing system.
//!
//! A [`System`] holds bounded capacities ([`Constraint`]s) and demands
//! ([`Variable`]s).  Each variable participates in some constraints with a
//! per-constraint coefficient ([`Element`]).  [`System::solve`] assigns every
//! enabled variable a `value` (its progress rate) such that the smallest
//! share is as large as possible without exceeding any capacity.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                   |
//! |----------------|------------------------------------------------------------|
//! | [`constraint`] | `Constraint`, `SharingPolicy`                              |
//! | [`variable`]   | `Variable`, `Element`                                      |
//! | [`system`]     | `System`: arenas, expand, weights, concurrency staging     |
//! | [`solve`]      | the saturation algorithm                                   |
//! | [`error`]      | `LmmError`, `LmmResult<T>`                                 |
//!
//! # Capacity rule
//!
//! After a solve, for every constraint `c`:
//!
//! ```text
//! Shared:  Σ coefficient × value ≤ bound (1 + ε)
//! Fatpipe: max coefficient × value ≤ bound (1 + ε)
//! ```
//!
//! A variable's weight acts as a sharing penalty: two variables saturated by
//! the same constraint get values in the ratio of their inverse weights.
//! With unit weights, N unbounded variables on one shared constraint of
//! bound B each receive B/N.
//!
//! # Concurrency
//!
//! A constraint may cap how many enabled variables touch it.  A variable
//! that would exceed a cap is *staged*: disabled, with its weight remembered
//! until a slot frees.  Which staged variable gets the slot follows the
//! system's [`StagingPolicy`](gs_core::StagingPolicy).
//!
//! # Example
//!
//! ```rust
//! use gs_core::{ActionId, ResourceId};
//! use gs_lmm::System;
//!
//! let mut sys = System::new(1e-5, false);
//! let link = sys.constraint_new(ResourceId(0), 10.0).unwrap();
//! let a = sys.variable_new(ActionId(0), 1.0, -1.0).unwrap();
//! let b = sys.variable_new(ActionId(1), 1.0, -1.0).unwrap();
//! sys.expand(link, a, 1.0).unwrap();
//! sys.expand(link, b, 1.0).unwrap();
//! sys.solve();
//! assert!((sys.value(a) - 5.0).abs() < 1e-9);
//! ```

pub mod constraint;
pub mod error;
pub mod solve;
pub mod system;
pub mod variable;


pub use constraint::{Constraint, SharingPolicy};
pub use error::{LmmError, LmmResult};
pub use system::System;
pub use variable::{Element, Variable};
