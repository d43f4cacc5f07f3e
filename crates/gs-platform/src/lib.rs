//! `gs-platform` — the sealed hardware description and routing.
//!
//! A platform is described once with a [`PlatformBuilder`] and sealed by
//! [`PlatformBuilder::build`].  The engine then binds each resource to a
//! solver constraint; the platform itself never changes afterwards.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`platform`] | `Platform` (CSR hop graph), `PlatformBuilder`, `ResourceSpec` |
//! | [`router`]   | `Router` trait, `Route`, `ShortestPathRouter`                 |
//! | [`error`]    | `PlatformError`, `PlatformResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public descriptions.    |

pub mod error;
pub mod platform;
pub mod router;

#[cfg(test)]
mod tests;

pub use error::{PlatformError, PlatformResult};
pub use platform::{LinkSharing, NetPoint, NetPointKind, Platform, PlatformBuilder, ResourceSpec};
pub use router::{Route, Router, ShortestPathRouter};
