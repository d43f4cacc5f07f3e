//! Error taxonomy shared by every `gs-*` crate.
//!
//! Two families live here:
//!
//! - [`CoreError`]: failures of an API *call* (bad configuration, malformed
//!   argument).  Sub-crates define their own enums and report which
//!   [`ErrorCategory`] each variant belongs to.
//! - [`Failure`]: the outcome of an *action* that did not complete.  These
//!   are not returned from API calls; they travel through waits and observer
//!   hooks to whoever is blocked on that specific action.

use thiserror::Error;

use crate::{ActionId, ResourceId};

/// The outward failure categories of the kernel.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCategory {
    /// Invalid bound, weight, limit or platform description.  Fatal for setup.
    Configuration,
    /// Malformed request (dependency edit, unknown id, wrong state).
    InvalidArgument,
    /// A resource was turned off under a running action.
    ResourceFailure,
    /// A `wait_for` deadline elapsed first.
    Timeout,
    /// The action was cancelled.
    Cancelled,
    /// A dependency edit or cascade could not be honoured.
    Dependency,
}

/// Base error for `gs-core` and a common variant set for sub-crates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Config(_)          => ErrorCategory::Configuration,
            CoreError::InvalidArgument(_) => ErrorCategory::InvalidArgument,
        }
    }
}

/// Shorthand result type for `gs-core`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Why an action (or a wait on it) did not end in `Done`.
#[derive(Debug, Error, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Failure {
    #[error("resource {resource} was turned off")]
    ResourceFailure { resource: ResourceId },

    #[error("wait timed out after {after}s")]
    Timeout { after: f64 },

    #[error("cancelled")]
    Cancelled,

    #[error("max duration of {max_duration}s elapsed")]
    MaxDuration { max_duration: f64 },

    #[error("predecessor {predecessor} did not complete")]
    Dependency { predecessor: ActionId },
}

impl Failure {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Failure::ResourceFailure { .. } => ErrorCategory::ResourceFailure,
            Failure::Timeout { .. }         => ErrorCategory::Timeout,
            Failure::Cancelled              => ErrorCategory::Cancelled,
            // A max-duration expiry configured to fail is reported like a timeout.
            Failure::MaxDuration { .. }     => ErrorCategory::Timeout,
            Failure::Dependency { .. }      => ErrorCategory::Dependency,
        }
    }
}
