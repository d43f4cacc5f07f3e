//! Platform error type.

use thiserror::Error;

use gs_core::{ErrorCategory, NetPointId, ResourceId};

/// Errors produced by `gs-platform`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlatformError {
    #[error("platform configuration error: {0}")]
    Config(String),

    #[error("name {0:?} is already used by another host, router or resource")]
    DuplicateName(String),

    #[error("net point {0} not found in platform")]
    UnknownNetPoint(NetPointId),

    #[error("resource {0} not found in platform")]
    UnknownResource(ResourceId),

    #[error("{0} is not a host")]
    NotAHost(NetPointId),

    #[error("resource {0} is not a link")]
    NotALink(ResourceId),

    #[error("no route from {from} to {to}")]
    NoRoute { from: NetPointId, to: NetPointId },
}

impl PlatformError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PlatformError::Config(_)
            | PlatformError::DuplicateName(_)
            | PlatformError::NoRoute { .. } => ErrorCategory::Configuration,
            PlatformError::UnknownNetPoint(_)
            | PlatformError::UnknownResource(_)
            | PlatformError::NotAHost(_)
            | PlatformError::NotALink(_) => ErrorCategory::InvalidArgument,
        }
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;
