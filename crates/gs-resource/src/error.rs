use gs_core::{ActionId, CoreError, ErrorCategory, ResourceId};
use gs_lmm::LmmError;
use gs_platform::PlatformError;
use thiserror::Error;

use crate::ActionState;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResourceError {
    #[error("resource model configuration error: {0}")]
    Config(String),

    #[error("unknown action {0}")]
    UnknownAction(ActionId),

    #[error("action {0} already exists")]
    DuplicateAction(ActionId),

    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("cannot {op} action {action} in state {state:?}")]
    InvalidState {
        action: ActionId,
        state:  ActionState,
        op:     &'static str,
    },

    #[error("action {0} has no complete resource assignment")]
    Unassigned(ActionId),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("solver error: {0}")]
    Lmm(#[from] LmmError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl ResourceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ResourceError::Config(_) => ErrorCategory::Configuration,
            ResourceError::UnknownAction(_)
            | ResourceError::DuplicateAction(_)
            | ResourceError::UnknownResource(_)
            | ResourceError::InvalidState { .. }
            | ResourceError::Unassigned(_) => ErrorCategory::InvalidArgument,
            ResourceError::Core(e) => e.category(),
            ResourceError::Lmm(e) => e.category(),
            ResourceError::Platform(e) => e.category(),
        }
    }
}

pub type ResourceResult<T> = Result<T, ResourceError>;
