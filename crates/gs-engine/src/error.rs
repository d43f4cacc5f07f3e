use gs_activity::ActivityError;
use gs_core::{ActionId, CoreError, ErrorCategory, ResourceId, SimTime, WaitId};
use gs_resource::ResourceError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("unknown action {0}")]
    UnknownAction(ActionId),

    #[error("unknown wait {0}")]
    UnknownWait(WaitId),

    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("{what} date {date} is before the current date {now}")]
    PastDate {
        what: &'static str,
        date: SimTime,
        now:  SimTime,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Activity(#[from] ActivityError),
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::UnknownAction(_)
            | EngineError::UnknownWait(_)
            | EngineError::UnknownResource(_)
            | EngineError::PastDate { .. }
            | EngineError::InvalidArgument(_) => ErrorCategory::InvalidArgument,
            EngineError::Core(e) => e.category(),
            EngineError::Resource(e) => e.category(),
            EngineError::Activity(e) => e.category(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

