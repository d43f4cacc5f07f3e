use gs_core::{ActionId, ErrorCategory};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActivityError {
    #[error("unknown activity {0}")]
    UnknownActivity(ActionId),

    #[error("activity {0} is already registered")]
    DuplicateActivity(ActionId),

    #[error("activity {0} cannot depend on itself")]
    SelfEdge(ActionId),

    #[error("{from} → {to} already exists")]
    DuplicateEdge { from: ActionId, to: ActionId },

    #[error("no dependency {from} → {to}")]
    NoSuchEdge { from: ActionId, to: ActionId },

    #[error("cannot make {to} depend on {from}: {to} already started")]
    SuccessorStarted { from: ActionId, to: ActionId },

    #[error("{from} → {to} would close a dependency cycle")]
    Cycle { from: ActionId, to: ActionId },
}

impl ActivityError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ActivityError::UnknownActivity(_)
            | ActivityError::DuplicateActivity(_)
            | ActivityError::SelfEdge(_)
            | ActivityError::DuplicateEdge { .. }
            | ActivityError::NoSuchEdge { .. } => ErrorCategory::InvalidArgument,
            ActivityError::SuccessorStarted { .. } | ActivityError::Cycle { .. } => ErrorCategory::Dependency,
        }
    }
}

pub type ActivityResult<T> = Result<T, ActivityError>;
