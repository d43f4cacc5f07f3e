use gs_core::{ConstraintId, ErrorCategory, VariableId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LmmError {
    #[error("solver configuration error: {0}")]
    Config(String),

    #[error("unknown constraint {0}")]
    UnknownConstraint(ConstraintId),

    #[error("unknown variable {0}")]
    UnknownVariable(VariableId),

    #[error("constraint {constraint} still has {elements} element(s)")]
    ConstraintInUse {
        constraint: ConstraintId,
        elements:   usize,
    },

    #[error("solver invariant violated: {0}")]
    Invariant(String),
}

impl LmmError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LmmError::Config(_) | LmmError::Invariant(_) => ErrorCategory::Configuration,
            LmmError::UnknownConstraint(_)
            | LmmError::UnknownVariable(_)
            | LmmError::ConstraintInUse { .. } => ErrorCategory::InvalidArgument,
        }
    }
}

pub type LmmResult<T> = Result<T, LmmError>;
