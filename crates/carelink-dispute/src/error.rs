use thiserror::Error;

use carelink_core::{Coded, ErrorCode, MoneyError, StoreError};

use crate::status::DisputeStatus;

/// Errors returned by case operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisputeError {
    #[error("dispute {id} not found")]
    NotFound { id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not available in the case's current status.
    #[error("cannot {operation} while dispute is {status}")]
    InvalidState {
        status: DisputeStatus,
        operation: String,
    },

    /// The requested status change is not an edge of the lifecycle graph,
    /// or the caller may not take it.
    #[error("invalid transition {from} -> {to}: {reason}")]
    InvalidTransition {
        from: DisputeStatus,
        to: DisputeStatus,
        reason: String,
    },

    /// The case is terminal; only satisfaction may still be recorded.
    #[error("dispute {id} is {status} and no longer accepts changes")]
    CaseClosed { id: String, status: DisputeStatus },

    #[error("dispute {id} already has an admin decision")]
    AlreadyDecided { id: String },

    #[error("dispute {id} has already been rated")]
    AlreadyRated { id: String },

    /// Another decider holds the resolution claim.
    #[error("dispute {id} is being resolved by another request")]
    ResolutionInProgress { id: String },

    /// Optimistic concurrency retries were exhausted.
    #[error("dispute {id} kept changing; gave up after {attempts} attempts")]
    Conflict { id: String, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MoneyError> for DisputeError {
    fn from(err: MoneyError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl Coded for DisputeError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::CaseClosed { .. } | Self::ResolutionInProgress { .. } | Self::Conflict { .. } => {
                ErrorCode::Conflict
            }
            Self::AlreadyDecided { .. } => ErrorCode::AlreadyDecided,
            Self::AlreadyRated { .. } => ErrorCode::AlreadyRated,
            Self::Store(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_case_is_a_conflict() {
        let e = DisputeError::CaseClosed {
            id: "d".into(),
            status: DisputeStatus::Resolved,
        };
        assert_eq!(e.code(), ErrorCode::Conflict);
        assert_eq!(e.to_string(), "dispute d is resolved and no longer accepts changes");
    }

    #[test]
    fn store_not_found_keeps_its_code() {
        let e = DisputeError::from(StoreError::NotFound {
            entity: "dispute",
            id: "x".into(),
        });
        assert_eq!(e.code(), ErrorCode::NotFound);
    }
}
