use thiserror::Error;

use carelink_core::{Coded, ErrorCode};
use carelink_dispute::DisputeError;
use carelink_ledger::LedgerError;

/// Errors returned by the resolution engine.
///
/// Case and ledger failures pass through untranslated so callers see the
/// precondition that actually failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The decision request is malformed or inconsistent with its kind.
    #[error("invalid decision: {0}")]
    InvalidDecision(String),

    #[error(transparent)]
    Dispute(#[from] DisputeError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl Coded for ResolutionError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidDecision(_) => ErrorCode::InvalidArgument,
            Self::Dispute(e) => e.code(),
            Self::Ledger(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::Amount;

    #[test]
    fn codes_pass_through() {
        let e = ResolutionError::from(LedgerError::InsufficientFunds {
            caregiver: "c".into(),
            available: Amount::ZERO,
            requested: Amount::new(1),
        });
        assert_eq!(e.code(), ErrorCode::InsufficientFunds);
        let e = ResolutionError::from(DisputeError::AlreadyDecided { id: "d".into() });
        assert_eq!(e.code(), ErrorCode::AlreadyDecided);
        assert_eq!(
            ResolutionError::InvalidDecision("x".into()).code(),
            ErrorCode::InvalidArgument
        );
    }
}
