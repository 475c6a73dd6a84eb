use thiserror::Error;

use carelink_core::{Amount, Coded, ErrorCode, MoneyError, StoreError, TransactionId};

/// Errors returned by ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No wallet exists for this caregiver.
    #[error("no wallet for caregiver {caregiver}")]
    WalletNotFound { caregiver: String },

    #[error("transaction {transaction} not found in wallet of {caregiver}")]
    TransactionNotFound {
        caregiver: String,
        transaction: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The debit would take the available balance below zero.
    #[error("insufficient funds for {caregiver}: available {available}, requested {requested}")]
    InsufficientFunds {
        caregiver: String,
        available: Amount,
        requested: Amount,
    },

    /// The dispute already has a live refund of a different amount.
    #[error("dispute {dispute} already has refund {existing} of {existing_amount}, not {requested}")]
    RefundMismatch {
        dispute: String,
        existing: TransactionId,
        existing_amount: Amount,
        requested: Amount,
    },

    /// Optimistic concurrency retries were exhausted.
    #[error("wallet of {caregiver} kept changing; gave up after {attempts} attempts")]
    Conflict { caregiver: String, attempts: u32 },

    /// Stored totals disagree with the transaction history.
    #[error("balance drift for {caregiver}: recorded {recorded}, computed {computed}")]
    BalanceDrift {
        caregiver: String,
        recorded: Amount,
        computed: Amount,
    },

    /// A running total left the range of a signed 64-bit amount.
    #[error("amount overflow in wallet of {caregiver}")]
    Overflow { caregiver: String },

    #[error("balance of {caregiver} is negative: {balance}")]
    NegativeBalance { caregiver: String, balance: Amount },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MoneyError> for LedgerError {
    fn from(err: MoneyError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl Coded for LedgerError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::WalletNotFound { .. } | Self::TransactionNotFound { .. } => ErrorCode::NotFound,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            Self::Conflict { .. } | Self::RefundMismatch { .. } => ErrorCode::Conflict,
            Self::BalanceDrift { .. } | Self::NegativeBalance { .. } | Self::Overflow { .. } => {
                ErrorCode::Internal
            }
            Self::Store(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        let e = LedgerError::InsufficientFunds {
            caregiver: "c".into(),
            available: Amount::new(1),
            requested: Amount::new(2),
        };
        assert_eq!(e.code(), ErrorCode::InsufficientFunds);
        assert_eq!(
            LedgerError::WalletNotFound { caregiver: "c".into() }.code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            LedgerError::Store(StoreError::Unavailable("down".into())).code(),
            ErrorCode::Unavailable
        );
    }

    #[test]
    fn money_errors_become_invalid_argument() {
        let err: LedgerError = carelink_core::Amount::ZERO
            .require_positive("amount")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }
}
