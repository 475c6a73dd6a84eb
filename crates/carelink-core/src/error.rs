//! # Error Types
//!
//! [`ErrorCode`] is the closed set of machine-readable codes exposed to
//! clients. Every domain error in the workspace maps onto exactly one code.
//!
//! [`StoreError`] is what a case or wallet store returns. Only
//! [`StoreError::Unavailable`] and [`StoreError::Timeout`] are transient;
//! everything else is returned to the caller without retry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// Serialized in `PascalCase` (`"AlreadyDecided"`), which is also the wire
/// form in HTTP error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    InvalidArgument,
    InvalidState,
    InvalidTransition,
    AlreadyDecided,
    AlreadyRated,
    InsufficientFunds,
    Conflict,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidState => "InvalidState",
            Self::InvalidTransition => "InvalidTransition",
            Self::AlreadyDecided => "AlreadyDecided",
            Self::AlreadyRated => "AlreadyRated",
            Self::InsufficientFunds => "InsufficientFunds",
            Self::Conflict => "Conflict",
            Self::Unavailable => "Unavailable",
            Self::Internal => "Internal",
        }
    }

    /// Whether a client may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict | Self::Unavailable)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that carry a stable [`ErrorCode`].
pub trait Coded {
    fn code(&self) -> ErrorCode;
}

/// Failure of a store operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Insert of a record whose key is already taken.
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },

    /// Compare-and-swap failed: the record moved on since it was read.
    #[error("version conflict on {entity} {id}: expected {expected}, found {found}")]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: u64,
        found: u64,
    },

    /// The backing store could not be reached. Transient.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its deadline. Transient.
    #[error("store call {operation} timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u64 },

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other backend failure. Not retried.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

impl Coded for StoreError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::AlreadyExists { .. } | Self::VersionConflict { .. } => ErrorCode::Conflict,
            Self::Unavailable(_) | Self::Timeout { .. } => ErrorCode::Unavailable,
            Self::Serialization(_) | Self::Backend(_) => ErrorCode::Internal,
        }
    }
}
