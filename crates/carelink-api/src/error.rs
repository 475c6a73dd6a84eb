//! # API Error Types
//!
//! Maps domain errors onto HTTP status codes and the JSON error body:
//!
//! ```json
//! { "error": { "code": "AlreadyDecided", "message": "...", "details": { "retryable": false } } }
//! ```
//!
//! The `code` is the stable [`ErrorCode`] every domain error carries.
//! Internal error details are logged, never returned.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use carelink_core::{Coded, ErrorCode};
use carelink_dispute::DisputeError;
use carelink_ledger::LedgerError;
use carelink_resolution::ResolutionError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable machine-readable code, e.g. `"InsufficientFunds"`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// A domain error, reported with its own code.
    #[error("{message}")]
    Domain { code: ErrorCode, message: String },

    /// Malformed request body, path, or query (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Logged, not returned (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Domain { code, .. } => *code,
            Self::Validation(_) => ErrorCode::InvalidArgument,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Return the HTTP status code and wire error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        let code = self.code();
        let status = match code {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidArgument => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InvalidState
            | ErrorCode::InvalidTransition
            | ErrorCode::AlreadyDecided
            | ErrorCode::AlreadyRated
            | ErrorCode::InsufficientFunds
            | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, code.as_str())
    }

    fn coded<E: Coded + std::fmt::Display>(err: E) -> Self {
        match err.code() {
            ErrorCode::Internal => Self::Internal(err.to_string()),
            code => Self::Domain {
                code,
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Domain {
                code: ErrorCode::Unavailable,
                ..
            } => tracing::warn!(error = %self, "store unavailable"),
            _ => {}
        }

        let details = match &self {
            Self::Internal(_) => None,
            _ => Some(serde_json::json!({ "retryable": self.code().is_retryable() })),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DisputeError> for AppError {
    fn from(err: DisputeError) -> Self {
        Self::coded(err)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::coded(err)
    }
}

impl From<ResolutionError> for AppError {
    fn from(err: ResolutionError) -> Self {
        Self::coded(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::{Amount, StoreError};
    use carelink_dispute::DisputeStatus;
    use http_body_util::BodyExt;

    #[test]
    fn domain_codes_map_to_statuses() {
        let cases: Vec<(AppError, StatusCode, &str)> = vec![
            (
                DisputeError::NotFound { id: "x".into() }.into(),
                StatusCode::NOT_FOUND,
                "NotFound",
            ),
            (
                DisputeError::InvalidArgument("bad".into()).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "InvalidArgument",
            ),
            (
                DisputeError::InvalidState {
                    status: DisputeStatus::Pending,
                    operation: "decide".into(),
                }
                .into(),
                StatusCode::CONFLICT,
                "InvalidState",
            ),
            (
                DisputeError::AlreadyDecided { id: "x".into() }.into(),
                StatusCode::CONFLICT,
                "AlreadyDecided",
            ),
            (
                LedgerError::InsufficientFunds {
                    caregiver: "c".into(),
                    available: Amount::ZERO,
                    requested: Amount::new(10),
                }
                .into(),
                StatusCode::CONFLICT,
                "InsufficientFunds",
            ),
            (
                DisputeError::Store(StoreError::Unavailable("down".into())).into(),
                StatusCode::SERVICE_UNAVAILABLE,
                "Unavailable",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code), "{err}");
        }
    }

    #[test]
    fn internal_ledger_faults_are_internal() {
        let err: AppError = LedgerError::BalanceDrift {
            caregiver: "c".into(),
            recorded: Amount::new(1),
            computed: Amount::new(2),
        }
        .into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let response = AppError::Internal("pool exhausted at 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "Internal");
        assert!(!body.error.message.contains("10.0.0.3"));
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn conflict_is_marked_retryable() {
        let err: AppError = DisputeError::Conflict {
            id: "x".into(),
            attempts: 8,
        }
        .into();
        let bytes = err.into_response().into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "Conflict");
        assert_eq!(body.error.details.unwrap()["retryable"], true);
    }
}
