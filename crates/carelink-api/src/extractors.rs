//! # Request Extraction
//!
//! Handlers take `Result<Json<T>, JsonRejection>` and pass it through
//! [`extract_validated_json`], so malformed bodies and failed shape checks
//! both come back as the standard 422 error body rather than axum's
//! plain-text rejection.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Shape checks on a request body that need no store access.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = body?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse a snake_case enum from its wire string, e.g. `"under_review"`.
pub fn parse_enum<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, AppError> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string()))
        .map_err(|_| AppError::Validation(format!("unknown {field}: '{value}'")))
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must be non-empty"));
    }
    Ok(())
}
