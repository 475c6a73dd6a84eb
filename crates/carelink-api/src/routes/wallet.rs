//! # Wallet API Routes
//!
//! Caregiver earnings, withdrawals, and the admin operations on the ledger:
//! the platform-wide overview, the payroll balance reset, and the fee rate.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use carelink_core::{Amount, BookingId, FeeRate, UserId};
use carelink_ledger::{
    CaregiverWallet, CreditReceipt, DebitKind, LedgerTransaction, ResetReport, WalletOverview,
};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_empty, Validate};
use crate::state::AppState;

// ── Request / Response Types ───────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreditRequest {
    /// Gross earning in minor currency units.
    pub amount: i64,
    pub description: String,
    #[serde(default)]
    pub related_booking: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    /// Minor currency units.
    pub amount: i64,
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeeRateRequest {
    /// Decimal percentage between 0 and 100, e.g. `"12.5"`.
    pub platform_fee_percentage: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeeRateResponse {
    pub platform_fee_percentage: String,
    pub fee_rate_bps: u32,
}

impl Validate for CreditRequest {
    fn validate(&self) -> Result<(), String> {
        if self.amount <= 0 {
            return Err(format!("amount must be greater than zero, got {}", self.amount));
        }
        require_non_empty("description", &self.description)
    }
}

impl Validate for WithdrawRequest {
    fn validate(&self) -> Result<(), String> {
        if self.amount <= 0 {
            return Err(format!("amount must be greater than zero, got {}", self.amount));
        }
        require_non_empty("description", &self.description)
    }
}

impl Validate for FeeRateRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("platform_fee_percentage", &self.platform_fee_percentage)
    }
}

// ── Router ─────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wallet/overview", get(overview))
        .route("/wallet/caregiver/{id}", get(get_wallet))
        .route("/wallet/caregiver/{id}/credit", post(credit))
        .route("/wallet/caregiver/{id}/withdraw", post(withdraw))
        .route("/wallet/admin/reset-all-balances", post(reset_all_balances))
        .route("/wallet/admin/fee-rate", put(set_fee_rate))
}

// ── Handlers ───────────────────────────────────────────────────────────

/// GET /wallet/overview: Totals and per-wallet summaries.
#[utoipa::path(
    get,
    path = "/wallet/overview",
    responses(
        (status = 200, description = "Platform-wide wallet overview", body = serde_json::Value),
    ),
    tag = "wallet"
)]
pub async fn overview(State(state): State<AppState>) -> Result<Json<WalletOverview>, AppError> {
    Ok(Json(state.ledger.overview().await?))
}

/// GET /wallet/caregiver/{id}
#[utoipa::path(
    get,
    path = "/wallet/caregiver/{id}",
    params(("id" = Uuid, Path, description = "Caregiver user ID")),
    responses(
        (status = 200, description = "Wallet with full transaction history", body = serde_json::Value),
        (status = 404, description = "No wallet for this caregiver", body = crate::error::ErrorBody),
    ),
    tag = "wallet"
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CaregiverWallet>, AppError> {
    Ok(Json(state.ledger.get(&UserId::from_uuid(id)).await?))
}

/// POST /wallet/caregiver/{id}/credit: Record a completed booking's earning.
#[utoipa::path(
    post,
    path = "/wallet/caregiver/{id}/credit",
    params(("id" = Uuid, Path, description = "Caregiver user ID")),
    request_body = CreditRequest,
    responses(
        (status = 201, description = "Earning and platform fee recorded", body = serde_json::Value),
        (status = 200, description = "Earning for this booking already existed", body = serde_json::Value),
        (status = 422, description = "Invalid amount or description", body = crate::error::ErrorBody),
    ),
    tag = "wallet"
)]
pub async fn credit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<CreditRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreditReceipt>), AppError> {
    let req = extract_validated_json(body)?;
    let receipt = state
        .ledger
        .credit(
            &UserId::from_uuid(id),
            Amount::new(req.amount),
            &req.description,
            req.related_booking.map(BookingId::from_uuid),
        )
        .await?;
    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt)))
}

/// POST /wallet/caregiver/{id}/withdraw
#[utoipa::path(
    post,
    path = "/wallet/caregiver/{id}/withdraw",
    params(("id" = Uuid, Path, description = "Caregiver user ID")),
    request_body = WithdrawRequest,
    responses(
        (status = 201, description = "Withdrawal recorded", body = serde_json::Value),
        (status = 404, description = "No wallet for this caregiver", body = crate::error::ErrorBody),
        (status = 409, description = "Insufficient funds", body = crate::error::ErrorBody),
    ),
    tag = "wallet"
)]
pub async fn withdraw(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LedgerTransaction>), AppError> {
    let req = extract_validated_json(body)?;
    let txn = state
        .ledger
        .debit(
            &UserId::from_uuid(id),
            Amount::new(req.amount),
            DebitKind::Withdrawal,
            &req.description,
            None,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(txn)))
}

/// POST /wallet/admin/reset-all-balances: Payroll cycle reset.
///
/// Stops between wallets once shutdown begins; the report says so.
#[utoipa::path(
    post,
    path = "/wallet/admin/reset-all-balances",
    responses(
        (status = 200, description = "Per-wallet reset report", body = serde_json::Value),
    ),
    tag = "wallet"
)]
pub async fn reset_all_balances(
    State(state): State<AppState>,
) -> Result<Json<ResetReport>, AppError> {
    Ok(Json(state.ledger.reset_all(&state.shutdown).await?))
}

/// PUT /wallet/admin/fee-rate: Change the platform fee for future earnings.
#[utoipa::path(
    put,
    path = "/wallet/admin/fee-rate",
    request_body = FeeRateRequest,
    responses(
        (status = 200, description = "Fee rate changed", body = FeeRateResponse),
        (status = 422, description = "Rate not between 0 and 100", body = crate::error::ErrorBody),
    ),
    tag = "wallet"
)]
pub async fn set_fee_rate(
    State(state): State<AppState>,
    body: Result<Json<FeeRateRequest>, JsonRejection>,
) -> Result<Json<FeeRateResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let rate = FeeRate::from_percent_str(req.platform_fee_percentage.trim())
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let previous = state.ledger.fee_rate();
    state.ledger.set_fee_rate(rate);
    tracing::info!(
        from_bps = previous.bps(),
        to_bps = rate.bps(),
        "platform fee rate changed"
    );
    Ok(Json(FeeRateResponse {
        platform_fee_percentage: rate.percent_string(),
        fee_rate_bps: rate.bps(),
    }))
}
