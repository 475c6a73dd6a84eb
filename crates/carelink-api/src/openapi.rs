//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI 3.1 document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Carelink Disputes and Wallet API",
        version = "0.1.0",
        description = "Dispute resolution for care bookings, coupled to the caregiver earnings ledger.\n\nAll amounts are integers in minor currency units. Error responses share one envelope: `{\"error\": {\"code\", \"message\", \"details\"}}`.\n\nHealth checks (`/health/*`) and `/metrics` are not part of this document."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Disputes ────────────────────────────────────────────────────
        crate::routes::disputes::create_dispute,
        crate::routes::disputes::list_disputes,
        crate::routes::disputes::reconciliation_queue,
        crate::routes::disputes::get_dispute,
        crate::routes::disputes::get_party_view,
        crate::routes::disputes::verify_timeline,
        crate::routes::disputes::change_status,
        crate::routes::disputes::assign,
        crate::routes::disputes::set_priority,
        crate::routes::disputes::set_severity,
        crate::routes::disputes::add_internal_note,
        crate::routes::disputes::add_evidence,
        crate::routes::disputes::respond,
        crate::routes::disputes::decide,
        crate::routes::disputes::rate,
        // ── Wallet ──────────────────────────────────────────────────────
        crate::routes::wallet::overview,
        crate::routes::wallet::get_wallet,
        crate::routes::wallet::credit,
        crate::routes::wallet::withdraw,
        crate::routes::wallet::reset_all_balances,
        crate::routes::wallet::set_fee_rate,
    ),
    components(
        schemas(
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Dispute DTOs ────────────────────────────────────────────
            crate::routes::disputes::PartyRequest,
            crate::routes::disputes::EvidenceRequest,
            crate::routes::disputes::CreateDisputeRequest,
            crate::routes::disputes::StatusChangeRequest,
            crate::routes::disputes::AssignRequest,
            crate::routes::disputes::PriorityRequest,
            crate::routes::disputes::SeverityRequest,
            crate::routes::disputes::InternalNoteRequest,
            crate::routes::disputes::AddEvidenceRequest,
            crate::routes::disputes::RespondRequest,
            crate::routes::disputes::DecideRequest,
            crate::routes::disputes::RateRequest,
            crate::routes::disputes::DisputeListResponse,
            crate::routes::disputes::TimelineVerification,
            crate::reporting::DisputeStatistics,
            // ── Wallet DTOs ─────────────────────────────────────────────
            crate::routes::wallet::CreditRequest,
            crate::routes::wallet::WithdrawRequest,
            crate::routes::wallet::FeeRateRequest,
            crate::routes::wallet::FeeRateResponse,
        ),
    ),
    tags(
        (name = "disputes", description = "Dispute case lifecycle, from filing to decision and satisfaction"),
        (name = "wallet", description = "Caregiver earnings ledger, withdrawals, and admin ledger operations"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_dispute_and_wallet_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/disputes",
            "/disputes/{id}",
            "/disputes/{id}/decide",
            "/disputes/reconciliation",
            "/wallet/overview",
            "/wallet/admin/fee-rate",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn spec_has_error_schema() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.schemas.contains_key("ErrorBody"));
        assert!(components.schemas.contains_key("DisputeStatistics"));
    }

    #[test]
    fn spec_serializes() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("\"disputes\""));
    }
}
