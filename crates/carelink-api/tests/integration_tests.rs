//! # Integration Tests for carelink-api
//!
//! Drives the assembled router in-process against in-memory stores:
//! health checks, the dispute lifecycle through decision and rating, the
//! wallet endpoints, error envelopes, and the OpenAPI document.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use carelink_api::state::{AppConfig, AppState};
use carelink_ledger::UnderfundedRefundPolicy;

fn test_app() -> axum::Router {
    carelink_api::app(AppState::new())
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(b) => builder.body(Body::from(b.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}

struct Parties {
    careseeker: Uuid,
    caregiver: Uuid,
    admin: Uuid,
}

impl Parties {
    fn new() -> Self {
        Self {
            careseeker: Uuid::new_v4(),
            caregiver: Uuid::new_v4(),
            admin: Uuid::new_v4(),
        }
    }
}

fn dispute_body(p: &Parties) -> Value {
    json!({
        "complainant": {"user_id": p.careseeker, "role": "careseeker"},
        "respondent": {"user_id": p.caregiver, "role": "caregiver"},
        "booking_id": Uuid::new_v4(),
        "type": "service_quality",
        "title": "Caregiver left early",
        "description": "Shift ended two hours before the booked time",
        "requested_resolution": "partial_refund",
        "requested_amount": 5000,
        "evidence": [{"url": "https://files/timesheet.pdf"}]
    })
}

/// File a dispute and move it to under_review. Returns its id.
async fn open_case(app: &axum::Router, p: &Parties) -> String {
    let (status, created) = send(app, "POST", "/disputes", Some(dispute_body(p))).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        app,
        "PUT",
        &format!("/disputes/{id}/assign"),
        Some(json!({"admin_id": p.admin})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    id
}

async fn fund(app: &axum::Router, caregiver: Uuid, amount: i64) {
    let (status, receipt) = send(
        app,
        "POST",
        &format!("/wallet/caregiver/{caregiver}/credit"),
        Some(json!({"amount": amount, "description": "Completed booking"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
}

// -- Health Checks ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_check() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_check_in_memory() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_metrics_without_recorder_is_unavailable() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let config = AppConfig {
        metrics_enabled: false,
        ..AppConfig::default()
    };
    let app = carelink_api::app(AppState::with_config(config, None));
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Dispute Lifecycle --------------------------------------------------------

#[tokio::test]
async fn test_create_and_get_dispute() {
    let app = test_app();
    let p = Parties::new();
    let (status, created) = send(&app, "POST", "/disputes", Some(dispute_body(&p))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["severity"], "medium");
    assert_eq!(created["evidence"][0]["type"], "document");
    assert_eq!(created["timeline"].as_array().unwrap().len(), 1);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/disputes/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Caregiver left early");
}

#[tokio::test]
async fn test_unknown_dispute_is_404_with_envelope() {
    let app = test_app();
    let (status, body) = send(&app, "GET", &format!("/disputes/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NotFound");
    assert_eq!(body["error"]["details"]["retryable"], false);
}

#[tokio::test]
async fn test_create_with_unknown_type_is_422() {
    let app = test_app();
    let p = Parties::new();
    let mut body = dispute_body(&p);
    body["type"] = json!("billing");
    let (status, body) = send(&app, "POST", "/disputes", Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "InvalidArgument");
    assert!(body["error"]["message"].as_str().unwrap().contains("billing"));
}

#[tokio::test]
async fn test_malformed_json_is_422_envelope() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/disputes")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "InvalidArgument");
}

#[tokio::test]
async fn test_internal_notes_hidden_from_party_view() {
    let app = test_app();
    let p = Parties::new();
    let id = open_case(&app, &p).await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/internal-note"),
        Some(json!({"note": "Second complaint this month", "admin_id": p.admin})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, full) = send(&app, "GET", &format!("/disputes/{id}"), None).await;
    assert_eq!(full["internal_notes"].as_array().unwrap().len(), 1);

    let (status, view) = send(&app, "GET", &format!("/disputes/{id}/party-view"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(view.get("internal_notes").is_none());
    assert_eq!(view["status"], "under_review");
}

#[tokio::test]
async fn test_party_endpoints_never_return_internal_notes() {
    const NOTE: &str = "Caregiver on final warning";
    let app = test_app();
    let p = Parties::new();
    let id = open_case(&app, &p).await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/internal-note"),
        Some(json!({"note": NOTE, "admin_id": p.admin})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let assert_party_safe = |body: &Value| {
        assert!(body.get("internal_notes").is_none(), "{body}");
        assert!(body.get("pending_resolution").is_none(), "{body}");
        assert!(body.get("reconciliation").is_none(), "{body}");
        assert!(!body.to_string().contains(NOTE), "{body}");
    };

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/evidence"),
        Some(json!({"uploaded_by": p.careseeker, "url": "https://files/door.jpg"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_party_safe(&body);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/disputes/{id}/status"),
        Some(json!({
            "status": "awaiting_response",
            "performed_by": p.admin,
            "allow_respondent_response": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/responses"),
        Some(json!({"from_user": p.caregiver, "message": "I left when asked to"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_party_safe(&body);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/disputes/{id}/status"),
        Some(json!({"status": "withdrawn", "performed_by": p.careseeker})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "withdrawn");
    assert_party_safe(&body);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/satisfaction"),
        Some(json!({"rating": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_party_safe(&body);

    // The admin view still carries the note.
    let (_, full) = send(&app, "GET", &format!("/disputes/{id}"), None).await;
    assert_eq!(full["internal_notes"][0]["note"], NOTE);
}

#[tokio::test]
async fn test_timeline_verifies() {
    let app = test_app();
    let p = Parties::new();
    let id = open_case(&app, &p).await;
    let (status, body) = send(&app, "GET", &format!("/disputes/{id}/timeline/verify"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["entries"], 2);
}

#[tokio::test]
async fn test_non_party_evidence_rejected() {
    let app = test_app();
    let p = Parties::new();
    let id = open_case(&app, &p).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/evidence"),
        Some(json!({"uploaded_by": Uuid::new_v4(), "url": "https://files/x.jpg"})),
    )
    .await;
    assert!(status.is_client_error(), "{status}");
    assert!(body["error"]["code"].is_string());
}

#[tokio::test]
async fn test_party_adds_evidence() {
    let app = test_app();
    let p = Parties::new();
    let id = open_case(&app, &p).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/evidence"),
        Some(json!({
            "uploaded_by": p.careseeker,
            "type": "photo",
            "url": "https://files/door.jpg",
            "description": "Front door at 3pm"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["evidence"].as_array().unwrap().len(), 2);
    assert_eq!(body["evidence"][1]["type"], "photo");
}

#[tokio::test]
async fn test_resolve_via_status_endpoint_is_refused() {
    let app = test_app();
    let p = Parties::new();
    let id = open_case(&app, &p).await;
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/disputes/{id}/status"),
        Some(json!({"status": "resolved", "performed_by": p.admin})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "InvalidTransition");
}

#[tokio::test]
async fn test_awaiting_response_gates_responses() {
    let app = test_app();
    let p = Parties::new();
    let id = open_case(&app, &p).await;
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/disputes/{id}/status"),
        Some(json!({
            "status": "awaiting_response",
            "performed_by": p.admin,
            "allow_respondent_response": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/responses"),
        Some(json!({"from_user": p.caregiver, "message": "Client sent me home early"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["responses"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/responses"),
        Some(json!({"from_user": p.careseeker, "message": "That is not true"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

// -- Decisions ----------------------------------------------------------------

#[tokio::test]
async fn test_decision_charges_caregiver_wallet() {
    let app = test_app();
    let p = Parties::new();
    fund(&app, p.caregiver, 10_000).await;
    let id = open_case(&app, &p).await;

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/decide"),
        Some(json!({
            "kind": "favor_complainant",
            "resolution": "Partial refund for the missed hours",
            "refund_amount": 5000,
            "decided_by": p.admin
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["case"]["status"], "resolved");
    assert_eq!(outcome["case"]["admin_decision"]["settlement"], "caregiver_wallet");
    assert_eq!(outcome["ledger_transaction"]["type"], "refund");
    assert_eq!(outcome["ledger_transaction"]["amount"], 5000);

    let (_, wallet) = send(&app, "GET", &format!("/wallet/caregiver/{}", p.caregiver), None).await;
    assert_eq!(wallet["available_balance"], 4000);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/decide"),
        Some(json!({
            "kind": "favor_complainant",
            "resolution": "Again",
            "refund_amount": 5000,
            "decided_by": p.admin
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "AlreadyDecided");

    let (_, wallet) = send(&app, "GET", &format!("/wallet/caregiver/{}", p.caregiver), None).await;
    assert_eq!(wallet["available_balance"], 4000);
}

#[tokio::test]
async fn test_underfunded_decision_rejected_and_case_untouched() {
    let app = test_app();
    let p = Parties::new();
    fund(&app, p.caregiver, 1_000).await;
    let id = open_case(&app, &p).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/decide"),
        Some(json!({
            "kind": "favor_complainant",
            "resolution": "Full refund",
            "refund_amount": 5000,
            "decided_by": p.admin
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "InsufficientFunds");

    let (_, case) = send(&app, "GET", &format!("/disputes/{id}"), None).await;
    assert_eq!(case["status"], "under_review");
    assert!(case["admin_decision"].is_null());
}

#[tokio::test]
async fn test_underfunded_decision_queues_when_configured() {
    let config = AppConfig {
        underfunded_refunds: UnderfundedRefundPolicy::QueuePending,
        ..AppConfig::default()
    };
    let app = carelink_api::app(AppState::with_config(config, None));
    let p = Parties::new();
    fund(&app, p.caregiver, 1_000).await;
    let id = open_case(&app, &p).await;

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/decide"),
        Some(json!({
            "kind": "partial_favor",
            "resolution": "Refund owed once earnings arrive",
            "refund_amount": 5000,
            "decided_by": p.admin
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["ledger_transaction"]["status"], "pending");

    let (_, wallet) = send(&app, "GET", &format!("/wallet/caregiver/{}", p.caregiver), None).await;
    assert_eq!(wallet["available_balance"], 900);
    assert_eq!(wallet["pending_amount"], 5000);
}

#[tokio::test]
async fn test_no_fault_then_satisfaction() {
    let app = test_app();
    let p = Parties::new();
    let id = open_case(&app, &p).await;

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/decide"),
        Some(json!({
            "kind": "no_fault",
            "resolution": "Schedule misunderstanding on both sides",
            "decided_by": p.admin
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["case"]["status"], "rejected");
    assert!(outcome["ledger_transaction"].is_null());

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/satisfaction"),
        Some(json!({"rating": 9})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/satisfaction"),
        Some(json!({"rating": 4, "feedback": "Fair outcome"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["respondent_satisfaction"]["rating"], 4);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/satisfaction"),
        Some(json!({"rating": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "AlreadyRated");
}

#[tokio::test]
async fn test_decide_pending_case_is_invalid_state() {
    let app = test_app();
    let p = Parties::new();
    let (_, created) = send(&app, "POST", "/disputes", Some(dispute_body(&p))).await;
    let id = created["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        "POST",
        &format!("/disputes/{id}/decide"),
        Some(json!({
            "kind": "no_fault",
            "resolution": "Nothing to decide yet",
            "decided_by": p.admin
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "InvalidState");
}

// -- Listing and Statistics ---------------------------------------------------

#[tokio::test]
async fn test_list_filters_and_statistics() {
    let app = test_app();
    let p = Parties::new();
    open_case(&app, &p).await;
    let mut urgent = dispute_body(&p);
    urgent["priority"] = json!("urgent");
    urgent["type"] = json!("safety_concern");
    let (status, _) = send(&app, "POST", "/disputes", Some(urgent)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = send(&app, "GET", "/disputes?priority=urgent", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["type"], "safety_concern");
    assert_eq!(page["statistics"]["total"], 2);
    assert_eq!(page["statistics"]["by_status"]["pending"], 1);
    assert_eq!(page["statistics"]["by_status"]["under_review"], 1);
    assert_eq!(page["statistics"]["unassigned_open"], 1);
    assert_eq!(page["watermark"]["records"], 2);

    let (status, body) = send(&app, "GET", "/disputes?status=open", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "InvalidArgument");

    let (status, _) = send(&app, "GET", "/disputes?limit=500", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reconciliation_queue_starts_empty() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/disputes/reconciliation", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

// -- Wallet -------------------------------------------------------------------

#[tokio::test]
async fn test_credit_is_idempotent_per_booking() {
    let app = test_app();
    let caregiver = Uuid::new_v4();
    let booking = Uuid::new_v4();
    let body = json!({"amount": 8000, "description": "Overnight shift", "related_booking": booking});

    let (status, first) = send(
        &app,
        "POST",
        &format!("/wallet/caregiver/{caregiver}/credit"),
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["available_balance"], 7200);
    assert_eq!(first["platform_fee"]["fee_rate_bps"], 1000);

    let (status, second) = send(
        &app,
        "POST",
        &format!("/wallet/caregiver/{caregiver}/credit"),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["replayed"], true);
    assert_eq!(second["available_balance"], 7200);
}

#[tokio::test]
async fn test_withdraw_cannot_overdraw() {
    let app = test_app();
    let caregiver = Uuid::new_v4();
    fund(&app, caregiver, 1_000).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/wallet/caregiver/{caregiver}/withdraw"),
        Some(json!({"amount": 5000, "description": "Payout"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "InsufficientFunds");

    let (status, txn) = send(
        &app,
        "POST",
        &format!("/wallet/caregiver/{caregiver}/withdraw"),
        Some(json!({"amount": 900, "description": "Payout"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(txn["type"], "withdrawal");
}

#[tokio::test]
async fn test_unknown_wallet_is_404() {
    let app = test_app();
    let (status, body) = send(&app, "GET", &format!("/wallet/caregiver/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NotFound");
}

#[tokio::test]
async fn test_fee_rate_change_applies_to_later_earnings() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "PUT",
        "/wallet/admin/fee-rate",
        Some(json!({"platform_fee_percentage": "12.5"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fee_rate_bps"], 1250);

    let caregiver = Uuid::new_v4();
    fund(&app, caregiver, 10_000).await;
    let (_, overview) = send(&app, "GET", "/wallet/overview", None).await;
    assert_eq!(overview["fee_rate_bps"], 1250);
    assert_eq!(overview["stats"]["total_available"], 8750);

    let (status, body) = send(
        &app,
        "PUT",
        "/wallet/admin/fee-rate",
        Some(json!({"platform_fee_percentage": "-3"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "InvalidArgument");
}

#[tokio::test]
async fn test_reset_all_balances() {
    let app = test_app();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    fund(&app, a, 10_000).await;
    fund(&app, b, 2_000).await;

    let (status, report) = send(&app, "POST", "/wallet/admin/reset-all-balances", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["modified_count"], 2);
    assert_eq!(report["cancelled"], false);

    let (_, overview) = send(&app, "GET", "/wallet/overview", None).await;
    assert_eq!(overview["stats"]["total_available"], 0);

    let (_, report) = send(&app, "POST", "/wallet/admin/reset-all-balances", None).await;
    assert_eq!(report["modified_count"], 0);
    assert_eq!(report["unchanged_count"], 2);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_json() {
    let app = test_app();
    let (status, spec) = send(&app, "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/disputes/{id}/decide"].is_object());
    assert!(spec["paths"]["/wallet/overview"].is_object());
}
