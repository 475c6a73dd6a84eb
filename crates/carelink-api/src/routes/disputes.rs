//! # Dispute API Routes
//!
//! HTTP surface for the dispute case lifecycle: filing, admin triage,
//! party evidence and responses, status changes, decisions, and
//! satisfaction. Handlers parse and shape-check the request, then delegate
//! to [`CaseService`](carelink_dispute::CaseService) or the
//! [`ResolutionEngine`](carelink_resolution::ResolutionEngine); every
//! lifecycle rule lives in the domain crates.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use carelink_core::{Amount, BookingId, DisputeId, Timestamp, UserId, Watermark};
use carelink_dispute::service::DEFAULT_PAGE_LIMIT;
use carelink_dispute::{
    CaseFilter, DisputeCase, EvidenceInput, NewDispute, Party, PartyView, ResponseInput,
    StatusChange,
};
use carelink_resolution::{DecisionOutcome, DecisionRequest};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_enum, require_non_empty, Validate};
use crate::reporting::DisputeStatistics;
use crate::state::AppState;

// ── Request / Response Types ───────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PartyRequest {
    pub user_id: Uuid,
    /// `careseeker` or `caregiver`.
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EvidenceRequest {
    /// `photo`, `video`, `audio`, `document`, or `other`. Inferred from the
    /// URL when absent.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to file a new dispute.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDisputeRequest {
    pub complainant: PartyRequest,
    pub respondent: PartyRequest,
    pub booking_id: Uuid,
    #[serde(rename = "type")]
    pub dispute_type: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    pub requested_resolution: String,
    /// Minor currency units.
    #[serde(default)]
    pub requested_amount: Option<i64>,
    #[serde(default)]
    pub evidence: Vec<EvidenceRequest>,
    /// RFC 3339. Advisory only.
    #[serde(default)]
    pub deadline: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChangeRequest {
    pub status: String,
    pub performed_by: Uuid,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub allow_complainant_response: Option<bool>,
    #[serde(default)]
    pub allow_respondent_response: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRequest {
    pub admin_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PriorityRequest {
    pub priority: String,
    pub admin_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SeverityRequest {
    pub severity: String,
    pub admin_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InternalNoteRequest {
    pub note: String,
    pub admin_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddEvidenceRequest {
    pub uploaded_by: Uuid,
    #[serde(flatten)]
    pub evidence: EvidenceRequest,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RespondRequest {
    pub from_user: Uuid,
    pub message: String,
    #[serde(default)]
    pub evidence: Vec<EvidenceRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DecideRequest {
    /// `favor_complainant`, `favor_respondent`, `partial_favor`, or `no_fault`.
    pub kind: String,
    pub resolution: String,
    /// Minor currency units.
    #[serde(default)]
    pub refund_amount: Option<i64>,
    /// Minor currency units.
    #[serde(default)]
    pub compensation_amount: Option<i64>,
    #[serde(default)]
    pub actions: Vec<String>,
    pub decided_by: Uuid,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RateRequest {
    /// 1 to 5.
    pub rating: i64,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub severity: Option<String>,
    #[serde(rename = "type")]
    pub dispute_type: Option<String>,
    /// 1-based.
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisputeListResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<DisputeCase>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    #[schema(value_type = Object)]
    pub watermark: Watermark,
    pub statistics: DisputeStatistics,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TimelineVerification {
    pub valid: bool,
    pub entries: usize,
    /// Index of the first entry whose digest does not match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken_at: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ── Validation ─────────────────────────────────────────────────────────

impl Validate for CreateDisputeRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("title", &self.title)?;
        require_non_empty("description", &self.description)?;
        if self.complainant.user_id == self.respondent.user_id {
            return Err("complainant and respondent must be different users".to_string());
        }
        self.evidence.iter().try_for_each(|e| require_non_empty("evidence url", &e.url))
    }
}

impl Validate for StatusChangeRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("status", &self.status)
    }
}

impl Validate for AssignRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Validate for PriorityRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("priority", &self.priority)
    }
}

impl Validate for SeverityRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("severity", &self.severity)
    }
}

impl Validate for InternalNoteRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("note", &self.note)
    }
}

impl Validate for AddEvidenceRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("url", &self.evidence.url)
    }
}

impl Validate for RespondRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("message", &self.message)
    }
}

impl Validate for DecideRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("kind", &self.kind)?;
        require_non_empty("resolution", &self.resolution)
    }
}

impl Validate for RateRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

// ── Conversions ────────────────────────────────────────────────────────

impl PartyRequest {
    fn into_party(self, side: &str) -> Result<Party, AppError> {
        Ok(Party {
            user_id: UserId::from_uuid(self.user_id),
            role: parse_enum(&format!("{side} role"), &self.role)?,
        })
    }
}

impl EvidenceRequest {
    fn into_input(self) -> Result<EvidenceInput, AppError> {
        Ok(EvidenceInput {
            kind: self
                .kind
                .as_deref()
                .map(|k| parse_enum("evidence type", k))
                .transpose()?,
            url: self.url,
            description: self.description,
        })
    }
}

fn evidence_inputs(evidence: Vec<EvidenceRequest>) -> Result<Vec<EvidenceInput>, AppError> {
    evidence.into_iter().map(EvidenceRequest::into_input).collect()
}

impl CreateDisputeRequest {
    fn into_new_dispute(self) -> Result<NewDispute, AppError> {
        Ok(NewDispute {
            complainant: self.complainant.into_party("complainant")?,
            respondent: self.respondent.into_party("respondent")?,
            booking: BookingId::from_uuid(self.booking_id),
            dispute_type: parse_enum("dispute type", &self.dispute_type)?,
            title: self.title,
            description: self.description,
            severity: self
                .severity
                .as_deref()
                .map(|s| parse_enum("severity", s))
                .transpose()?
                .unwrap_or_default(),
            priority: self
                .priority
                .as_deref()
                .map(|p| parse_enum("priority", p))
                .transpose()?
                .unwrap_or_default(),
            requested_resolution: parse_enum("requested resolution", &self.requested_resolution)?,
            requested_amount: self.requested_amount.map(Amount::new),
            evidence: evidence_inputs(self.evidence)?,
            deadline: self
                .deadline
                .as_deref()
                .map(Timestamp::parse)
                .transpose()
                .map_err(|e| AppError::Validation(format!("deadline: {e}")))?,
        })
    }
}

impl DecideRequest {
    fn into_decision(self) -> Result<DecisionRequest, AppError> {
        Ok(DecisionRequest {
            kind: parse_enum("decision kind", &self.kind)?,
            resolution: self.resolution,
            refund_amount: self.refund_amount.map(Amount::new),
            compensation_amount: self.compensation_amount.map(Amount::new),
            actions: self.actions,
            decided_by: UserId::from_uuid(self.decided_by),
            notes: self.notes,
        })
    }
}

impl ListQuery {
    fn filter(&self) -> Result<CaseFilter, AppError> {
        Ok(CaseFilter {
            status: self.status.as_deref().map(|s| parse_enum("status", s)).transpose()?,
            priority: self
                .priority
                .as_deref()
                .map(|p| parse_enum("priority", p))
                .transpose()?,
            severity: self
                .severity
                .as_deref()
                .map(|s| parse_enum("severity", s))
                .transpose()?,
            dispute_type: self
                .dispute_type
                .as_deref()
                .map(|t| parse_enum("type", t))
                .transpose()?,
        })
    }
}

// ── Router ─────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/disputes", post(create_dispute).get(list_disputes))
        .route("/disputes/reconciliation", get(reconciliation_queue))
        .route("/disputes/{id}", get(get_dispute))
        .route("/disputes/{id}/party-view", get(get_party_view))
        .route("/disputes/{id}/timeline/verify", get(verify_timeline))
        .route("/disputes/{id}/status", put(change_status))
        .route("/disputes/{id}/assign", put(assign))
        .route("/disputes/{id}/priority", patch(set_priority))
        .route("/disputes/{id}/severity", patch(set_severity))
        .route("/disputes/{id}/internal-note", post(add_internal_note))
        .route("/disputes/{id}/evidence", post(add_evidence))
        .route("/disputes/{id}/responses", post(respond))
        .route("/disputes/{id}/decide", post(decide))
        .route("/disputes/{id}/satisfaction", post(rate))
}

// ── Handlers ───────────────────────────────────────────────────────────

/// POST /disputes: File a dispute.
#[utoipa::path(
    post,
    path = "/disputes",
    request_body = CreateDisputeRequest,
    responses(
        (status = 201, description = "Dispute filed in pending", body = serde_json::Value),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn create_dispute(
    State(state): State<AppState>,
    body: Result<Json<CreateDisputeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DisputeCase>), AppError> {
    let req = extract_validated_json(body)?;
    let case = state.cases.create(req.into_new_dispute()?).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

/// GET /disputes: Filtered page plus statistics.
#[utoipa::path(
    get,
    path = "/disputes",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of disputes, newest first", body = DisputeListResponse),
        (status = 422, description = "Unknown filter value or bad page", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn list_disputes(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<DisputeListResponse>, AppError> {
    let Query(query) = query?;
    let filter = query.filter()?;
    let page = state
        .cases
        .list_by_filter(
            &filter,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;
    let (all, watermark) = state.cases.list_all().await?;
    Ok(Json(DisputeListResponse {
        items: page.items,
        total: page.total,
        page: page.page,
        limit: page.limit,
        watermark: page.watermark,
        statistics: DisputeStatistics::from_cases(&all, watermark),
    }))
}

/// GET /disputes/reconciliation: Cases flagged for manual reconciliation.
#[utoipa::path(
    get,
    path = "/disputes/reconciliation",
    responses(
        (status = 200, description = "Flagged cases, oldest flag first", body = Vec<serde_json::Value>),
    ),
    tag = "disputes"
)]
pub async fn reconciliation_queue(
    State(state): State<AppState>,
) -> Result<Json<Vec<DisputeCase>>, AppError> {
    Ok(Json(state.cases.reconciliation_queue().await?))
}

/// GET /disputes/{id}: Full case, including internal notes.
#[utoipa::path(
    get,
    path = "/disputes/{id}",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    responses(
        (status = 200, description = "Dispute found", body = serde_json::Value),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn get_dispute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DisputeCase>, AppError> {
    Ok(Json(state.cases.get(&DisputeId::from_uuid(id)).await?))
}

/// GET /disputes/{id}/party-view: The case as its parties see it.
#[utoipa::path(
    get,
    path = "/disputes/{id}/party-view",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    responses(
        (status = 200, description = "Case without internal notes", body = serde_json::Value),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn get_party_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PartyView>, AppError> {
    let case = state.cases.get(&DisputeId::from_uuid(id)).await?;
    Ok(Json(case.party_view()))
}

/// GET /disputes/{id}/timeline/verify: Check the timeline hash chain.
#[utoipa::path(
    get,
    path = "/disputes/{id}/timeline/verify",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    responses(
        (status = 200, description = "Verification result", body = TimelineVerification),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn verify_timeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TimelineVerification>, AppError> {
    let case = state.cases.get(&DisputeId::from_uuid(id)).await?;
    let entries = case.timeline.len();
    let verification = match case.verify_timeline() {
        Ok(()) => TimelineVerification {
            valid: true,
            entries,
            broken_at: None,
            detail: None,
        },
        Err(brk) => {
            tracing::error!(dispute = %case.id, index = brk.index, "timeline hash chain broken");
            TimelineVerification {
                valid: false,
                entries,
                broken_at: Some(brk.index),
                detail: Some(brk.to_string()),
            }
        }
    };
    Ok(Json(verification))
}

/// PUT /disputes/{id}/status: Explicit status change.
#[utoipa::path(
    put,
    path = "/disputes/{id}/status",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Status changed; a complainant's withdrawal returns the party view", body = serde_json::Value),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let req = extract_validated_json(body)?;
    let performed_by = UserId::from_uuid(req.performed_by);
    let change = StatusChange {
        status: parse_enum("status", &req.status)?,
        performed_by,
        note: req.note,
        allow_complainant_response: req.allow_complainant_response,
        allow_respondent_response: req.allow_respondent_response,
    };
    let case = state
        .cases
        .transition(&DisputeId::from_uuid(id), change)
        .await?;
    // A complainant withdrawing sees the party view.
    if performed_by == case.complainant.user_id {
        return Ok(Json(case.party_view()).into_response());
    }
    Ok(Json(case).into_response())
}

/// PUT /disputes/{id}/assign: Assign an admin.
#[utoipa::path(
    put,
    path = "/disputes/{id}/assign",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = AssignRequest,
    responses(
        (status = 200, description = "Assigned", body = serde_json::Value),
        (status = 409, description = "Case closed", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn assign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> Result<Json<DisputeCase>, AppError> {
    let req = extract_validated_json(body)?;
    let case = state
        .cases
        .assign(&DisputeId::from_uuid(id), UserId::from_uuid(req.admin_id))
        .await?;
    Ok(Json(case))
}

/// PATCH /disputes/{id}/priority
#[utoipa::path(
    patch,
    path = "/disputes/{id}/priority",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = PriorityRequest,
    responses(
        (status = 200, description = "Priority changed", body = serde_json::Value),
        (status = 422, description = "Unknown priority", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn set_priority(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<PriorityRequest>, JsonRejection>,
) -> Result<Json<DisputeCase>, AppError> {
    let req = extract_validated_json(body)?;
    let priority = parse_enum("priority", &req.priority)?;
    let case = state
        .cases
        .set_priority(&DisputeId::from_uuid(id), UserId::from_uuid(req.admin_id), priority)
        .await?;
    Ok(Json(case))
}

/// PATCH /disputes/{id}/severity
#[utoipa::path(
    patch,
    path = "/disputes/{id}/severity",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = SeverityRequest,
    responses(
        (status = 200, description = "Severity changed", body = serde_json::Value),
        (status = 422, description = "Unknown severity", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn set_severity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<SeverityRequest>, JsonRejection>,
) -> Result<Json<DisputeCase>, AppError> {
    let req = extract_validated_json(body)?;
    let severity = parse_enum("severity", &req.severity)?;
    let case = state
        .cases
        .set_severity(&DisputeId::from_uuid(id), UserId::from_uuid(req.admin_id), severity)
        .await?;
    Ok(Json(case))
}

/// POST /disputes/{id}/internal-note: Admin-only note.
#[utoipa::path(
    post,
    path = "/disputes/{id}/internal-note",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = InternalNoteRequest,
    responses(
        (status = 200, description = "Note added", body = serde_json::Value),
        (status = 409, description = "Case closed", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn add_internal_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<InternalNoteRequest>, JsonRejection>,
) -> Result<Json<DisputeCase>, AppError> {
    let req = extract_validated_json(body)?;
    let case = state
        .cases
        .add_internal_note(&DisputeId::from_uuid(id), UserId::from_uuid(req.admin_id), &req.note)
        .await?;
    Ok(Json(case))
}

/// POST /disputes/{id}/evidence: A party attaches evidence.
#[utoipa::path(
    post,
    path = "/disputes/{id}/evidence",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = AddEvidenceRequest,
    responses(
        (status = 200, description = "Evidence appended; the case as its parties see it", body = serde_json::Value),
        (status = 422, description = "Not a party, or bad evidence", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn add_evidence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<AddEvidenceRequest>, JsonRejection>,
) -> Result<Json<PartyView>, AppError> {
    let req = extract_validated_json(body)?;
    let uploaded_by = UserId::from_uuid(req.uploaded_by);
    let case = state
        .cases
        .append_evidence(&DisputeId::from_uuid(id), uploaded_by, req.evidence.into_input()?)
        .await?;
    Ok(Json(case.party_view()))
}

/// POST /disputes/{id}/responses: A party responds.
#[utoipa::path(
    post,
    path = "/disputes/{id}/responses",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = RespondRequest,
    responses(
        (status = 200, description = "Response recorded; the case as its parties see it", body = serde_json::Value),
        (status = 409, description = "Party may not respond now", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn respond(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<PartyView>, AppError> {
    let req = extract_validated_json(body)?;
    let input = ResponseInput {
        from_user: UserId::from_uuid(req.from_user),
        message: req.message,
        evidence: evidence_inputs(req.evidence)?,
    };
    let case = state.cases.respond(&DisputeId::from_uuid(id), input).await?;
    Ok(Json(case.party_view()))
}

/// POST /disputes/{id}/decide: Decide the case, charging the caregiver's
/// wallet where the decision calls for it.
#[utoipa::path(
    post,
    path = "/disputes/{id}/decide",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = DecideRequest,
    responses(
        (status = 200, description = "Decision committed; carries the case and any ledger entry", body = serde_json::Value),
        (status = 409, description = "Wrong status, already decided, insufficient funds, or concurrent decision", body = crate::error::ErrorBody),
        (status = 503, description = "Store unavailable; nothing was applied", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn decide(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<DecideRequest>, JsonRejection>,
) -> Result<Json<DecisionOutcome>, AppError> {
    let req = extract_validated_json(body)?;
    let outcome = state
        .engine
        .decide(&DisputeId::from_uuid(id), &req.into_decision()?)
        .await?;
    Ok(Json(outcome))
}

/// POST /disputes/{id}/satisfaction: Respondent rates a closed case.
#[utoipa::path(
    post,
    path = "/disputes/{id}/satisfaction",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = RateRequest,
    responses(
        (status = 200, description = "Rating recorded; the case as its parties see it", body = serde_json::Value),
        (status = 409, description = "Not closed, or already rated", body = crate::error::ErrorBody),
        (status = 422, description = "Rating out of range", body = crate::error::ErrorBody),
    ),
    tag = "disputes"
)]
pub async fn rate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<RateRequest>, JsonRejection>,
) -> Result<Json<PartyView>, AppError> {
    let req = extract_validated_json(body)?;
    let case = state
        .cases
        .rate(&DisputeId::from_uuid(id), req.rating, req.feedback)
        .await?;
    Ok(Json(case.party_view()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_dispute::{DisputeStatus, DisputeType, PartyRole, Priority};

    fn create_request() -> CreateDisputeRequest {
        CreateDisputeRequest {
            complainant: PartyRequest {
                user_id: Uuid::new_v4(),
                role: "careseeker".into(),
            },
            respondent: PartyRequest {
                user_id: Uuid::new_v4(),
                role: "caregiver".into(),
            },
            booking_id: Uuid::new_v4(),
            dispute_type: "service_quality".into(),
            title: "Late arrival".into(),
            description: "Caregiver arrived ninety minutes late".into(),
            severity: None,
            priority: Some("high".into()),
            requested_resolution: "partial_refund".into(),
            requested_amount: Some(2_000),
            evidence: vec![EvidenceRequest {
                kind: None,
                url: "https://files/late.jpg".into(),
                description: None,
            }],
            deadline: Some("2026-11-01T00:00:00Z".into()),
        }
    }

    #[test]
    fn create_request_converts() {
        let new = create_request().into_new_dispute().unwrap();
        assert_eq!(new.complainant.role, PartyRole::Careseeker);
        assert_eq!(new.dispute_type, DisputeType::ServiceQuality);
        assert_eq!(new.priority, Priority::High);
        assert_eq!(new.requested_amount, Some(Amount::new(2_000)));
        assert!(new.deadline.is_some());
    }

    #[test]
    fn same_user_on_both_sides_is_invalid() {
        let mut req = create_request();
        req.respondent.user_id = req.complainant.user_id;
        assert!(req.validate().unwrap_err().contains("different"));
    }

    #[test]
    fn unknown_type_is_a_validation_error() {
        let mut req = create_request();
        req.dispute_type = "billing".into();
        assert!(matches!(
            req.into_new_dispute(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn bad_deadline_is_a_validation_error() {
        let mut req = create_request();
        req.deadline = Some("next tuesday".into());
        assert!(matches!(
            req.into_new_dispute(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn list_query_builds_filter() {
        let query = ListQuery {
            status: Some("under_review".into()),
            priority: None,
            severity: Some("critical".into()),
            dispute_type: None,
            page: None,
            limit: None,
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(DisputeStatus::UnderReview));
        assert!(filter.priority.is_none());
    }
}
