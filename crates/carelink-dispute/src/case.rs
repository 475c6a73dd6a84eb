//! # Dispute Case
//!
//! The [`DisputeCase`] aggregate and every rule for changing it. Methods
//! here are pure: they validate, mutate `self`, and append exactly one
//! timeline entry. Persistence and concurrency live in
//! [`CaseService`](crate::CaseService).
//!
//! ## Invariants
//!
//! - `admin_decision` is present iff `status` is `resolved` or `rejected`.
//! - `closed_at` is set exactly when `status` becomes terminal.
//! - `evidence`, `responses`, `timeline`, `internal_notes` only grow.
//! - A terminal case accepts no mutation other than satisfaction and the
//!   reconciliation flag.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carelink_core::{Amount, BookingId, DisputeId, Timestamp, TransactionId, UserId};

use crate::error::DisputeError;
use crate::model::{
    AdminDecision, DisputeType, Evidence, EvidenceInput, EvidenceKind, InternalNote, Party,
    PartyResponse, PartySide, PendingResolution, Priority, ReconciliationFlag,
    RequestedResolution, Severity,
};
use crate::satisfaction::Satisfaction;
use crate::status::{DisputeStatus, ResponseGate, Transition, Trigger};
use crate::timeline::{self, ChainBreak, EntryDraft, TimelineAction, TimelineEntry};

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Longest accepted free-text field, in characters.
pub const MAX_TEXT_LEN: usize = 10_000;

// ── Inputs ─────────────────────────────────────────────────────────────

/// Everything a complainant supplies to open a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDispute {
    pub complainant: Party,
    pub respondent: Party,
    pub booking: BookingId,
    pub dispute_type: DisputeType,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub priority: Priority,
    pub requested_resolution: RequestedResolution,
    #[serde(default)]
    pub requested_amount: Option<Amount>,
    #[serde(default)]
    pub evidence: Vec<EvidenceInput>,
    #[serde(default)]
    pub deadline: Option<Timestamp>,
}

/// An admin's explicit status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: DisputeStatus,
    pub performed_by: UserId,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub allow_complainant_response: Option<bool>,
    #[serde(default)]
    pub allow_respondent_response: Option<bool>,
}

impl StatusChange {
    fn designate(&self) -> ResponseGate {
        ResponseGate {
            complainant: self.allow_complainant_response.unwrap_or(false),
            respondent: self.allow_respondent_response.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInput {
    pub from_user: UserId,
    pub message: String,
    #[serde(default)]
    pub evidence: Vec<EvidenceInput>,
}

// ── Validation ─────────────────────────────────────────────────────────

/// Trim `value` and reject it if empty or longer than `max` characters.
pub fn require_text(field: &str, value: &str, max: usize) -> Result<String, DisputeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DisputeError::InvalidArgument(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(DisputeError::InvalidArgument(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, DisputeError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => require_text(field, v, MAX_TEXT_LEN).map(Some),
    }
}

/// Validate submitted evidence before it is stamped.
pub fn validate_evidence(input: &EvidenceInput) -> Result<(), DisputeError> {
    require_text("evidence url", &input.url, MAX_TEXT_LEN)?;
    optional_text("evidence description", input.description.as_deref())?;
    Ok(())
}

fn stamp_evidence(
    input: &EvidenceInput,
    uploaded_by: UserId,
    now: Timestamp,
) -> Result<Evidence, DisputeError> {
    Ok(Evidence {
        kind: input.kind.unwrap_or_else(|| EvidenceKind::from_url(&input.url)),
        url: require_text("evidence url", &input.url, MAX_TEXT_LEN)?,
        description: optional_text("evidence description", input.description.as_deref())?,
        uploaded_by,
        uploaded_at: now,
    })
}

// ── The Case ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeCase {
    pub id: DisputeId,
    pub complainant: Party,
    pub respondent: Party,
    pub booking: BookingId,
    pub dispute_type: DisputeType,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub priority: Priority,
    pub requested_resolution: RequestedResolution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_amount: Option<Amount>,
    pub status: DisputeStatus,
    pub evidence: Vec<Evidence>,
    pub responses: Vec<PartyResponse>,
    pub timeline: Vec<TimelineEntry>,
    pub internal_notes: Vec<InternalNote>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    pub allow_complainant_response: bool,
    pub allow_respondent_response: bool,
    #[serde(default)]
    pub admin_decision: Option<AdminDecision>,
    #[serde(default)]
    pub respondent_satisfaction: Option<Satisfaction>,
    /// Advisory SLA. Never enforced.
    #[serde(default)]
    pub deadline: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub closed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_resolution: Option<PendingResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<ReconciliationFlag>,
    pub version: u64,
}

impl DisputeCase {
    /// Validate `input` and open a case in `pending` at version 0.
    pub fn open(input: NewDispute, now: Timestamp) -> Result<Self, DisputeError> {
        if input.complainant.role == input.respondent.role {
            return Err(DisputeError::InvalidArgument(format!(
                "a dispute needs one careseeker and one caregiver, got two {}s",
                input.complainant.role
            )));
        }
        if input.complainant.user_id == input.respondent.user_id {
            return Err(DisputeError::InvalidArgument(
                "complainant and respondent must be different users".to_string(),
            ));
        }
        let title = require_text("title", &input.title, MAX_TITLE_LEN)?;
        let description = require_text("description", &input.description, MAX_TEXT_LEN)?;
        let requested_amount = input
            .requested_amount
            .map(|a| a.require_non_negative("requested_amount"))
            .transpose()?;
        let evidence = input
            .evidence
            .iter()
            .map(|e| stamp_evidence(e, input.complainant.user_id, now))
            .collect::<Result<Vec<_>, _>>()?;

        let gate = ResponseGate::initial();
        let mut case = Self {
            id: DisputeId::new(),
            complainant: input.complainant,
            respondent: input.respondent,
            booking: input.booking,
            dispute_type: input.dispute_type,
            title,
            description,
            severity: input.severity,
            priority: input.priority,
            requested_resolution: input.requested_resolution,
            requested_amount,
            status: DisputeStatus::Pending,
            evidence,
            responses: Vec::new(),
            timeline: Vec::new(),
            internal_notes: Vec::new(),
            assigned_to: None,
            allow_complainant_response: gate.complainant,
            allow_respondent_response: gate.respondent,
            admin_decision: None,
            respondent_satisfaction: None,
            deadline: input.deadline,
            created_at: now,
            updated_at: now,
            closed_at: None,
            pending_resolution: None,
            reconciliation: None,
            version: 0,
        };
        let mut draft = EntryDraft::new(
            TimelineAction::Created,
            format!("Dispute filed: {}", case.title),
            case.complainant.user_id,
            now,
        );
        draft.to_status = Some(DisputeStatus::Pending);
        case.record(draft);
        Ok(case)
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn party_side(&self, user: &UserId) -> Option<PartySide> {
        if &self.complainant.user_id == user {
            Some(PartySide::Complainant)
        } else if &self.respondent.user_id == user {
            Some(PartySide::Respondent)
        } else {
            None
        }
    }

    pub fn party(&self, side: PartySide) -> &Party {
        match side {
            PartySide::Complainant => &self.complainant,
            PartySide::Respondent => &self.respondent,
        }
    }

    pub fn response_gate(&self) -> ResponseGate {
        ResponseGate {
            complainant: self.allow_complainant_response,
            respondent: self.allow_respondent_response,
        }
    }

    /// Whether a claim exists that has not yet outlived `ttl`.
    pub fn has_live_claim(&self, ttl: Duration, now: Timestamp) -> bool {
        self.pending_resolution
            .as_ref()
            .is_some_and(|c| now.since(&c.claimed_at) < ttl)
    }

    pub fn verify_timeline(&self) -> Result<(), ChainBreak> {
        timeline::verify_chain(&self.timeline)
    }

    /// The case as the parties see it: no internal notes, no saga markers.
    pub fn party_view(&self) -> PartyView {
        PartyView {
            id: self.id,
            complainant: self.complainant,
            respondent: self.respondent,
            booking: self.booking,
            dispute_type: self.dispute_type,
            title: self.title.clone(),
            description: self.description.clone(),
            severity: self.severity,
            priority: self.priority,
            requested_resolution: self.requested_resolution,
            requested_amount: self.requested_amount,
            status: self.status,
            evidence: self.evidence.clone(),
            responses: self.responses.clone(),
            timeline: self.timeline.clone(),
            allow_complainant_response: self.allow_complainant_response,
            allow_respondent_response: self.allow_respondent_response,
            admin_decision: self.admin_decision.clone(),
            respondent_satisfaction: self.respondent_satisfaction.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
        }
    }

    // ── Party Mutations ────────────────────────────────────────────────

    /// Attach evidence uploaded by one of the parties.
    pub fn add_evidence(
        &mut self,
        uploaded_by: UserId,
        input: &EvidenceInput,
        now: Timestamp,
    ) -> Result<(), DisputeError> {
        self.ensure_open()?;
        let side = self.require_party(&uploaded_by)?;
        let evidence = stamp_evidence(input, uploaded_by, now)?;
        let description = format!("{} added {} evidence", side.as_str(), evidence.kind.as_str());
        self.evidence.push(evidence);
        self.record(EntryDraft::new(
            TimelineAction::EvidenceAdded,
            description,
            uploaded_by,
            now,
        ));
        Ok(())
    }

    /// Add a party response.
    ///
    /// A response from the party the case is awaiting returns the case to
    /// `under_review` and closes the response gate.
    pub fn respond(&mut self, input: &ResponseInput, now: Timestamp) -> Result<(), DisputeError> {
        self.ensure_open()?;
        let side = self.require_party(&input.from_user)?;
        let message = require_text("message", &input.message, MAX_TEXT_LEN)?;
        let gate = self.response_gate();
        let allowed = match side {
            PartySide::Complainant => gate.complainant,
            PartySide::Respondent => gate.respondent,
        };
        if !allowed {
            return Err(DisputeError::InvalidState {
                status: self.status,
                operation: format!("accept a {} response", side.as_str()),
            });
        }
        let evidence = input
            .evidence
            .iter()
            .map(|e| stamp_evidence(e, input.from_user, now))
            .collect::<Result<Vec<_>, _>>()?;

        self.responses.push(PartyResponse {
            from: side,
            message,
            evidence,
            responded_at: now,
        });

        let mut draft = EntryDraft::new(
            TimelineAction::ResponseAdded,
            format!("{} responded", side.as_str()),
            input.from_user,
            now,
        );
        if self.status == DisputeStatus::AwaitingResponse {
            let t = self.status.transition_to(
                DisputeStatus::UnderReview,
                Trigger::PartyResponse,
                ResponseGate::closed(),
            )?;
            self.apply(t, now);
            draft = draft.with_status_change(t.from, t.to);
        }
        self.record(draft);
        Ok(())
    }

    // ── Admin Mutations ────────────────────────────────────────────────

    pub fn add_internal_note(
        &mut self,
        admin: UserId,
        note: &str,
        now: Timestamp,
    ) -> Result<(), DisputeError> {
        let note = require_text("note", note, MAX_TEXT_LEN)?;
        self.ensure_open()?;
        self.internal_notes.push(InternalNote {
            note,
            author: admin,
            created_at: now,
        });
        self.admin_record(TimelineAction::InternalNote, "Internal note added".into(), admin, now)
    }

    pub fn assign(&mut self, admin: UserId, now: Timestamp) -> Result<(), DisputeError> {
        self.ensure_open()?;
        let description = match self.assigned_to.replace(admin) {
            Some(prev) if prev != admin => format!("Reassigned from {prev} to {admin}"),
            _ => format!("Assigned to {admin}"),
        };
        self.admin_record(TimelineAction::Assigned, description, admin, now)
    }

    pub fn set_priority(
        &mut self,
        admin: UserId,
        priority: Priority,
        now: Timestamp,
    ) -> Result<(), DisputeError> {
        self.ensure_open()?;
        let description = format!(
            "Priority changed from {} to {}",
            self.priority.as_str(),
            priority.as_str()
        );
        self.priority = priority;
        self.admin_record(TimelineAction::PriorityChanged, description, admin, now)
    }

    pub fn set_severity(
        &mut self,
        admin: UserId,
        severity: Severity,
        now: Timestamp,
    ) -> Result<(), DisputeError> {
        self.ensure_open()?;
        let description = format!(
            "Severity changed from {} to {}",
            self.severity.as_str(),
            severity.as_str()
        );
        self.severity = severity;
        self.admin_record(TimelineAction::SeverityChanged, description, admin, now)
    }

    /// Explicit status change.
    ///
    /// `withdrawn` is taken as the complainant's own request when
    /// `performed_by` is the complainant; every other target is an admin
    /// action. `resolved` and `rejected` are refused here, and so is every
    /// change while a resolution claim is held.
    pub fn change_status(&mut self, change: &StatusChange, now: Timestamp) -> Result<(), DisputeError> {
        let note = optional_text("note", change.note.as_deref())?;
        self.ensure_open()?;
        if self.pending_resolution.is_some() {
            return Err(DisputeError::ResolutionInProgress {
                id: self.id.to_string(),
            });
        }
        let trigger = if change.status == DisputeStatus::Withdrawn
            && change.performed_by == self.complainant.user_id
        {
            Trigger::Complainant
        } else {
            Trigger::Admin
        };
        let t = self
            .status
            .transition_to(change.status, trigger, change.designate())?;
        self.apply(t, now);
        let description = match note {
            Some(n) => format!("Status changed to {}: {n}", t.to),
            None => format!("Status changed to {}", t.to),
        };
        self.record(
            EntryDraft::new(TimelineAction::StatusChange, description, change.performed_by, now)
                .with_status_change(t.from, t.to),
        );
        Ok(())
    }

    // ── Resolution Saga Steps ──────────────────────────────────────────

    /// Reserve the case for one decider.
    ///
    /// A claim older than `ttl` is considered abandoned and may be taken
    /// over. Status and timeline are untouched.
    pub fn claim_resolution(
        &mut self,
        decided_by: UserId,
        ttl: Duration,
        now: Timestamp,
    ) -> Result<PendingResolution, DisputeError> {
        if self.admin_decision.is_some() {
            return Err(DisputeError::AlreadyDecided {
                id: self.id.to_string(),
            });
        }
        if !self.status.accepts_decision() {
            return Err(DisputeError::InvalidState {
                status: self.status,
                operation: "decide".to_string(),
            });
        }
        if self.has_live_claim(ttl, now) {
            return Err(DisputeError::ResolutionInProgress {
                id: self.id.to_string(),
            });
        }
        if let Some(stale) = &self.pending_resolution {
            tracing::warn!(
                dispute = %self.id,
                stale_claim = %stale.claim_id,
                claimed_at = %stale.claimed_at,
                "taking over abandoned resolution claim"
            );
        }
        let claim = PendingResolution {
            claim_id: Uuid::new_v4(),
            decided_by,
            claimed_at: now,
        };
        self.pending_resolution = Some(claim.clone());
        self.updated_at = now;
        Ok(claim)
    }

    /// Drop the claim if `claim_id` still holds it. Returns whether it did.
    pub fn release_claim(&mut self, claim_id: &Uuid, now: Timestamp) -> bool {
        match &self.pending_resolution {
            Some(c) if &c.claim_id == claim_id => {
                self.pending_resolution = None;
                self.updated_at = now;
                true
            }
            _ => false,
        }
    }

    /// Commit a decision under claim `claim_id`, closing the case.
    pub fn record_decision(
        &mut self,
        claim_id: &Uuid,
        decision: AdminDecision,
        target: DisputeStatus,
        now: Timestamp,
    ) -> Result<(), DisputeError> {
        if self.admin_decision.is_some() {
            return Err(DisputeError::AlreadyDecided {
                id: self.id.to_string(),
            });
        }
        match &self.pending_resolution {
            Some(c) if &c.claim_id == claim_id => {}
            _ => {
                return Err(DisputeError::ResolutionInProgress {
                    id: self.id.to_string(),
                })
            }
        }
        if !target.is_decided() {
            return Err(DisputeError::InvalidArgument(format!(
                "a decision cannot close a case as {target}"
            )));
        }
        let t = self
            .status
            .transition_to(target, Trigger::Decision, ResponseGate::closed())?;
        let description = format!("Decision {}: {}", decision.kind, decision.resolution);
        let decided_by = decision.decided_by;
        self.admin_decision = Some(decision);
        self.pending_resolution = None;
        self.apply(t, now);
        self.record(
            EntryDraft::new(TimelineAction::Decision, description, decided_by, now)
                .with_status_change(t.from, t.to),
        );
        Ok(())
    }

    /// Mark the case for manual reconciliation. Idempotent.
    pub fn flag_reconciliation(
        &mut self,
        reason: &str,
        transaction_id: Option<TransactionId>,
        performed_by: UserId,
        now: Timestamp,
    ) -> bool {
        if self.reconciliation.is_some() {
            return false;
        }
        self.reconciliation = Some(ReconciliationFlag {
            reason: reason.to_string(),
            transaction_id,
            flagged_at: now,
        });
        self.record(EntryDraft::new(
            TimelineAction::ReconciliationFlagged,
            format!("Flagged for reconciliation: {reason}"),
            performed_by,
            now,
        ));
        true
    }

    // ── Satisfaction ───────────────────────────────────────────────────

    /// Record the respondent's satisfaction with the outcome.
    pub fn rate(&mut self, satisfaction: Satisfaction) -> Result<(), DisputeError> {
        if !self.status.is_terminal() {
            return Err(DisputeError::InvalidState {
                status: self.status,
                operation: "rate".to_string(),
            });
        }
        if self.respondent_satisfaction.is_some() {
            return Err(DisputeError::AlreadyRated {
                id: self.id.to_string(),
            });
        }
        let now = satisfaction.rated_at;
        let description = format!("Respondent rated the outcome {}/5", satisfaction.rating);
        self.respondent_satisfaction = Some(satisfaction);
        self.record(EntryDraft::new(
            TimelineAction::SatisfactionRated,
            description,
            self.respondent.user_id,
            now,
        ));
        Ok(())
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn ensure_open(&self) -> Result<(), DisputeError> {
        if self.status.is_terminal() {
            return Err(DisputeError::CaseClosed {
                id: self.id.to_string(),
                status: self.status,
            });
        }
        Ok(())
    }

    fn require_party(&self, user: &UserId) -> Result<PartySide, DisputeError> {
        self.party_side(user).ok_or_else(|| {
            DisputeError::InvalidArgument(format!("{user} is not a party to dispute {}", self.id))
        })
    }

    /// Record an admin action, promoting a pending case in the same entry.
    fn admin_record(
        &mut self,
        action: TimelineAction,
        description: String,
        admin: UserId,
        now: Timestamp,
    ) -> Result<(), DisputeError> {
        let mut draft = EntryDraft::new(action, description, admin, now);
        if self.status == DisputeStatus::Pending {
            let t = self.status.transition_to(
                DisputeStatus::UnderReview,
                Trigger::Admin,
                ResponseGate::closed(),
            )?;
            self.apply(t, now);
            draft = draft.with_status_change(t.from, t.to);
        }
        self.record(draft);
        Ok(())
    }

    fn apply(&mut self, t: Transition, now: Timestamp) {
        self.status = t.to;
        self.allow_complainant_response = t.gate.complainant;
        self.allow_respondent_response = t.gate.respondent;
        if t.closes_case() && self.closed_at.is_none() {
            self.closed_at = Some(now);
        }
    }

    fn record(&mut self, draft: EntryDraft) {
        self.updated_at = draft.performed_at;
        timeline::append(&mut self.timeline, draft);
    }
}

/// A case as shown to its parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyView {
    pub id: DisputeId,
    pub complainant: Party,
    pub respondent: Party,
    pub booking: BookingId,
    pub dispute_type: DisputeType,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub priority: Priority,
    pub requested_resolution: RequestedResolution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_amount: Option<Amount>,
    pub status: DisputeStatus,
    pub evidence: Vec<Evidence>,
    pub responses: Vec<PartyResponse>,
    pub timeline: Vec<TimelineEntry>,
    pub allow_complainant_response: bool,
    pub allow_respondent_response: bool,
    pub admin_decision: Option<AdminDecision>,
    pub respondent_satisfaction: Option<Satisfaction>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub closed_at: Option<Timestamp>,
}
