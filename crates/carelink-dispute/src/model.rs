//! # Case Vocabulary
//!
//! Parties, classification enums, evidence, responses, notes, and the
//! admin decision record that a [`DisputeCase`](crate::DisputeCase) is
//! assembled from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carelink_core::{Amount, Timestamp, TransactionId, UserId};

// ── Parties ────────────────────────────────────────────────────────────

/// Marketplace role of a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Careseeker,
    Caregiver,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Careseeker => "careseeker",
            Self::Caregiver => "caregiver",
        }
    }
}

impl std::fmt::Display for PartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub user_id: UserId,
    pub role: PartyRole,
}

/// Which side of the case a party is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartySide {
    Complainant,
    Respondent,
}

impl PartySide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complainant => "complainant",
            Self::Respondent => "respondent",
        }
    }
}

// ── Classification ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeType {
    ServiceQuality,
    PaymentIssue,
    ScheduleConflict,
    UnprofessionalBehavior,
    SafetyConcern,
    Other,
}

impl DisputeType {
    pub fn all() -> &'static [DisputeType] {
        &[
            Self::ServiceQuality,
            Self::PaymentIssue,
            Self::ScheduleConflict,
            Self::UnprofessionalBehavior,
            Self::SafetyConcern,
            Self::Other,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceQuality => "service_quality",
            Self::PaymentIssue => "payment_issue",
            Self::ScheduleConflict => "schedule_conflict",
            Self::UnprofessionalBehavior => "unprofessional_behavior",
            Self::SafetyConcern => "safety_concern",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn all() -> &'static [Severity] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn all() -> &'static [Priority] {
        &[Self::Low, Self::Medium, Self::High, Self::Urgent]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.as_str() == s)
    }
}

/// What the complainant asked for. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedResolution {
    Refund,
    PartialRefund,
    Apology,
    Warning,
    Other,
}

// ── Evidence, Responses, Notes ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Photo,
    Video,
    Audio,
    Document,
    Other,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Other => "other",
        }
    }

    /// Best guess from a file name or URL path.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "heic" | "bmp" => Self::Photo,
            "mp4" | "mov" | "webm" | "avi" | "mkv" => Self::Video,
            "mp3" | "wav" | "m4a" | "ogg" | "aac" => Self::Audio,
            "pdf" | "doc" | "docx" | "txt" | "rtf" | "odt" => Self::Document,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: EvidenceKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub uploaded_by: UserId,
    pub uploaded_at: Timestamp,
}

/// Evidence as submitted, before the uploader and time are stamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceInput {
    /// Inferred from the URL when absent.
    #[serde(default, rename = "type")]
    pub kind: Option<EvidenceKind>,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyResponse {
    pub from: PartySide,
    pub message: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    pub responded_at: Timestamp,
}

/// Admin-only note. Never part of a party view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalNote {
    pub note: String,
    pub author: UserId,
    pub created_at: Timestamp,
}

// ── Decision ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    FavorComplainant,
    FavorRespondent,
    PartialFavor,
    NoFault,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FavorComplainant => "favor_complainant",
            Self::FavorRespondent => "favor_respondent",
            Self::PartialFavor => "partial_favor",
            Self::NoFault => "no_fault",
        }
    }

    /// Whether the respondent was found at fault.
    pub fn finds_respondent_at_fault(&self) -> bool {
        matches!(self, Self::FavorComplainant | Self::PartialFavor)
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the money named in a decision moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    /// Drawn from the respondent caregiver's wallet.
    CaregiverWallet,
    /// Settled outside the ledger (careseeker respondent).
    External,
    /// No money moves.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDecision {
    pub kind: DecisionKind,
    pub resolution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation_amount: Option<Amount>,
    #[serde(default)]
    pub actions: Vec<String>,
    pub decided_by: UserId,
    pub decided_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub settlement: Settlement,
    /// The wallet entry that carried the refund, if one was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_transaction: Option<TransactionId>,
}

impl AdminDecision {
    pub fn total_amount(&self) -> Amount {
        self.refund_amount.unwrap_or(Amount::ZERO) + self.compensation_amount.unwrap_or(Amount::ZERO)
    }
}

// ── Saga Markers ───────────────────────────────────────────────────────

/// A decider's reservation of the case while its decision is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResolution {
    pub claim_id: Uuid,
    pub decided_by: UserId,
    pub claimed_at: Timestamp,
}

/// Set when a failed decision could not be cleanly compensated and a human
/// must reconcile the ledger with the case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationFlag {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    pub flagged_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_kind_from_extension() {
        assert_eq!(EvidenceKind::from_url("https://cdn/x/photo.JPG"), EvidenceKind::Photo);
        assert_eq!(EvidenceKind::from_url("/uploads/report.pdf?sig=abc"), EvidenceKind::Document);
        assert_eq!(EvidenceKind::from_url("clip.mov"), EvidenceKind::Video);
        assert_eq!(EvidenceKind::from_url("voicemail.m4a"), EvidenceKind::Audio);
        assert_eq!(EvidenceKind::from_url("https://example.org/page"), EvidenceKind::Other);
    }

    #[test]
    fn enums_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_value(DisputeType::UnprofessionalBehavior).unwrap(),
            "unprofessional_behavior"
        );
        assert_eq!(serde_json::to_value(Settlement::CaregiverWallet).unwrap(), "caregiver_wallet");
        assert_eq!(DisputeType::parse("safety_concern"), Some(DisputeType::SafetyConcern));
        assert_eq!(Priority::parse("urgent"), Some(Priority::Urgent));
        assert_eq!(Severity::parse("urgent"), None);
    }

    #[test]
    fn fault_follows_decision_kind() {
        assert!(DecisionKind::FavorComplainant.finds_respondent_at_fault());
        assert!(DecisionKind::PartialFavor.finds_respondent_at_fault());
        assert!(!DecisionKind::FavorRespondent.finds_respondent_at_fault());
        assert!(!DecisionKind::NoFault.finds_respondent_at_fault());
    }
}
