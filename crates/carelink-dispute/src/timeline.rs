//! # Case Timeline
//!
//! Append-only audit log. Each entry commits to its predecessor:
//!
//! ```text
//! digest[i] = SHA-256(digest[i-1] ‖ action ‖ from ‖ to ‖ performed_by ‖ performed_at ‖ description)
//! digest[-1] = GENESIS_DIGEST
//! ```
//!
//! Editing or dropping any entry breaks every later link, which
//! [`verify_chain`] reports.

use serde::{Deserialize, Serialize};

use carelink_core::{sha256_hex, Timestamp, UserId, GENESIS_DIGEST};

use crate::status::DisputeStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineAction {
    Created,
    StatusChange,
    EvidenceAdded,
    ResponseAdded,
    InternalNote,
    Assigned,
    PriorityChanged,
    SeverityChanged,
    Decision,
    SatisfactionRated,
    ReconciliationFlagged,
}

impl TimelineAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChange => "status_change",
            Self::EvidenceAdded => "evidence_added",
            Self::ResponseAdded => "response_added",
            Self::InternalNote => "internal_note",
            Self::Assigned => "assigned",
            Self::PriorityChanged => "priority_changed",
            Self::SeverityChanged => "severity_changed",
            Self::Decision => "decision",
            Self::SatisfactionRated => "satisfaction_rated",
            Self::ReconciliationFlagged => "reconciliation_flagged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub action: TimelineAction,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<DisputeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<DisputeStatus>,
    pub performed_by: UserId,
    pub performed_at: Timestamp,
    pub digest: String,
}

/// An entry before it is chained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub action: TimelineAction,
    pub description: String,
    pub from_status: Option<DisputeStatus>,
    pub to_status: Option<DisputeStatus>,
    pub performed_by: UserId,
    pub performed_at: Timestamp,
}

impl EntryDraft {
    pub fn new(
        action: TimelineAction,
        description: impl Into<String>,
        performed_by: UserId,
        performed_at: Timestamp,
    ) -> Self {
        Self {
            action,
            description: description.into(),
            from_status: None,
            to_status: None,
            performed_by,
            performed_at,
        }
    }

    pub fn with_status_change(mut self, from: DisputeStatus, to: DisputeStatus) -> Self {
        self.from_status = Some(from);
        self.to_status = Some(to);
        self
    }

    fn digest(&self, prev: &str) -> String {
        let from = self.from_status.map(|s| s.as_str()).unwrap_or("");
        let to = self.to_status.map(|s| s.as_str()).unwrap_or("");
        sha256_hex([
            prev.to_string(),
            self.action.as_str().to_string(),
            from.to_string(),
            to.to_string(),
            self.performed_by.to_string(),
            self.performed_at.to_iso8601(),
            self.description.clone(),
        ])
    }

    /// Seal the draft against the digest of the entry before it.
    pub fn chain(self, prev: &str) -> TimelineEntry {
        let digest = self.digest(prev);
        TimelineEntry {
            action: self.action,
            description: self.description,
            from_status: self.from_status,
            to_status: self.to_status,
            performed_by: self.performed_by,
            performed_at: self.performed_at,
            digest,
        }
    }
}

impl From<&TimelineEntry> for EntryDraft {
    fn from(e: &TimelineEntry) -> Self {
        Self {
            action: e.action,
            description: e.description.clone(),
            from_status: e.from_status,
            to_status: e.to_status,
            performed_by: e.performed_by,
            performed_at: e.performed_at,
        }
    }
}

/// Append `draft` to `timeline`, chained to the current head.
pub fn append(timeline: &mut Vec<TimelineEntry>, draft: EntryDraft) {
    let prev = head_digest(timeline).to_string();
    timeline.push(draft.chain(&prev));
}

pub fn head_digest(timeline: &[TimelineEntry]) -> &str {
    timeline
        .last()
        .map(|e| e.digest.as_str())
        .unwrap_or(GENESIS_DIGEST)
}

/// The first entry whose digest does not match its recomputed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    pub index: usize,
    pub expected: String,
    pub found: String,
}

impl std::fmt::Display for ChainBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "timeline entry {} has digest {}, expected {}",
            self.index, self.found, self.expected
        )
    }
}

pub fn verify_chain(timeline: &[TimelineEntry]) -> Result<(), ChainBreak> {
    let mut prev = GENESIS_DIGEST.to_string();
    for (index, entry) in timeline.iter().enumerate() {
        let expected = EntryDraft::from(entry).digest(&prev);
        if expected != entry.digest {
            return Err(ChainBreak {
                index,
                expected,
                found: entry.digest.clone(),
            });
        }
        prev = expected;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TimelineEntry> {
        let actor = UserId::new();
        let at = Timestamp::parse("2026-03-01T09:00:00Z").unwrap();
        let mut t = Vec::new();
        append(&mut t, EntryDraft::new(TimelineAction::Created, "Dispute filed", actor, at));
        append(
            &mut t,
            EntryDraft::new(TimelineAction::Assigned, "Assigned", actor, at)
                .with_status_change(DisputeStatus::Pending, DisputeStatus::UnderReview),
        );
        append(&mut t, EntryDraft::new(TimelineAction::InternalNote, "Note", actor, at));
        t
    }

    #[test]
    fn fresh_chain_verifies() {
        let t = sample();
        assert_eq!(t.len(), 3);
        assert!(verify_chain(&t).is_ok());
        assert_eq!(head_digest(&[]), GENESIS_DIGEST);
        assert_ne!(t[0].digest, t[1].digest);
    }

    #[test]
    fn edited_entry_breaks_chain() {
        let mut t = sample();
        t[1].description = "Assigned to someone else".into();
        let err = verify_chain(&t).unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn dropped_entry_breaks_chain() {
        let mut t = sample();
        t.remove(0);
        assert_eq!(verify_chain(&t).unwrap_err().index, 0);
    }

    #[test]
    fn status_fields_are_committed() {
        let mut t = sample();
        t[1].to_status = Some(DisputeStatus::AwaitingResponse);
        assert!(verify_chain(&t).is_err());
    }
}
