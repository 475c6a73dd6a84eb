//! # Legacy Evidence Migration
//!
//! Older case documents stored evidence as bare URL strings:
//!
//! ```json
//! { "evidence": ["https://files/a.jpg", "https://files/b.pdf"] }
//! ```
//!
//! [`migrate_document`] rewrites them into structured entries in place. The
//! kind is inferred from the file extension; the uploader is the
//! complainant for case evidence and the responding party for response
//! evidence; the upload time is the case's `created_at` (or the response's
//! `responded_at`). Structured entries are left untouched, so the
//! migration can be re-run safely.
//!
//! This runs once at the persistence boundary. The regular read path only
//! accepts the structured shape.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::case::DisputeCase;
use crate::model::EvidenceKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("document lacks {0}")]
    MissingField(&'static str),

    #[error("evidence entry {index} is neither a URL string nor an object")]
    UnsupportedEvidence { index: usize },

    #[error("migrated document does not decode as a dispute case: {0}")]
    Invalid(String),
}

/// Outcome of a batch migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub scanned: usize,
    /// Documents with at least one rewritten evidence entry.
    pub migrated: usize,
    pub evidence_rewritten: usize,
    pub failed: Vec<MigrationFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationFailure {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub error: String,
}

/// Rewrite legacy evidence in one case document. Returns how many entries
/// were converted.
pub fn migrate_document(doc: &mut Value) -> Result<usize, MigrationError> {
    let obj = doc.as_object_mut().ok_or(MigrationError::NotAnObject)?;
    let created_at = obj
        .get("created_at")
        .cloned()
        .ok_or(MigrationError::MissingField("created_at"))?;
    let complainant = party_user(obj.get("complainant"))
        .ok_or(MigrationError::MissingField("complainant.user_id"))?;
    let respondent = party_user(obj.get("respondent"));

    let mut rewritten = 0;
    if let Some(evidence) = obj.get_mut("evidence") {
        rewritten += rewrite_list(evidence, &complainant, &created_at)?;
    }

    if let Some(Value::Array(responses)) = obj.get_mut("responses") {
        for response in responses.iter_mut() {
            let Some(r) = response.as_object_mut() else {
                continue;
            };
            let uploader = match r.get("from").and_then(Value::as_str) {
                Some("respondent") => respondent.clone(),
                _ => Some(complainant.clone()),
            }
            .ok_or(MigrationError::MissingField("respondent.user_id"))?;
            let at = r.get("responded_at").cloned().unwrap_or_else(|| created_at.clone());
            if let Some(evidence) = r.get_mut("evidence") {
                rewritten += rewrite_list(evidence, &uploader, &at)?;
            }
        }
    }
    Ok(rewritten)
}

/// Migrate a batch of documents and decode each into a [`DisputeCase`].
///
/// A document that fails is reported and skipped; the rest still migrate.
pub fn migrate_documents(docs: Vec<Value>) -> (Vec<DisputeCase>, MigrationReport) {
    let mut report = MigrationReport::default();
    let mut cases = Vec::with_capacity(docs.len());
    for (index, mut doc) in docs.into_iter().enumerate() {
        report.scanned += 1;
        let id = doc.get("id").and_then(Value::as_str).map(str::to_string);
        let outcome = migrate_document(&mut doc).and_then(|n| {
            serde_json::from_value::<DisputeCase>(doc)
                .map(|case| (n, case))
                .map_err(|e| MigrationError::Invalid(e.to_string()))
        });
        match outcome {
            Ok((n, case)) => {
                if n > 0 {
                    report.migrated += 1;
                    report.evidence_rewritten += n;
                }
                cases.push(case);
            }
            Err(e) => {
                tracing::warn!(index, id = ?id, error = %e, "case document failed evidence migration");
                report.failed.push(MigrationFailure {
                    index,
                    id,
                    error: e.to_string(),
                });
            }
        }
    }
    (cases, report)
}

fn party_user(party: Option<&Value>) -> Option<Value> {
    party.and_then(|p| p.get("user_id")).cloned()
}

fn rewrite_list(list: &mut Value, uploader: &Value, at: &Value) -> Result<usize, MigrationError> {
    let Value::Array(items) = list else {
        return Ok(0);
    };
    let mut rewritten = 0;
    for (index, item) in items.iter_mut().enumerate() {
        match item {
            Value::String(raw) => {
                let url = raw.trim().to_string();
                let kind = EvidenceKind::from_url(&url);
                *item = json!({
                    "type": kind,
                    "url": url,
                    "uploaded_by": uploader,
                    "uploaded_at": at,
                });
                rewritten += 1;
            }
            Value::Object(_) => {}
            _ => return Err(MigrationError::UnsupportedEvidence { index }),
        }
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::tests::new_dispute;
    use crate::model::PartySide;
    use carelink_core::Timestamp;

    /// A current-shape case rendered with its evidence in the old format.
    fn legacy_doc() -> (Value, DisputeCase) {
        let mut case = DisputeCase::open(new_dispute(), Timestamp::now()).unwrap();
        case.responses.push(crate::model::PartyResponse {
            from: PartySide::Respondent,
            message: "See attached".into(),
            evidence: vec![],
            responded_at: Timestamp::now(),
        });
        let mut doc = serde_json::to_value(&case).unwrap();
        doc["evidence"] = json!(["https://files/photo.png", "https://files/statement.pdf"]);
        doc["responses"][0]["evidence"] = json!(["https://files/timesheet.jpg"]);
        (doc, case)
    }

    #[test]
    fn legacy_strings_become_structured() {
        let (mut doc, case) = legacy_doc();
        assert!(serde_json::from_value::<DisputeCase>(doc.clone()).is_err());

        assert_eq!(migrate_document(&mut doc).unwrap(), 3);
        let migrated: DisputeCase = serde_json::from_value(doc).unwrap();
        assert_eq!(migrated.evidence.len(), 2);
        assert_eq!(migrated.evidence[0].kind, EvidenceKind::Photo);
        assert_eq!(migrated.evidence[1].kind, EvidenceKind::Document);
        assert_eq!(migrated.evidence[0].uploaded_by, case.complainant.user_id);
        assert_eq!(migrated.evidence[0].uploaded_at, case.created_at);
        assert_eq!(
            migrated.responses[0].evidence[0].uploaded_by,
            case.respondent.user_id
        );
    }

    #[test]
    fn migration_is_idempotent() {
        let (mut doc, _) = legacy_doc();
        migrate_document(&mut doc).unwrap();
        let once = doc.clone();
        assert_eq!(migrate_document(&mut doc).unwrap(), 0);
        assert_eq!(doc, once);
    }

    #[test]
    fn batch_reports_failures_and_keeps_going() {
        let (good, _) = legacy_doc();
        let mut bad = good.clone();
        bad["evidence"] = json!([42]);
        let (cases, report) = migrate_documents(vec![good, bad, json!("nope")]);
        assert_eq!(cases.len(), 1);
        assert_eq!(report.scanned, 3);
        assert_eq!(report.migrated, 1);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].index, 1);
    }
}
