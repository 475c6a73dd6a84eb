//! # Case Service
//!
//! Mutation façade over a [`CaseStore`]. Every operation validates its
//! input first, then runs read → apply → compare-and-swap, retrying lost
//! races against the fresh version. A mutation and its timeline entry land
//! in the same write.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use carelink_core::{with_retry, DisputeId, RetryPolicy, StoreError, Timestamp, UserId, Watermark};

use crate::case::{
    require_text, validate_evidence, DisputeCase, NewDispute, ResponseInput, StatusChange,
    MAX_TEXT_LEN,
};
use crate::error::DisputeError;
use crate::model::{EvidenceInput, Priority, Severity};
use crate::satisfaction::{validate_rating, Satisfaction};
use crate::store::{CaseFilter, CaseStore};

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseServiceConfig {
    pub retry: RetryPolicy,
    /// Compare-and-swap attempts before a write gives up with `Conflict`.
    pub max_cas_attempts: u32,
}

impl Default for CaseServiceConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_cas_attempts: 8,
        }
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePage {
    pub items: Vec<DisputeCase>,
    /// Matches across all pages.
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub watermark: Watermark,
}

#[derive(Clone)]
pub struct CaseService {
    store: Arc<dyn CaseStore>,
    config: CaseServiceConfig,
}

impl std::fmt::Debug for CaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseService")
            .field("config", &self.config)
            .finish()
    }
}

impl CaseService {
    pub fn new(store: Arc<dyn CaseStore>, config: CaseServiceConfig) -> Self {
        Self { store, config }
    }

    pub async fn create(&self, input: NewDispute) -> Result<DisputeCase, DisputeError> {
        let case = DisputeCase::open(input, Timestamp::now())?;
        with_retry(&self.config.retry, "dispute.insert", || self.store.insert(&case)).await?;
        metrics::counter!("carelink_disputes_created_total", "type" => case.dispute_type.as_str())
            .increment(1);
        tracing::info!(
            dispute = %case.id,
            complainant = %case.complainant.user_id,
            respondent = %case.respondent.user_id,
            dispute_type = case.dispute_type.as_str(),
            "dispute created"
        );
        Ok(case)
    }

    pub async fn get(&self, id: &DisputeId) -> Result<DisputeCase, DisputeError> {
        self.load(id).await?.ok_or_else(|| DisputeError::NotFound {
            id: id.to_string(),
        })
    }

    /// Apply `f` to the latest version of the case and commit it.
    ///
    /// `f` may run more than once if other writers win the race; it must
    /// derive everything from the case it is handed. If `f` leaves the case
    /// unchanged nothing is written.
    pub async fn mutate<E, F>(
        &self,
        id: &DisputeId,
        operation: &'static str,
        mut f: F,
    ) -> Result<DisputeCase, E>
    where
        E: From<DisputeError>,
        F: FnMut(&mut DisputeCase, Timestamp) -> Result<(), E>,
    {
        let attempts = self.config.max_cas_attempts.max(1);
        for attempt in 1..=attempts {
            let current = self.get(id).await?;
            let mut working = current.clone();
            f(&mut working, Timestamp::now())?;
            if working == current {
                return Ok(current);
            }

            let expected = working.version;
            working.version = expected + 1;
            let written = with_retry(&self.config.retry, "dispute.commit", || {
                self.store.commit(&working, expected)
            })
            .await;
            match written {
                Ok(()) => {
                    tracing::info!(
                        dispute = %id,
                        operation,
                        status = working.status.as_str(),
                        version = working.version,
                        "dispute updated"
                    );
                    return Ok(working);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    // A timed-out attempt may have landed before the retry.
                    if self.load(id).await?.as_ref() == Some(&working) {
                        return Ok(working);
                    }
                    tracing::debug!(dispute = %id, operation, attempt, "dispute write lost a race, re-reading");
                }
                Err(StoreError::NotFound { .. }) => {
                    return Err(DisputeError::NotFound { id: id.to_string() }.into())
                }
                Err(e) => return Err(DisputeError::from(e).into()),
            }
        }
        Err(DisputeError::Conflict {
            id: id.to_string(),
            attempts,
        }
        .into())
    }

    pub async fn append_evidence(
        &self,
        id: &DisputeId,
        uploaded_by: UserId,
        input: EvidenceInput,
    ) -> Result<DisputeCase, DisputeError> {
        validate_evidence(&input)?;
        self.mutate(id, "append_evidence", |case, now| {
            case.add_evidence(uploaded_by, &input, now)
        })
        .await
    }

    pub async fn respond(
        &self,
        id: &DisputeId,
        input: ResponseInput,
    ) -> Result<DisputeCase, DisputeError> {
        require_text("message", &input.message, MAX_TEXT_LEN)?;
        for e in &input.evidence {
            validate_evidence(e)?;
        }
        self.mutate(id, "respond", |case, now| case.respond(&input, now))
            .await
    }

    pub async fn add_internal_note(
        &self,
        id: &DisputeId,
        admin: UserId,
        note: &str,
    ) -> Result<DisputeCase, DisputeError> {
        let note = require_text("note", note, MAX_TEXT_LEN)?;
        self.mutate(id, "add_internal_note", |case, now| {
            case.add_internal_note(admin, &note, now)
        })
        .await
    }

    pub async fn assign(&self, id: &DisputeId, admin: UserId) -> Result<DisputeCase, DisputeError> {
        self.mutate(id, "assign", |case, now| case.assign(admin, now))
            .await
    }

    pub async fn set_priority(
        &self,
        id: &DisputeId,
        admin: UserId,
        priority: Priority,
    ) -> Result<DisputeCase, DisputeError> {
        self.mutate(id, "set_priority", |case, now| {
            case.set_priority(admin, priority, now)
        })
        .await
    }

    pub async fn set_severity(
        &self,
        id: &DisputeId,
        admin: UserId,
        severity: Severity,
    ) -> Result<DisputeCase, DisputeError> {
        self.mutate(id, "set_severity", |case, now| {
            case.set_severity(admin, severity, now)
        })
        .await
    }

    /// Explicit status change through the lifecycle graph.
    pub async fn transition(
        &self,
        id: &DisputeId,
        change: StatusChange,
    ) -> Result<DisputeCase, DisputeError> {
        if change.status.is_decided() {
            // Rejected up front; the machine would refuse it anyway.
            return Err(DisputeError::InvalidTransition {
                from: self.get(id).await?.status,
                to: change.status,
                reason: "use the decision endpoint to resolve or reject a case".to_string(),
            });
        }
        let case = self
            .mutate(id, "transition", |case, now| case.change_status(&change, now))
            .await?;
        if case.status.is_terminal() {
            metrics::counter!("carelink_disputes_closed_total", "status" => case.status.as_str())
                .increment(1);
        }
        Ok(case)
    }

    /// Record the respondent's rating of a closed case.
    pub async fn rate(
        &self,
        id: &DisputeId,
        rating: i64,
        feedback: Option<String>,
    ) -> Result<DisputeCase, DisputeError> {
        validate_rating(rating)?;
        let template = Satisfaction::new(rating, feedback, Timestamp::now())?;
        self.mutate(id, "rate", |case, now| {
            case.rate(Satisfaction {
                rated_at: now,
                ..template.clone()
            })
        })
        .await
    }

    /// Every case with the watermark of the read.
    pub async fn list_all(&self) -> Result<(Vec<DisputeCase>, Watermark), DisputeError> {
        let cases = with_retry(&self.config.retry, "dispute.list", || self.store.list()).await?;
        let watermark = Watermark::from_updates(cases.iter().map(|c| c.updated_at));
        Ok((cases, watermark))
    }

    /// One page of the cases matching `filter`, newest first. `page` is 1-based.
    pub async fn list_by_filter(
        &self,
        filter: &CaseFilter,
        page: usize,
        limit: usize,
    ) -> Result<CasePage, DisputeError> {
        if page == 0 {
            return Err(DisputeError::InvalidArgument("page starts at 1".to_string()));
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(DisputeError::InvalidArgument(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        let (cases, watermark) = self.list_all().await?;
        let matching: Vec<DisputeCase> = cases.into_iter().filter(|c| filter.matches(c)).collect();
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();
        Ok(CasePage {
            items,
            total,
            page,
            limit,
            watermark,
        })
    }

    /// Cases flagged for manual reconciliation, oldest flag first.
    pub async fn reconciliation_queue(&self) -> Result<Vec<DisputeCase>, DisputeError> {
        let (cases, _) = self.list_all().await?;
        let mut flagged: Vec<DisputeCase> = cases
            .into_iter()
            .filter(|c| c.reconciliation.is_some())
            .collect();
        flagged.sort_by_key(|c| c.reconciliation.as_ref().map(|r| r.flagged_at));
        Ok(flagged)
    }

    async fn load(&self, id: &DisputeId) -> Result<Option<DisputeCase>, DisputeError> {
        Ok(with_retry(&self.config.retry, "dispute.get", || self.store.get(id)).await?)
    }
}
