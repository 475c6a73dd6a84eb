//! # Resolution Engine
//!
//! Deciding a case touches two stores: the case and, when the respondent
//! caregiver is charged, their wallet. There is no transaction spanning
//! both, so a decision runs as a saga:
//!
//! ```text
//!   1. claim    CAS on the case: pending_resolution = {claim_id, decided_by}
//!   2. ledger   refund_for_dispute (idempotent per dispute)
//!   3. commit   CAS on the case: decision + terminal status + timeline
//! ```
//!
//! | failure at | compensation                                          |
//! |------------|-------------------------------------------------------|
//! | 1          | none; nothing was written                             |
//! | 2          | reverse any refund that landed anyway, release claim  |
//! | 3          | reverse the refund, release the claim                 |
//!
//! A refund left on the wallet by an abandoned claim, of a different
//! amount from the current decision, is replaced in the same wallet write
//! as the new refund, and only while this decider still holds the claim.
//!
//! If a compensation step itself fails the case is flagged for manual
//! reconciliation. If even the flag cannot be written, an `error!` event
//! carrying the case and transaction ids is the record of last resort.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use carelink_core::{DisputeId, Timestamp, TransactionId, UserId};
use carelink_dispute::{
    AdminDecision, CaseService, DisputeCase, DisputeError, PendingResolution,
};
use carelink_ledger::{DisputeRefund, Ledger, LedgerError, LedgerTransaction};

use crate::decision::{plan, DecisionRequest};
use crate::error::ResolutionError;

/// Claims older than this may be taken over by another decider.
pub const DEFAULT_CLAIM_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionConfig {
    pub claim_ttl: Duration,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            claim_ttl: Duration::seconds(DEFAULT_CLAIM_TTL_SECS),
        }
    }
}

/// A committed decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub case: DisputeCase,
    /// The wallet entry charged for this decision, if any.
    pub ledger_transaction: Option<LedgerTransaction>,
}

#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    cases: CaseService,
    ledger: Ledger,
    config: ResolutionConfig,
}

impl ResolutionEngine {
    pub fn new(cases: CaseService, ledger: Ledger, config: ResolutionConfig) -> Self {
        Self {
            cases,
            ledger,
            config,
        }
    }

    /// Decide a case.
    ///
    /// Either the decision is committed (with its refund, if any) or the
    /// case and wallet are left as they were. Every precondition failure is
    /// returned as the case or ledger reported it.
    pub async fn decide(
        &self,
        id: &DisputeId,
        request: &DecisionRequest,
    ) -> Result<DecisionOutcome, ResolutionError> {
        let request = request.validate()?;
        let ttl = self.config.claim_ttl;

        // ── 1. Claim ───────────────────────────────────────────────────
        let claimed = self
            .cases
            .mutate(id, "claim_resolution", |case, now| {
                case.claim_resolution(request.decided_by, ttl, now).map(|_| ())
            })
            .await?;
        let claim = claimed
            .pending_resolution
            .clone()
            .ok_or_else(|| DisputeError::ResolutionInProgress { id: id.to_string() })?;
        let plan = plan(&claimed, &request, Timestamp::now());
        let caregiver = claimed.respondent.user_id;

        // ── 2. Ledger ──────────────────────────────────────────────────
        let ledger_transaction = match plan.charge {
            None => None,
            Some(amount) => {
                let refund = DisputeRefund {
                    caregiver,
                    dispute: *id,
                    booking: claimed.booking,
                    amount,
                    description: format!("Dispute refund: {}", claimed.title),
                    supersedes: None,
                };
                match self.charge(id, &claim, refund).await {
                    Ok(txn) => Some(txn),
                    Err(err) => {
                        tracing::warn!(dispute = %id, error = %err, "dispute refund failed, compensating");
                        // A store failure may hide a write that landed.
                        let landed = match &err {
                            LedgerError::Store(_) | LedgerError::Conflict { .. } => {
                                self.orphaned_refund(id, &claim, caregiver).await
                            }
                            _ => Ok(None),
                        };
                        self.compensate(id, &claim, caregiver, landed, "ledger").await;
                        return Err(err.into());
                    }
                }
            }
        };

        // ── 3. Commit ──────────────────────────────────────────────────
        let mut decision = plan.decision;
        decision.ledger_transaction = ledger_transaction.as_ref().map(|t| t.id);
        let target = plan.target;
        let committed = self
            .cases
            .mutate(id, "record_decision", |case, now| {
                let decision = AdminDecision {
                    decided_at: now,
                    ..decision.clone()
                };
                case.record_decision(&claim.claim_id, decision, target, now)
            })
            .await;

        let case = match committed {
            Ok(case) => case,
            Err(err) => match self.landed(id, &decision).await {
                Some(case) => case,
                None => {
                    tracing::warn!(dispute = %id, error = %err, "decision commit failed, compensating");
                    let refund = Ok(ledger_transaction.as_ref().map(|t| t.id));
                    self.compensate(id, &claim, caregiver, refund, "commit").await;
                    return Err(err.into());
                }
            },
        };

        metrics::counter!("carelink_disputes_decided_total", "status" => case.status.as_str())
            .increment(1);
        metrics::counter!("carelink_disputes_closed_total", "status" => case.status.as_str())
            .increment(1);
        tracing::info!(
            dispute = %id,
            decided_by = %request.decided_by,
            kind = request.kind.as_str(),
            status = case.status.as_str(),
            amount = %request.total_amount(),
            transaction = ?decision.ledger_transaction,
            "dispute decided"
        );
        Ok(DecisionOutcome {
            case,
            ledger_transaction,
        })
    }

    /// Step 2. Replaces a refund of a different amount only while `claim`
    /// still holds the case.
    async fn charge(
        &self,
        id: &DisputeId,
        claim: &PendingResolution,
        mut refund: DisputeRefund,
    ) -> Result<LedgerTransaction, LedgerError> {
        let err = match self.ledger.refund_for_dispute(&refund).await {
            Ok(outcome) => return Ok(outcome.transaction),
            Err(e) => e,
        };
        let LedgerError::RefundMismatch { existing, .. } = err else {
            return Err(err);
        };
        if !self.holds(id, claim).await {
            return Err(err);
        }
        tracing::warn!(
            dispute = %id,
            superseded = %existing,
            "replacing refund left by an abandoned decision"
        );
        refund.supersedes = Some(existing);
        Ok(self.ledger.refund_for_dispute(&refund).await?.transaction)
    }

    async fn holds(&self, id: &DisputeId, claim: &PendingResolution) -> bool {
        self.cases
            .get(id)
            .await
            .is_ok_and(|case| holds_claim(&case, claim))
    }

    /// The live refund on the caregiver's wallet for this case, if this
    /// decider still holds the claim. Reads both stores; a failed read is
    /// returned as the reason to flag the case.
    async fn orphaned_refund(
        &self,
        id: &DisputeId,
        claim: &PendingResolution,
        caregiver: UserId,
    ) -> Result<Option<TransactionId>, String> {
        let case = self
            .cases
            .get(id)
            .await
            .map_err(|e| format!("could not re-read case after ledger failure: {e}"))?;
        if !holds_claim(&case, claim) {
            return Ok(None);
        }
        match self.ledger.get(&caregiver).await {
            Ok(wallet) => Ok(wallet.active_dispute_refund(id).map(|t| t.id)),
            Err(LedgerError::WalletNotFound { .. }) => Ok(None),
            Err(e) => Err(format!("could not re-read wallet after ledger failure: {e}")),
        }
    }

    /// The stored case, if it carries exactly this decision.
    ///
    /// Covers a commit whose acknowledgement was lost after it landed.
    async fn landed(&self, id: &DisputeId, decision: &AdminDecision) -> Option<DisputeCase> {
        let case = self.cases.get(id).await.ok()?;
        let stored = case.admin_decision.as_ref()?;
        let ours = AdminDecision {
            decided_at: stored.decided_at,
            ..decision.clone()
        };
        (stored == &ours).then_some(case)
    }

    async fn compensate(
        &self,
        id: &DisputeId,
        claim: &PendingResolution,
        caregiver: UserId,
        refund: Result<Option<TransactionId>, String>,
        step: &'static str,
    ) {
        let mut failure = refund.as_ref().err().cloned();
        let refund_id = refund.ok().flatten();

        if let Some(refund_id) = refund_id {
            failure = self.reverse_unless_committed(id, caregiver, &refund_id).await.err();
        }

        let released = self
            .cases
            .mutate(id, "release_claim", |case, now| {
                case.release_claim(&claim.claim_id, now);
                Ok::<(), DisputeError>(())
            })
            .await;
        if let Err(e) = released {
            failure.get_or_insert(format!("claim release failed: {e}"));
        }

        let Some(reason) = failure else {
            metrics::counter!(
                "carelink_resolution_compensations_total",
                "step" => step,
                "outcome" => "compensated"
            )
            .increment(1);
            tracing::info!(dispute = %id, step, refund = ?refund_id, "decision compensated");
            return;
        };

        let flagged = self
            .cases
            .mutate(id, "flag_reconciliation", |case, now| {
                case.flag_reconciliation(&reason, refund_id, claim.decided_by, now);
                Ok::<(), DisputeError>(())
            })
            .await;
        match flagged {
            Ok(_) => {
                metrics::counter!(
                    "carelink_resolution_compensations_total",
                    "step" => step,
                    "outcome" => "flagged"
                )
                .increment(1);
                tracing::warn!(dispute = %id, step, refund = ?refund_id, reason = %reason, "dispute flagged for reconciliation");
            }
            Err(e) => {
                metrics::counter!(
                    "carelink_resolution_compensations_total",
                    "step" => step,
                    "outcome" => "unrecorded"
                )
                .increment(1);
                tracing::error!(
                    dispute = %id,
                    step,
                    refund = ?refund_id,
                    reason = %reason,
                    error = %e,
                    "compensation failed and the reconciliation flag could not be written"
                );
            }
        }
    }

    /// Reverse `refund_id` unless a committed decision on the case points
    /// at it. That happens when another decider took over a stale claim and
    /// committed with the same idempotent refund.
    async fn reverse_unless_committed(
        &self,
        id: &DisputeId,
        caregiver: UserId,
        refund_id: &TransactionId,
    ) -> Result<(), String> {
        let case = self
            .cases
            .get(id)
            .await
            .map_err(|e| format!("could not re-read case before reversing refund: {e}"))?;
        let committed = case
            .admin_decision
            .as_ref()
            .and_then(|d| d.ledger_transaction)
            .is_some_and(|t| &t == refund_id);
        if committed {
            return Ok(());
        }
        self.ledger
            .reverse_refund(&caregiver, refund_id, "Dispute decision was not committed")
            .await
            .map(|_| ())
            .map_err(|e| format!("refund reversal failed: {e}"))
    }
}

fn holds_claim(case: &DisputeCase, claim: &PendingResolution) -> bool {
    case.admin_decision.is_none()
        && case
            .pending_resolution
            .as_ref()
            .is_some_and(|c| c.claim_id == claim.claim_id)
}
