//! # Ledger Service
//!
//! All wallet mutations go through [`Ledger`]. Each operation loads the
//! wallet, applies its change to a working copy, checks the balance
//! invariant, and commits with compare-and-swap. A lost race re-reads and
//! re-applies, so every precondition (sufficient funds, idempotency keys)
//! is checked against the version actually being replaced.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use carelink_core::{
    with_retry, Amount, BookingId, CancelFlag, DisputeId, FeeRate, StoreError, Timestamp,
    TransactionId, UserId, Watermark,
};

use crate::config::{LedgerConfig, UnderfundedRefundPolicy};
use crate::error::LedgerError;
use crate::store::WalletStore;
use crate::wallet::{CaregiverWallet, LedgerTransaction, TransactionStatus, TransactionType};

const RESET_DESCRIPTION: &str = "Payroll cycle balance reset";
const SUPERSEDED_DESCRIPTION: &str = "Superseded by a refund of a different amount";

// ── Request / Result Types ─────────────────────────────────────────────

/// The two kinds of caller-initiated debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebitKind {
    Refund,
    Withdrawal,
}

impl From<DebitKind> for TransactionType {
    fn from(kind: DebitKind) -> Self {
        match kind {
            DebitKind::Refund => TransactionType::Refund,
            DebitKind::Withdrawal => TransactionType::Withdrawal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditReceipt {
    pub earning: LedgerTransaction,
    /// Absent when the fee rounds to zero.
    pub platform_fee: Option<LedgerTransaction>,
    /// Queued refunds that this earning allowed to settle.
    pub settled_refunds: Vec<TransactionId>,
    pub available_balance: Amount,
    /// True when an earning for the same booking already existed.
    pub replayed: bool,
}

/// A refund charged to a caregiver because of a dispute decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeRefund {
    pub caregiver: UserId,
    pub dispute: DisputeId,
    pub booking: BookingId,
    pub amount: Amount,
    pub description: String,
    /// A live refund for this dispute, of a different amount, that this
    /// one replaces.
    pub supersedes: Option<TransactionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub transaction: LedgerTransaction,
    /// True when this dispute had already been charged this amount.
    pub replayed: bool,
    /// An earlier refund for the dispute, of a different amount, that this
    /// write undid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded: Option<TransactionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetFailure {
    pub caregiver_id: UserId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    /// Wallets that received a reset withdrawal.
    pub modified_count: usize,
    /// Wallets already at zero.
    pub unchanged_count: usize,
    pub failed: Vec<ResetFailure>,
    /// True if the run stopped early on cancellation.
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub caregiver_id: UserId,
    pub available_balance: Amount,
    pub total_earnings: Amount,
    pub total_platform_fees: Amount,
    pub pending_amount: Amount,
    pub transaction_count: usize,
    pub last_updated: Timestamp,
}

impl From<&CaregiverWallet> for WalletSummary {
    fn from(w: &CaregiverWallet) -> Self {
        Self {
            caregiver_id: w.caregiver_id,
            available_balance: w.available_balance,
            total_earnings: w.total_earnings,
            total_platform_fees: w.total_platform_fees,
            pending_amount: w.pending_amount,
            transaction_count: w.transactions.len(),
            last_updated: w.last_updated,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStats {
    pub wallet_count: usize,
    pub total_available: Amount,
    pub total_earnings: Amount,
    pub total_platform_fees: Amount,
    pub total_pending: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletOverview {
    pub stats: WalletStats,
    pub wallets: Vec<WalletSummary>,
    /// Current rate as a decimal percentage, e.g. `"10"`.
    pub platform_fee_percentage: String,
    pub fee_rate_bps: u32,
    pub watermark: Watermark,
}

/// Outcome of applying an operation to a working copy.
enum Step<R> {
    /// Persist the working copy, then return `R`.
    Commit(R),
    /// Nothing changed; return `R` without writing.
    Unchanged(R),
}

// ── Ledger ─────────────────────────────────────────────────────────────

/// The caregiver earnings ledger.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn WalletStore>,
    fee_rate: Arc<RwLock<FeeRate>>,
    config: LedgerConfig,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("fee_rate", &*self.fee_rate.read())
            .field("config", &self.config)
            .finish()
    }
}

impl Ledger {
    pub fn new(store: Arc<dyn WalletStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            fee_rate: Arc::new(RwLock::new(config.fee_rate)),
            config,
        }
    }

    /// The platform fee rate that the next credit will use.
    pub fn fee_rate(&self) -> FeeRate {
        *self.fee_rate.read()
    }

    /// Change the platform fee rate. Past fee entries keep their snapshot.
    pub fn set_fee_rate(&self, rate: FeeRate) {
        let previous = std::mem::replace(&mut *self.fee_rate.write(), rate);
        tracing::info!(from = %previous, to = %rate, "platform fee rate changed");
    }

    pub fn underfunded_policy(&self) -> UnderfundedRefundPolicy {
        self.config.underfunded_refunds
    }

    /// Fetch a wallet with its full history.
    pub async fn get(&self, caregiver: &UserId) -> Result<CaregiverWallet, LedgerError> {
        self.load(caregiver)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound {
                caregiver: caregiver.to_string(),
            })
    }

    /// Record an earning and its platform fee.
    ///
    /// Creates the wallet on first use. When `related_booking` is given, a
    /// second credit for the same booking returns the original entries.
    /// After crediting, queued refunds settle oldest first while the
    /// balance covers them.
    pub async fn credit(
        &self,
        caregiver: &UserId,
        amount: Amount,
        description: &str,
        related_booking: Option<BookingId>,
    ) -> Result<CreditReceipt, LedgerError> {
        let amount = amount.require_positive("amount")?;
        let description = require_text(description, "description")?;

        let receipt = self
            .update(caregiver, true, |wallet, now| {
                if let Some(booking) = related_booking {
                    if let Some(existing) = wallet.earning_for_booking(&booking) {
                        let fee = wallet
                            .transactions
                            .iter()
                            .find(|t| {
                                t.kind == TransactionType::PlatformFee
                                    && t.related_booking == Some(booking)
                            })
                            .cloned();
                        return Ok(Step::Unchanged(CreditReceipt {
                            earning: existing.clone(),
                            platform_fee: fee,
                            settled_refunds: Vec::new(),
                            available_balance: wallet.available_balance,
                            replayed: true,
                        }));
                    }
                }

                let rate = self.fee_rate();
                let earning = LedgerTransaction::new(
                    TransactionType::Earning,
                    amount,
                    description.clone(),
                    TransactionStatus::Completed,
                    now,
                )
                .with_booking(related_booking);
                wallet.append(earning.clone())?;

                let fee_amount = rate.fee_for(amount);
                let platform_fee = if fee_amount.is_positive() {
                    let mut fee = LedgerTransaction::new(
                        TransactionType::PlatformFee,
                        fee_amount,
                        format!("Platform fee ({rate}) on: {description}"),
                        TransactionStatus::Completed,
                        now,
                    )
                    .with_booking(related_booking);
                    fee.fee_rate_bps = Some(rate.bps());
                    wallet.append(fee.clone())?;
                    Some(fee)
                } else {
                    None
                };

                let settled_refunds = settle_queued_refunds(wallet, now)?;
                Ok(Step::Commit(CreditReceipt {
                    earning,
                    platform_fee,
                    settled_refunds,
                    available_balance: wallet.available_balance,
                    replayed: false,
                }))
            })
            .await?;

        if !receipt.replayed {
            record_txn(TransactionType::Earning);
            if receipt.platform_fee.is_some() {
                record_txn(TransactionType::PlatformFee);
            }
            tracing::info!(
                caregiver = %caregiver,
                amount = %amount,
                fee = ?receipt.platform_fee.as_ref().map(|f| f.amount),
                settled_refunds = receipt.settled_refunds.len(),
                "earning credited"
            );
        }
        Ok(receipt)
    }

    /// Debit a refund or withdrawal. Never overdraws.
    pub async fn debit(
        &self,
        caregiver: &UserId,
        amount: Amount,
        kind: DebitKind,
        description: &str,
        related_booking: Option<BookingId>,
    ) -> Result<LedgerTransaction, LedgerError> {
        let amount = amount.require_positive("amount")?;
        let description = require_text(description, "description")?;

        let txn = self
            .update(caregiver, false, |wallet, now| {
                require_funds(wallet, amount)?;
                let txn = LedgerTransaction::new(
                    kind.into(),
                    amount,
                    description.clone(),
                    TransactionStatus::Completed,
                    now,
                )
                .with_booking(related_booking);
                wallet.append(txn.clone())?;
                Ok(Step::Commit(txn))
            })
            .await?;

        record_txn(txn.kind);
        tracing::info!(caregiver = %caregiver, kind = %txn.kind, amount = %amount, "wallet debited");
        Ok(txn)
    }

    /// Charge a dispute refund to the caregiver, at most once per dispute.
    ///
    /// If the dispute already has a live refund of the same amount on this
    /// wallet, that entry is returned with `replayed = true` and nothing is
    /// written. A live refund of a different amount fails with
    /// [`LedgerError::RefundMismatch`] unless the request names it in
    /// `supersedes`, in which case it is undone in the same write that
    /// records the new refund. An underfunded refund follows the configured
    /// [`UnderfundedRefundPolicy`].
    pub async fn refund_for_dispute(
        &self,
        refund: &DisputeRefund,
    ) -> Result<RefundOutcome, LedgerError> {
        let amount = refund.amount.require_positive("refund amount")?;
        let policy = self.config.underfunded_refunds;

        let outcome = self
            .update(&refund.caregiver, false, |wallet, now| {
                let mut superseded = None;
                if let Some(existing) = wallet.active_dispute_refund(&refund.dispute).cloned() {
                    if existing.amount == amount {
                        return Ok(Step::Unchanged(RefundOutcome {
                            transaction: existing,
                            replayed: true,
                            superseded: None,
                        }));
                    }
                    if refund.supersedes != Some(existing.id) {
                        return Err(LedgerError::RefundMismatch {
                            dispute: refund.dispute.to_string(),
                            existing: existing.id,
                            existing_amount: existing.amount,
                            requested: amount,
                        });
                    }
                    undo_refund(wallet, &existing, SUPERSEDED_DESCRIPTION, now)?;
                    superseded = Some(existing.id);
                }

                let status = match require_funds(wallet, amount) {
                    Ok(()) => TransactionStatus::Completed,
                    Err(_) if policy == UnderfundedRefundPolicy::QueuePending => {
                        TransactionStatus::Pending
                    }
                    Err(e) => return Err(e),
                };
                let txn = LedgerTransaction::new(
                    TransactionType::Refund,
                    amount,
                    refund.description.clone(),
                    status,
                    now,
                )
                .with_booking(Some(refund.booking))
                .with_dispute(refund.dispute);
                wallet.append(txn.clone())?;
                Ok(Step::Commit(RefundOutcome {
                    transaction: txn,
                    replayed: false,
                    superseded,
                }))
            })
            .await?;

        if !outcome.replayed {
            record_txn(TransactionType::Refund);
            if let Some(previous) = &outcome.superseded {
                record_txn(TransactionType::Reversal);
                tracing::warn!(
                    caregiver = %refund.caregiver,
                    dispute = %refund.dispute,
                    superseded = %previous,
                    "earlier dispute refund of a different amount undone"
                );
            }
            tracing::info!(
                caregiver = %refund.caregiver,
                dispute = %refund.dispute,
                amount = %amount,
                status = outcome.transaction.status.as_str(),
                "dispute refund recorded"
            );
        }
        Ok(outcome)
    }

    /// Undo a refund. Idempotent.
    ///
    /// A completed refund gets a compensating `reversal` entry; a pending
    /// one is marked `failed`. Returns the entry that now represents the
    /// undo: the reversal, or the failed refund.
    pub async fn reverse_refund(
        &self,
        caregiver: &UserId,
        refund_id: &TransactionId,
        reason: &str,
    ) -> Result<LedgerTransaction, LedgerError> {
        let reason = require_text(reason, "reason")?;

        let txn = self
            .update(caregiver, false, |wallet, now| {
                let original = wallet.transaction(refund_id).cloned().ok_or_else(|| {
                    LedgerError::TransactionNotFound {
                        caregiver: caregiver.to_string(),
                        transaction: refund_id.to_string(),
                    }
                })?;
                if original.kind != TransactionType::Refund {
                    return Err(LedgerError::InvalidArgument(format!(
                        "transaction {refund_id} is a {} and cannot be reversed",
                        original.kind
                    )));
                }
                if let Some(existing) = wallet.reversal_of(refund_id) {
                    return Ok(Step::Unchanged(existing.clone()));
                }
                if original.status == TransactionStatus::Failed {
                    return Ok(Step::Unchanged(original));
                }
                undo_refund(wallet, &original, &reason, now).map(Step::Commit)
            })
            .await?;

        record_txn(txn.kind);
        tracing::warn!(caregiver = %caregiver, refund = %refund_id, "refund reversed");
        Ok(txn)
    }

    /// Zero every available balance with a synthetic withdrawal.
    ///
    /// Wallets are processed independently: a failure is recorded in the
    /// report and the run continues. Wallets already at zero are left
    /// untouched, so re-running after a partial failure or cancellation
    /// completes the remainder without touching finished wallets.
    pub async fn reset_all(&self, cancel: &CancelFlag) -> Result<ResetReport, LedgerError> {
        let wallets = with_retry(&self.config.retry, "wallet.list", || self.store.list()).await?;
        let mut report = ResetReport::default();

        for wallet in wallets {
            if cancel.is_cancelled() {
                report.cancelled = true;
                tracing::warn!(
                    modified = report.modified_count,
                    "balance reset cancelled before completion"
                );
                break;
            }
            let caregiver = wallet.caregiver_id;
            let result = self
                .update(&caregiver, false, |w, now| {
                    if !w.available_balance.is_positive() {
                        return Ok(Step::Unchanged(false));
                    }
                    let withdrawal = LedgerTransaction::new(
                        TransactionType::Withdrawal,
                        w.available_balance,
                        RESET_DESCRIPTION,
                        TransactionStatus::Completed,
                        now,
                    );
                    w.append(withdrawal)?;
                    Ok(Step::Commit(true))
                })
                .await;

            match result {
                Ok(true) => {
                    report.modified_count += 1;
                    record_txn(TransactionType::Withdrawal);
                }
                Ok(false) => report.unchanged_count += 1,
                Err(e) => {
                    tracing::error!(caregiver = %caregiver, error = %e, "balance reset failed for wallet");
                    report.failed.push(ResetFailure {
                        caregiver_id: caregiver,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            modified = report.modified_count,
            unchanged = report.unchanged_count,
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "balance reset finished"
        );
        Ok(report)
    }

    /// Aggregate figures across all wallets, computed from current state.
    pub async fn overview(&self) -> Result<WalletOverview, LedgerError> {
        let wallets = with_retry(&self.config.retry, "wallet.list", || self.store.list()).await?;
        let mut stats = WalletStats {
            wallet_count: wallets.len(),
            ..WalletStats::default()
        };
        for w in &wallets {
            let overflow = || LedgerError::Overflow {
                caregiver: w.caregiver_id.to_string(),
            };
            stats.total_available = stats
                .total_available
                .checked_add(w.available_balance)
                .ok_or_else(overflow)?;
            stats.total_earnings = stats
                .total_earnings
                .checked_add(w.total_earnings)
                .ok_or_else(overflow)?;
            stats.total_platform_fees = stats
                .total_platform_fees
                .checked_add(w.total_platform_fees)
                .ok_or_else(overflow)?;
            stats.total_pending = stats
                .total_pending
                .checked_add(w.pending_amount)
                .ok_or_else(overflow)?;
        }
        let rate = self.fee_rate();
        Ok(WalletOverview {
            stats,
            watermark: Watermark::from_updates(wallets.iter().map(|w| w.last_updated)),
            wallets: wallets.iter().map(WalletSummary::from).collect(),
            platform_fee_percentage: rate.percent_string(),
            fee_rate_bps: rate.bps(),
        })
    }

    // ── Internals ──────────────────────────────────────────────────────

    async fn load(&self, caregiver: &UserId) -> Result<Option<CaregiverWallet>, LedgerError> {
        Ok(with_retry(&self.config.retry, "wallet.get", || self.store.get(caregiver)).await?)
    }

    /// Read, apply, verify, compare-and-swap; repeat on lost races.
    async fn update<R, F>(
        &self,
        caregiver: &UserId,
        create_if_missing: bool,
        mut apply: F,
    ) -> Result<R, LedgerError>
    where
        F: FnMut(&mut CaregiverWallet, Timestamp) -> Result<Step<R>, LedgerError>,
    {
        let attempts = self.config.max_cas_attempts.max(1);
        for attempt in 1..=attempts {
            let now = Timestamp::now();
            let (mut working, fresh) = match self.load(caregiver).await? {
                Some(w) => (w, false),
                None if create_if_missing => (CaregiverWallet::open(*caregiver, now), true),
                None => {
                    return Err(LedgerError::WalletNotFound {
                        caregiver: caregiver.to_string(),
                    })
                }
            };

            let result = match apply(&mut working, now)? {
                Step::Unchanged(r) => return Ok(r),
                Step::Commit(r) => r,
            };
            working.verify()?;

            let expected = working.version;
            working.version = expected + 1;
            let written = if fresh {
                with_retry(&self.config.retry, "wallet.insert", || {
                    self.store.insert(&working)
                })
                .await
            } else {
                with_retry(&self.config.retry, "wallet.commit", || {
                    self.store.commit(&working, expected)
                })
                .await
            };

            match written {
                Ok(()) => return Ok(result),
                Err(StoreError::VersionConflict { .. }) | Err(StoreError::AlreadyExists { .. }) => {
                    // A timed-out attempt may have landed before the retry.
                    if self.load(caregiver).await?.as_ref() == Some(&working) {
                        return Ok(result);
                    }
                    tracing::debug!(caregiver = %caregiver, attempt, "wallet write lost a race, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LedgerError::Conflict {
            caregiver: caregiver.to_string(),
            attempts,
        })
    }
}

fn require_text(value: &str, field: &str) -> Result<String, LedgerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn require_funds(wallet: &CaregiverWallet, amount: Amount) -> Result<(), LedgerError> {
    if wallet.available_balance < amount {
        return Err(LedgerError::InsufficientFunds {
            caregiver: wallet.caregiver_id.to_string(),
            available: wallet.available_balance,
            requested: amount,
        });
    }
    Ok(())
}

/// Undo a live refund in `wallet`: a completed one gets a `reversal`
/// entry, a pending one is marked `failed`. Returns the entry that now
/// represents the undo.
fn undo_refund(
    wallet: &mut CaregiverWallet,
    original: &LedgerTransaction,
    reason: &str,
    now: Timestamp,
) -> Result<LedgerTransaction, LedgerError> {
    match original.status {
        TransactionStatus::Completed => {
            let mut reversal = LedgerTransaction::new(
                TransactionType::Reversal,
                original.amount,
                reason,
                TransactionStatus::Completed,
                now,
            )
            .with_booking(original.related_booking);
            reversal.related_dispute = original.related_dispute;
            reversal.reverses = Some(original.id);
            wallet.append(reversal.clone())?;
            Ok(reversal)
        }
        _ => {
            wallet.settle_pending(&original.id, TransactionStatus::Failed, now)?;
            Ok(wallet
                .transaction(&original.id)
                .cloned()
                .unwrap_or_else(|| original.clone()))
        }
    }
}

/// Settle queued refunds in FIFO order while the balance covers the head.
fn settle_queued_refunds(
    wallet: &mut CaregiverWallet,
    now: Timestamp,
) -> Result<Vec<TransactionId>, LedgerError> {
    let queue: Vec<(TransactionId, Amount)> = wallet
        .pending()
        .filter(|t| t.kind == TransactionType::Refund)
        .map(|t| (t.id, t.amount))
        .collect();
    let mut settled = Vec::new();
    for (id, amount) in queue {
        if wallet.available_balance < amount {
            break;
        }
        wallet.settle_pending(&id, TransactionStatus::Completed, now)?;
        settled.push(id);
    }
    Ok(settled)
}

fn record_txn(kind: TransactionType) {
    metrics::counter!("carelink_ledger_transactions_total", "type" => kind.as_str()).increment(1);
}
