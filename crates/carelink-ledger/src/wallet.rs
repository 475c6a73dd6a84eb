//! # Wallet Model
//!
//! [`CaregiverWallet`] and its append-only [`LedgerTransaction`] history.
//!
//! Transactions are never edited or removed. The one permitted change is
//! the single status step of a `pending` entry to `completed` or `failed`;
//! type, amount, and references stay fixed from the moment of append.

use serde::{Deserialize, Serialize};

use carelink_core::{Amount, BookingId, DisputeId, Timestamp, TransactionId, UserId};

use crate::error::LedgerError;

// ── Transaction ────────────────────────────────────────────────────────

/// What a ledger entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Payment for a completed booking.
    Earning,
    /// Payout to the caregiver, including payroll resets.
    Withdrawal,
    /// Money returned to a careseeker, typically by dispute resolution.
    Refund,
    /// The marketplace's cut of an earning.
    PlatformFee,
    /// Compensating credit that undoes a prior refund.
    Reversal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earning => "earning",
            Self::Withdrawal => "withdrawal",
            Self::Refund => "refund",
            Self::PlatformFee => "platform_fee",
            Self::Reversal => "reversal",
        }
    }

    /// Whether a completed entry of this type adds to the available balance.
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Earning | Self::Reversal)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A single append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Always positive; direction comes from `kind`.
    pub amount: Amount,
    pub description: String,
    pub status: TransactionStatus,
    pub created_at: Timestamp,
    /// When a `pending` entry reached its final status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_booking: Option<BookingId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_dispute: Option<DisputeId>,
    /// For `reversal` entries: the refund being undone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverses: Option<TransactionId>,
    /// For `platform_fee` entries: the rate in force when the fee was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate_bps: Option<u32>,
}

impl LedgerTransaction {
    /// A new entry stamped `now`, with no references.
    pub fn new(
        kind: TransactionType,
        amount: Amount,
        description: impl Into<String>,
        status: TransactionStatus,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            kind,
            amount,
            description: description.into(),
            status,
            created_at: now,
            settled_at: None,
            related_booking: None,
            related_dispute: None,
            reverses: None,
            fee_rate_bps: None,
        }
    }

    pub fn with_booking(mut self, booking: Option<BookingId>) -> Self {
        self.related_booking = booking;
        self
    }

    pub fn with_dispute(mut self, dispute: DisputeId) -> Self {
        self.related_dispute = Some(dispute);
        self
    }

    /// Effect on the available balance if this entry were completed.
    pub fn signed_amount(&self) -> Amount {
        if self.kind.is_credit() {
            self.amount
        } else {
            Amount::ZERO - self.amount
        }
    }
}

// ── Wallet ─────────────────────────────────────────────────────────────

/// One caregiver's earnings wallet.
///
/// All four totals are derived from `transactions` by [`recompute`](Self::recompute);
/// they are stored only so that readers need not replay the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaregiverWallet {
    pub caregiver_id: UserId,
    pub available_balance: Amount,
    pub total_earnings: Amount,
    pub total_platform_fees: Amount,
    /// Sum of entries still `pending` (queued refunds awaiting funds).
    pub pending_amount: Amount,
    pub transactions: Vec<LedgerTransaction>,
    pub created_at: Timestamp,
    pub last_updated: Timestamp,
    /// Optimistic-concurrency counter, bumped on every committed write.
    pub version: u64,
}

impl CaregiverWallet {
    /// An empty wallet at version 0.
    pub fn open(caregiver_id: UserId, now: Timestamp) -> Self {
        Self {
            caregiver_id,
            available_balance: Amount::ZERO,
            total_earnings: Amount::ZERO,
            total_platform_fees: Amount::ZERO,
            pending_amount: Amount::ZERO,
            transactions: Vec::new(),
            created_at: now,
            last_updated: now,
            version: 0,
        }
    }

    /// Append an entry and refresh the derived totals.
    pub fn append(&mut self, txn: LedgerTransaction) -> Result<(), LedgerError> {
        self.last_updated = txn.created_at;
        self.transactions.push(txn);
        self.recompute()
    }

    /// Move a `pending` entry to its final status.
    pub fn settle_pending(
        &mut self,
        id: &TransactionId,
        status: TransactionStatus,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let caregiver = self.caregiver_id;
        let txn = self
            .transactions
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| LedgerError::TransactionNotFound {
                caregiver: caregiver.to_string(),
                transaction: id.to_string(),
            })?;
        if txn.status != TransactionStatus::Pending || status == TransactionStatus::Pending {
            return Err(LedgerError::InvalidArgument(format!(
                "transaction {id} is {} and cannot become {}",
                txn.status.as_str(),
                status.as_str()
            )));
        }
        txn.status = status;
        txn.settled_at = Some(now);
        self.last_updated = now;
        self.recompute()?;
        Ok(())
    }

    /// Rebuild every derived total from the transaction list.
    pub fn recompute(&mut self) -> Result<(), LedgerError> {
        let mut earnings = Amount::ZERO;
        let mut fees = Amount::ZERO;
        let mut pending = Amount::ZERO;
        for t in &self.transactions {
            let total = match (t.status, t.kind) {
                (TransactionStatus::Completed, TransactionType::Earning) => &mut earnings,
                (TransactionStatus::Completed, TransactionType::PlatformFee) => &mut fees,
                (TransactionStatus::Pending, _) => &mut pending,
                _ => continue,
            };
            *total = self.add(*total, t.amount)?;
        }
        self.total_earnings = earnings;
        self.total_platform_fees = fees;
        self.pending_amount = pending;
        self.available_balance = self.computed_balance()?;
        Ok(())
    }

    /// The signed sum of completed entries.
    pub fn computed_balance(&self) -> Result<Amount, LedgerError> {
        self.transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed)
            .try_fold(Amount::ZERO, |acc, t| self.add(acc, t.signed_amount()))
    }

    fn add(&self, a: Amount, b: Amount) -> Result<Amount, LedgerError> {
        a.checked_add(b).ok_or_else(|| LedgerError::Overflow {
            caregiver: self.caregiver_id.to_string(),
        })
    }

    /// Check the stored totals against the history.
    pub fn verify(&self) -> Result<(), LedgerError> {
        let computed = self.computed_balance()?;
        if computed != self.available_balance {
            return Err(LedgerError::BalanceDrift {
                caregiver: self.caregiver_id.to_string(),
                recorded: self.available_balance,
                computed,
            });
        }
        let mut fresh = self.clone();
        fresh.recompute()?;
        if fresh.total_earnings != self.total_earnings
            || fresh.total_platform_fees != self.total_platform_fees
            || fresh.pending_amount != self.pending_amount
        {
            return Err(LedgerError::BalanceDrift {
                caregiver: self.caregiver_id.to_string(),
                recorded: self.available_balance,
                computed,
            });
        }
        if computed.is_negative() {
            return Err(LedgerError::NegativeBalance {
                caregiver: self.caregiver_id.to_string(),
                balance: computed,
            });
        }
        Ok(())
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<&LedgerTransaction> {
        self.transactions.iter().find(|t| &t.id == id)
    }

    /// The live refund recorded for `dispute`: not failed and not reversed.
    pub fn active_dispute_refund(&self, dispute: &DisputeId) -> Option<&LedgerTransaction> {
        self.transactions.iter().find(|t| {
            t.kind == TransactionType::Refund
                && t.related_dispute.as_ref() == Some(dispute)
                && t.status != TransactionStatus::Failed
                && self.reversal_of(&t.id).is_none()
        })
    }

    pub fn reversal_of(&self, refund: &TransactionId) -> Option<&LedgerTransaction> {
        self.transactions
            .iter()
            .find(|t| t.kind == TransactionType::Reversal && t.reverses.as_ref() == Some(refund))
    }

    pub fn earning_for_booking(&self, booking: &BookingId) -> Option<&LedgerTransaction> {
        self.transactions
            .iter()
            .find(|t| t.kind == TransactionType::Earning && t.related_booking.as_ref() == Some(booking))
    }

    /// Pending entries, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &LedgerTransaction> {
        self.transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> Timestamp {
        Timestamp::now()
    }

    fn completed(kind: TransactionType, amount: i64) -> LedgerTransaction {
        LedgerTransaction::new(
            kind,
            Amount::new(amount),
            "test",
            TransactionStatus::Completed,
            now(),
        )
    }

    #[test]
    fn open_wallet_is_empty() {
        let w = CaregiverWallet::open(UserId::new(), now());
        assert_eq!(w.available_balance, Amount::ZERO);
        assert_eq!(w.version, 0);
        assert!(w.verify().is_ok());
    }

    #[test]
    fn balance_follows_signs() {
        let mut w = CaregiverWallet::open(UserId::new(), now());
        w.append(completed(TransactionType::Earning, 1_000)).unwrap();
        w.append(completed(TransactionType::PlatformFee, 100)).unwrap();
        w.append(completed(TransactionType::Refund, 300)).unwrap();
        w.append(completed(TransactionType::Reversal, 300)).unwrap();
        w.append(completed(TransactionType::Withdrawal, 200)).unwrap();
        assert_eq!(w.available_balance, Amount::new(700));
        assert_eq!(w.total_earnings, Amount::new(1_000));
        assert_eq!(w.total_platform_fees, Amount::new(100));
        assert!(w.verify().is_ok());
    }

    #[test]
    fn pending_entries_do_not_touch_balance() {
        let mut w = CaregiverWallet::open(UserId::new(), now());
        w.append(completed(TransactionType::Earning, 500)).unwrap();
        let queued = LedgerTransaction::new(
            TransactionType::Refund,
            Amount::new(800),
            "queued",
            TransactionStatus::Pending,
            now(),
        );
        let queued_id = queued.id;
        w.append(queued).unwrap();
        assert_eq!(w.available_balance, Amount::new(500));
        assert_eq!(w.pending_amount, Amount::new(800));

        w.settle_pending(&queued_id, TransactionStatus::Failed, now())
            .unwrap();
        assert_eq!(w.pending_amount, Amount::ZERO);
        assert_eq!(w.available_balance, Amount::new(500));
    }

    #[test]
    fn settled_entries_cannot_change_again() {
        let mut w = CaregiverWallet::open(UserId::new(), now());
        let t = completed(TransactionType::Earning, 10);
        let id = t.id;
        w.append(t).unwrap();
        assert!(w
            .settle_pending(&id, TransactionStatus::Failed, now())
            .is_err());
    }

    #[test]
    fn verify_detects_tampered_balance() {
        let mut w = CaregiverWallet::open(UserId::new(), now());
        w.append(completed(TransactionType::Earning, 1_000)).unwrap();
        w.available_balance = Amount::new(5_000);
        assert!(matches!(w.verify(), Err(LedgerError::BalanceDrift { .. })));
    }

    #[test]
    fn verify_detects_negative_balance() {
        let mut w = CaregiverWallet::open(UserId::new(), now());
        w.append(completed(TransactionType::Withdrawal, 1)).unwrap();
        assert!(matches!(
            w.verify(),
            Err(LedgerError::NegativeBalance { .. })
        ));
    }

    #[test]
    fn total_overflow_is_an_error_not_a_clamp() {
        use carelink_core::Coded;

        let mut w = CaregiverWallet::open(UserId::new(), now());
        w.append(completed(TransactionType::Earning, i64::MAX)).unwrap();
        let err = w
            .append(completed(TransactionType::Earning, 1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Overflow { .. }));
        assert_eq!(err.code(), carelink_core::ErrorCode::Internal);
    }

    #[test]
    fn reversed_refund_is_no_longer_active() {
        let dispute = DisputeId::new();
        let mut w = CaregiverWallet::open(UserId::new(), now());
        w.append(completed(TransactionType::Earning, 1_000)).unwrap();
        let refund = completed(TransactionType::Refund, 400).with_dispute(dispute);
        let refund_id = refund.id;
        w.append(refund).unwrap();
        assert!(w.active_dispute_refund(&dispute).is_some());

        let mut reversal = completed(TransactionType::Reversal, 400).with_dispute(dispute);
        reversal.reverses = Some(refund_id);
        w.append(reversal).unwrap();
        assert!(w.active_dispute_refund(&dispute).is_none());
        assert_eq!(w.available_balance, Amount::new(1_000));
    }

    #[test]
    fn transaction_type_serializes_snake_case() {
        let t = completed(TransactionType::PlatformFee, 5);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "platform_fee");
        assert_eq!(json["status"], "completed");
        assert!(json.get("reverses").is_none());
    }

    fn arb_kind() -> impl Strategy<Value = TransactionType> {
        prop_oneof![
            Just(TransactionType::Earning),
            Just(TransactionType::Withdrawal),
            Just(TransactionType::Refund),
            Just(TransactionType::PlatformFee),
            Just(TransactionType::Reversal),
        ]
    }

    fn arb_status() -> impl Strategy<Value = TransactionStatus> {
        prop_oneof![
            Just(TransactionStatus::Pending),
            Just(TransactionStatus::Completed),
            Just(TransactionStatus::Failed),
        ]
    }

    proptest! {
        #[test]
        fn balance_equals_signed_sum_of_completed(
            entries in prop::collection::vec((arb_kind(), 1i64..1_000_000, arb_status()), 0..40)
        ) {
            let mut w = CaregiverWallet::open(UserId::new(), now());
            let mut expected: i64 = 0;
            for (kind, amount, status) in entries {
                if status == TransactionStatus::Completed {
                    expected += if kind.is_credit() { amount } else { -amount };
                }
                w.append(LedgerTransaction::new(kind, Amount::new(amount), "p", status, now())).unwrap();
                prop_assert_eq!(w.available_balance, w.computed_balance().unwrap());
            }
            prop_assert_eq!(w.available_balance.minor_units(), expected);
        }
    }
}
