//! Ledger configuration, injected at construction.

use serde::{Deserialize, Serialize};

use carelink_core::{FeeRate, RetryPolicy};

/// What a dispute refund does when the wallet cannot cover it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderfundedRefundPolicy {
    /// Fail with `InsufficientFunds`; the decision is not applied.
    #[default]
    Reject,
    /// Record the refund as `pending`; it settles from later earnings.
    QueuePending,
}

impl UnderfundedRefundPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(Self::Reject),
            "queue_pending" | "queue-pending" | "pending" => Some(Self::QueuePending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Initial platform fee rate. May be changed at runtime via
    /// [`Ledger::set_fee_rate`](crate::Ledger::set_fee_rate).
    pub fee_rate: FeeRate,
    pub underfunded_refunds: UnderfundedRefundPolicy,
    pub retry: RetryPolicy,
    /// Compare-and-swap attempts before a write gives up with `Conflict`.
    pub max_cas_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fee_rate: FeeRate::default(),
            underfunded_refunds: UnderfundedRefundPolicy::default(),
            retry: RetryPolicy::default(),
            max_cas_attempts: 8,
        }
    }
}
