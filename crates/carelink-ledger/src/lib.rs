//! # carelink-ledger: Caregiver Earnings Ledger
//!
//! One wallet per caregiver, created lazily on the first earning. A wallet
//! is an append-only list of transactions; every balance figure on it is
//! derived from that list and recomputed on each write.
//!
//! ## Balance Invariant
//!
//! ```text
//! available_balance = Σ completed earning + Σ completed reversal
//!                   − Σ completed platform_fee − Σ completed refund
//!                   − Σ completed withdrawal
//! ```
//!
//! `available_balance` never goes negative. A debit that would overdraw is
//! rejected, or for dispute refunds under
//! [`UnderfundedRefundPolicy::QueuePending`], recorded as `pending` and
//! settled once later earnings cover it.
//!
//! ## Concurrency
//!
//! Every write is read → mutate → compare-and-swap on the wallet `version`.
//! A lost race re-reads and re-validates, so two debits can never both pass
//! the sufficiency check against the same balance.

pub mod config;
pub mod error;
pub mod ledger;
pub mod store;
pub mod wallet;

pub use config::{LedgerConfig, UnderfundedRefundPolicy};
pub use error::LedgerError;
pub use ledger::{
    CreditReceipt, DebitKind, DisputeRefund, Ledger, RefundOutcome, ResetFailure, ResetReport,
    WalletOverview, WalletStats, WalletSummary,
};
pub use store::{MemoryWalletStore, WalletStore};
pub use wallet::{CaregiverWallet, LedgerTransaction, TransactionStatus, TransactionType};
