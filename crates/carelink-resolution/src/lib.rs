//! # carelink-resolution: Deciding Dispute Cases
//!
//! Ties a case decision to the caregiver ledger. [`decision`] validates a
//! request and plans its effect; [`engine`] applies it as a claim → refund
//! → commit saga with compensation, so a decision is either fully applied
//! or leaves both stores as they were.

pub mod decision;
pub mod engine;
pub mod error;

pub use decision::{plan, DecisionPlan, DecisionRequest};
pub use engine::{DecisionOutcome, ResolutionConfig, ResolutionEngine, DEFAULT_CLAIM_TTL_SECS};
pub use error::ResolutionError;
