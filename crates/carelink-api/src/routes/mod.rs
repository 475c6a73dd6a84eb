//! # API Route Modules
//!
//! - `disputes`: Case filing, triage, party evidence and responses,
//!   status changes, decisions, and satisfaction ratings.
//! - `wallet`: Caregiver earnings and withdrawals, plus the admin
//!   overview, payroll reset, and fee-rate endpoints.

pub mod disputes;
pub mod wallet;
