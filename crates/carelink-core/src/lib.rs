//! # carelink-core: Foundational Types for the Dispute Service
//!
//! Every other crate in the workspace depends on `carelink-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `UserId`, `BookingId`,
//!    `DisputeId`, `TransactionId`. You cannot pass a booking where a
//!    dispute is expected.
//!
//! 2. **Integer money.** [`Amount`] holds minor currency units as `i64`.
//!    Fees are computed in basis points with explicit half-up rounding.
//!    No floats touch a balance.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is always UTC, seconds precision.
//!
//! 4. **Stable error codes.** [`ErrorCode`] is the machine-readable code every
//!    domain error maps onto. Clients branch on the code, never on messages.
//!
//! 5. **Bounded store I/O.** Every store call goes through [`retry::with_retry`],
//!    which applies a per-attempt timeout and exponential backoff, and
//!    surfaces `Unavailable` once the budget is spent.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `carelink-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;
pub mod money;
pub mod retry;
pub mod temporal;

pub use digest::{sha256_hex, GENESIS_DIGEST};
pub use error::{Coded, ErrorCode, StoreError};
pub use identity::{BookingId, DisputeId, TransactionId, UserId};
pub use money::{Amount, FeeRate, MoneyError};
pub use retry::{with_retry, CancelFlag, RetryPolicy};
pub use temporal::{Timestamp, TimestampError, Watermark};
