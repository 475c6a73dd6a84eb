//! # carelink-cli: Admin Tooling
//!
//! Offline operations that run against exported JSON rather than the live
//! service:
//!
//! - `carelink migrate-evidence`: One-time rewrite of legacy bare-URL
//!   evidence into structured entries.
//! - `carelink verify-ledger`: Check every wallet's stored totals against
//!   its transaction history.
//!
//! ```bash
//! carelink migrate-evidence --input legacy.json --output cases.json
//! carelink verify-ledger --input wallets.json
//! ```
//!
//! Exit codes: `0` clean, `1` the command could not run, `2` the command
//! ran and found problems.

pub mod migrate;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Exit code for a run that completed but found problems.
pub const EXIT_FINDINGS: u8 = 2;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}
