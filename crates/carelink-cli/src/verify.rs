//! `carelink verify-ledger`: check exported wallets offline.
//!
//! A wallet passes when its stored balance and totals equal what its
//! transaction history produces and the balance is not negative.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use carelink_core::UserId;
use carelink_ledger::CaregiverWallet;

use crate::{read_json, EXIT_FINDINGS};

#[derive(Args, Debug)]
pub struct VerifyLedgerArgs {
    /// JSON array of caregiver wallets.
    #[arg(long)]
    pub input: PathBuf,

    /// Print the audit as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerAudit {
    pub checked: usize,
    pub failures: Vec<WalletFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletFailure {
    pub caregiver_id: UserId,
    pub error: String,
}

impl LedgerAudit {
    pub fn of(wallets: &[CaregiverWallet]) -> Self {
        let failures = wallets
            .iter()
            .filter_map(|w| {
                w.verify().err().map(|e| WalletFailure {
                    caregiver_id: w.caregiver_id,
                    error: e.to_string(),
                })
            })
            .collect();
        Self {
            checked: wallets.len(),
            failures,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn run_verify_ledger(args: &VerifyLedgerArgs) -> Result<u8> {
    let wallets: Vec<CaregiverWallet> = read_json(&args.input)?;
    let audit = LedgerAudit::of(&wallets);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&audit)?);
    } else {
        for f in &audit.failures {
            println!("  DRIFT  {}: {}", f.caregiver_id, f.error);
        }
        println!(
            "Checked {} wallet(s), {} failed",
            audit.checked,
            audit.failures.len()
        );
    }

    if audit.is_clean() {
        Ok(0)
    } else {
        tracing::error!(failed = audit.failures.len(), "ledger verification found drift");
        Ok(EXIT_FINDINGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::{Amount, Timestamp};
    use carelink_ledger::{LedgerTransaction, TransactionStatus, TransactionType};

    use crate::write_json;

    fn wallet(earned: i64, withdrawn: i64) -> CaregiverWallet {
        let now = Timestamp::now();
        let mut w = CaregiverWallet::open(UserId::new(), now);
        w.append(LedgerTransaction::new(
            TransactionType::Earning,
            Amount::new(earned),
            "Booking",
            TransactionStatus::Completed,
            now,
        ))
        .unwrap();
        w.append(LedgerTransaction::new(
            TransactionType::Withdrawal,
            Amount::new(withdrawn),
            "Payout",
            TransactionStatus::Completed,
            now,
        ))
        .unwrap();
        w
    }

    #[test]
    fn consistent_wallets_pass() {
        let audit = LedgerAudit::of(&[wallet(5_000, 2_000), wallet(100, 100)]);
        assert_eq!(audit.checked, 2);
        assert!(audit.is_clean());
    }

    #[test]
    fn tampered_balance_is_reported() {
        let mut bad = wallet(5_000, 2_000);
        bad.available_balance = Amount::new(9_999);
        let audit = LedgerAudit::of(&[wallet(10, 0), bad.clone()]);
        assert_eq!(audit.failures.len(), 1);
        assert_eq!(audit.failures[0].caregiver_id, bad.caregiver_id);
    }

    #[test]
    fn overdrawn_history_is_reported() {
        let audit = LedgerAudit::of(&[wallet(1_000, 3_000)]);
        assert!(!audit.is_clean());
    }

    #[test]
    fn exit_code_reflects_drift() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("wallets.json");

        write_json(&input, &vec![wallet(5_000, 2_000)]).unwrap();
        let args = VerifyLedgerArgs {
            input: input.clone(),
            json: false,
        };
        assert_eq!(run_verify_ledger(&args).unwrap(), 0);

        let mut bad = wallet(5_000, 2_000);
        bad.total_earnings = Amount::new(1);
        write_json(&input, &vec![bad]).unwrap();
        assert_eq!(run_verify_ledger(&args).unwrap(), EXIT_FINDINGS);
    }
}
