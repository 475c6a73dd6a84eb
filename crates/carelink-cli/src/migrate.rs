//! `carelink migrate-evidence`: convert an export of legacy case documents.
//!
//! Every document is migrated and decoded. Without `--allow-partial`, a
//! single failure means nothing is written.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use carelink_dispute::{migrate_documents, MigrationReport};

use crate::{read_json, write_json, EXIT_FINDINGS};

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// JSON array of case documents, legacy or current.
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the migrated cases.
    #[arg(long)]
    pub output: PathBuf,

    /// Write the cases that migrated even if others failed.
    #[arg(long)]
    pub allow_partial: bool,
}

pub fn run_migrate(args: &MigrateArgs) -> Result<u8> {
    let docs: Vec<Value> = read_json(&args.input)?;
    let (cases, report) = migrate_documents(docs);
    print_report(&report);

    if !report.failed.is_empty() && !args.allow_partial {
        println!("Nothing written. Fix the documents above or pass --allow-partial.");
        return Ok(EXIT_FINDINGS);
    }

    write_json(&args.output, &cases)?;
    println!("Wrote {} case(s) to {}", cases.len(), args.output.display());
    tracing::info!(
        scanned = report.scanned,
        migrated = report.migrated,
        failed = report.failed.len(),
        "evidence migration written"
    );
    Ok(if report.failed.is_empty() { 0 } else { EXIT_FINDINGS })
}

fn print_report(report: &MigrationReport) {
    println!(
        "Scanned {}, migrated {} ({} evidence entries), failed {}",
        report.scanned,
        report.migrated,
        report.evidence_rewritten,
        report.failed.len()
    );
    for f in &report.failed {
        println!(
            "  FAIL  #{} {}: {}",
            f.index,
            f.id.as_deref().unwrap_or("<no id>"),
            f.error
        );
    }
}
