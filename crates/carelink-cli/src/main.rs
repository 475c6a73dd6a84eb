//! # carelink CLI entry point

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use carelink_cli::migrate::{run_migrate, MigrateArgs};
use carelink_cli::verify::{run_verify_ledger, VerifyLedgerArgs};

/// Admin tooling for the carelink dispute and wallet service.
#[derive(Parser, Debug)]
#[command(name = "carelink", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite legacy bare-URL evidence into structured entries.
    MigrateEvidence(MigrateArgs),

    /// Check exported wallets against their transaction histories.
    VerifyLedger(VerifyLedgerArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::MigrateEvidence(args) => run_migrate(&args),
        Commands::VerifyLedger(args) => run_verify_ledger(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
