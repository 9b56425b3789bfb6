//! Ledger Engine CLI
//!
//! Replays a CSV operation script against a ledger running the chosen
//! concurrency strategy and prints the final balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > balances.csv
//! cargo run -- --strategy version-check operations.csv > balances.csv
//! cargo run -- --strategy cas --workers 16 operations.csv > balances.csv
//! RUST_LOG=ledger_engine=debug cargo run -- --strategy delta operations.csv
//! ```
//!
//! Logs go to stderr; stdout carries only the balances CSV.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Unreadable input, fatal ledger failure, or conservation violated

use ledger_engine::cli;
use ledger_engine::core::LedgerEngine;
use ledger_engine::replay::ReplayPipeline;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();
    let config = args.to_replay_config();
    let engine = LedgerEngine::new(args.strategy);
    info!(
        strategy = %args.strategy,
        store_backed = args.strategy.is_store_backed(),
        workers = config.workers,
        input = %args.input_file.display(),
        "starting replay"
    );

    if let Err(e) = engine.start() {
        error!(error = %e, "failed to start ledger");
        process::exit(1);
    }

    let mut output = std::io::stdout();
    let result = ReplayPipeline::new(&engine, config).run(&args.input_file, &mut output);

    if let Err(e) = engine.shutdown() {
        error!(error = %e, "failed to shut down ledger");
    }

    if let Err(e) = result {
        error!(error = %e, "replay failed");
        process::exit(1);
    }
}
