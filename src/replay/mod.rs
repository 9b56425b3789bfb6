//! Operation script replay
//!
//! Drives a [`LedgerEngine`] from a CSV script and checks the ledger
//! invariant afterwards.
//!
//! ```text
//! ReplayPipeline
//!     ├── ReplayConfig (worker count)
//!     ├── ScriptReader (streaming CSV operations)
//!     ├── worker::run_concurrently (round-robin worker threads)
//!     └── LedgerEngine (one strategy)
//! ```
//!
//! Account creation runs first, sequentially and in script order, so every
//! later operation sees the accounts the script meant to exist. Deposits and
//! transfers then run concurrently. Once all workers finish, the sum of the
//! balances must equal the sum of accepted deposits.

pub mod worker;

pub use worker::{partition_round_robin, run_concurrently, Tally};

use crate::core::engine::LedgerEngine;
use crate::io::csv_format::write_balances_csv;
use crate::io::script_reader::ScriptReader;
use crate::types::{LedgerError, OperationKind};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration for replay
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Number of worker threads running deposits and transfers
    pub workers: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
        }
    }
}

impl ReplayConfig {
    /// Create a ReplayConfig, replacing a zero worker count by the default
    pub fn new(workers: usize) -> Self {
        if workers == 0 {
            let default = Self::default();
            warn!(
                workers,
                default = default.workers,
                "invalid worker count, using default"
            );
            return default;
        }
        Self { workers }
    }
}

/// Summary of one replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Rows that could not be turned into operations
    pub skipped: usize,
    /// Outcome counts over every executed operation
    pub tally: Tally,
    /// Sum of all final balances
    pub total_balance: i128,
}

/// Failure of a replay as a whole
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Conservation violated: balances sum to {actual}, accepted deposits sum to {expected}")]
    ConservationViolated { expected: i128, actual: i128 },
}

/// Script replay over one engine
pub struct ReplayPipeline<'e> {
    engine: &'e LedgerEngine,
    config: ReplayConfig,
}

impl<'e> ReplayPipeline<'e> {
    pub fn new(engine: &'e LedgerEngine, config: ReplayConfig) -> Self {
        Self { engine, config }
    }

    /// Replay the script at `input_path` and write final balances to `output`
    ///
    /// Malformed rows are logged and skipped. Refused operations are counted,
    /// not fatal.
    ///
    /// # Errors
    ///
    /// - The script cannot be opened
    /// - A fatal ledger failure
    /// - The conservation check fails (nothing is written in that case)
    /// - Output cannot be written
    pub fn run(&self, input_path: &Path, output: &mut dyn Write) -> Result<ReplayReport, ReplayError> {
        let reader = ScriptReader::new(input_path).map_err(ReplayError::Input)?;

        let mut setup = Vec::new();
        let mut workload = Vec::new();
        let mut skipped = 0;
        for result in reader {
            match result {
                Ok(operation) => match operation.kind() {
                    OperationKind::Create => setup.push(operation),
                    _ => workload.push(operation),
                },
                Err(e) => {
                    warn!(error = %e, "skipping malformed record");
                    skipped += 1;
                }
            }
        }

        let mut tally = Tally::default();
        for operation in &setup {
            let applied = worker::execute(self.engine, operation)?;
            tally.record(operation, applied);
        }
        tally.merge(run_concurrently(self.engine, workload, self.config.workers)?);

        let accounts = self.engine.accounts()?;
        let total_balance = worker::balances_total(accounts.iter().map(|a| &a.balance));
        if total_balance != tally.deposited {
            return Err(ReplayError::ConservationViolated {
                expected: tally.deposited,
                actual: total_balance,
            });
        }

        write_balances_csv(&accounts, output).map_err(ReplayError::Output)?;

        info!(
            strategy = %self.engine.strategy(),
            workers = self.config.workers,
            accounts = accounts.len(),
            applied = tally.applied,
            rejected = tally.rejected,
            skipped,
            "replay complete"
        );

        Ok(ReplayReport {
            skipped,
            tally,
            total_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StrategyType;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn script(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_zero_workers_falls_back() {
        assert_eq!(ReplayConfig::new(0), ReplayConfig::default());
        assert_eq!(ReplayConfig::new(5).workers, 5);
    }

    #[test]
    fn test_creates_run_before_workload() {
        // The deposit precedes the create in the script but still lands
        let file = script("op,account,to,amount\ndeposit,a,,5\ncreate,a,,\n");
        let engine = LedgerEngine::new(StrategyType::RowLock);
        engine.start().unwrap();

        let mut output = Vec::new();
        let report = ReplayPipeline::new(&engine, ReplayConfig::new(2))
            .run(file.path(), &mut output)
            .unwrap();

        assert_eq!(report.tally.applied, 2);
        assert_eq!(report.total_balance, 5);
        assert_eq!(String::from_utf8(output).unwrap(), "account,balance\na,5\n");
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let engine = LedgerEngine::new(StrategyType::Cas);
        let mut output = Vec::new();
        let result = ReplayPipeline::new(&engine, ReplayConfig::default())
            .run(Path::new("does-not-exist.csv"), &mut output);
        assert!(matches!(result, Err(ReplayError::Input(_))));
    }
}
