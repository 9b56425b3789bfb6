use crate::replay::ReplayConfig;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

/// Replay a ledger operation script under a chosen concurrency strategy
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(
    about = "Replay ledger operations concurrently and print final balances",
    long_about = None
)]
pub struct CliArgs {
    /// Input CSV file with `op,account,to,amount` records
    #[arg(value_name = "INPUT", help = "Path to the operation script")]
    pub input_file: PathBuf,

    /// Concurrency strategy the ledger runs
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        env = "LEDGER_STRATEGY",
        default_value = "row-lock",
        help = "Concurrency strategy guarding balances"
    )]
    pub strategy: StrategyType,

    /// Number of worker threads replaying operations
    #[arg(
        long = "workers",
        value_name = "COUNT",
        env = "LEDGER_WORKERS",
        help = "Worker threads replaying operations (default: CPU cores)"
    )]
    pub workers: Option<usize>,
}

/// Concurrency strategies a ledger can run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum StrategyType {
    /// Store-backed; `SELECT ... FOR UPDATE` in lock order, read committed
    RowLock,
    /// Store-backed; row locks at repeatable read, retry on serialization failure
    RowLockRetry,
    /// Store-backed; plain reads, update guarded by row version, retry
    VersionCheck,
    /// Store-backed; plain reads, update guarded by the balance read, retry
    BalanceCheck,
    /// Store-backed; serializable isolation, retry on serialization failure
    Serializable,
    /// Store-backed; `balance = balance + delta`, check constraint decides
    Delta,
    /// In-memory; per-account monitors in lock order
    Mutex,
    /// In-memory; compare-and-swap loops
    Cas,
}

impl StrategyType {
    pub const ALL: [StrategyType; 8] = [
        StrategyType::RowLock,
        StrategyType::RowLockRetry,
        StrategyType::VersionCheck,
        StrategyType::BalanceCheck,
        StrategyType::Serializable,
        StrategyType::Delta,
        StrategyType::Mutex,
        StrategyType::Cas,
    ];

    /// Name as accepted on the command line
    pub fn name(self) -> &'static str {
        match self {
            StrategyType::RowLock => "row-lock",
            StrategyType::RowLockRetry => "row-lock-retry",
            StrategyType::VersionCheck => "version-check",
            StrategyType::BalanceCheck => "balance-check",
            StrategyType::Serializable => "serializable",
            StrategyType::Delta => "delta",
            StrategyType::Mutex => "mutex",
            StrategyType::Cas => "cas",
        }
    }

    pub fn is_store_backed(self) -> bool {
        !matches!(self, StrategyType::Mutex | StrategyType::Cas)
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl CliArgs {
    /// Create a ReplayConfig from CLI arguments
    ///
    /// Missing values fall back to defaults; invalid ones are replaced by
    /// defaults with a warning.
    pub fn to_replay_config(&self) -> ReplayConfig {
        match self.workers {
            Some(workers) => ReplayConfig::new(workers),
            None => ReplayConfig::default(),
        }
    }
}
