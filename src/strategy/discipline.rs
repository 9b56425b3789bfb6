//! Store disciplines: how each store-backed strategy reads, writes and
//! reacts to conflicts

use crate::cli::StrategyType;
use crate::core::coordinator::ConflictPolicy;
use crate::storage::{Guard, IsolationLevel, ReadMode, Row};

/// Predicate attached to an overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Plain `WHERE id = ?`; safe only under a row lock or snapshot check
    Unguarded,
    /// Match the version read earlier
    Version,
    /// Match the balance read earlier
    Balance,
}

impl GuardKind {
    /// The concrete guard for an update of `row`
    pub fn guard_for(self, row: &Row) -> Guard {
        match self {
            GuardKind::Unguarded => Guard::None,
            GuardKind::Version => Guard::Version(row.version),
            GuardKind::Balance => Guard::Balance(row.balance),
        }
    }
}

/// How new balances reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Read the row, compute the new balance, write it back
    Overwrite(GuardKind),
    /// `balance = balance + delta` with no prior read; the check constraint
    /// decides sufficiency
    Delta,
}

/// Full parametrisation of the store-backed ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discipline {
    pub isolation: IsolationLevel,
    pub read: ReadMode,
    pub write: WriteMode,
    pub conflict: ConflictPolicy,
}

impl Discipline {
    /// Discipline of a store-backed strategy, `None` for in-memory ones
    pub fn of(strategy: StrategyType) -> Option<Self> {
        let discipline = match strategy {
            StrategyType::RowLock => Discipline {
                isolation: IsolationLevel::ReadCommitted,
                read: ReadMode::ForUpdate,
                write: WriteMode::Overwrite(GuardKind::Unguarded),
                conflict: ConflictPolicy::FailFast,
            },
            StrategyType::RowLockRetry => Discipline {
                isolation: IsolationLevel::RepeatableRead,
                read: ReadMode::ForUpdate,
                write: WriteMode::Overwrite(GuardKind::Unguarded),
                conflict: ConflictPolicy::Retry,
            },
            StrategyType::VersionCheck => Discipline {
                isolation: IsolationLevel::ReadCommitted,
                read: ReadMode::Plain,
                write: WriteMode::Overwrite(GuardKind::Version),
                conflict: ConflictPolicy::Retry,
            },
            StrategyType::BalanceCheck => Discipline {
                isolation: IsolationLevel::ReadCommitted,
                read: ReadMode::Plain,
                write: WriteMode::Overwrite(GuardKind::Balance),
                conflict: ConflictPolicy::Retry,
            },
            StrategyType::Serializable => Discipline {
                isolation: IsolationLevel::Serializable,
                read: ReadMode::Plain,
                write: WriteMode::Overwrite(GuardKind::Unguarded),
                conflict: ConflictPolicy::Retry,
            },
            StrategyType::Delta => Discipline {
                isolation: IsolationLevel::ReadCommitted,
                read: ReadMode::Plain,
                write: WriteMode::Delta,
                conflict: ConflictPolicy::FailFast,
            },
            StrategyType::Mutex | StrategyType::Cas => return None,
        };
        Some(discipline)
    }
}
