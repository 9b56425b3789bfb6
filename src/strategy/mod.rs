//! Strategy selection
//!
//! Eight concurrency strategies collapse onto two ledger kernels. The
//! in-memory strategies pick a balance cell type; the store-backed ones pick
//! a [`Discipline`] for [`StoreLedger`]. Which one runs is decided at
//! construction time and never changes for the life of the ledger.

pub mod discipline;

pub use crate::cli::StrategyType;
pub use discipline::{Discipline, GuardKind, WriteMode};

use crate::core::memory_ledger::{CasLedger, MutexLedger};
use crate::core::store_ledger::StoreLedger;
use crate::core::traits::Ledger;
use crate::storage::{MemoryTable, Storage};
use std::sync::Arc;

/// Create a ledger for the specified strategy
///
/// Store-backed strategies get a fresh in-process [`MemoryTable`].
///
/// # Arguments
///
/// * `strategy` - The concurrency strategy to run
///
/// # Returns
///
/// A boxed trait object implementing [`Ledger`]. Call [`Ledger::start`]
/// before use.
pub fn create_ledger(strategy: StrategyType) -> Box<dyn Ledger> {
    create_ledger_with_storage(strategy, Arc::new(MemoryTable::new()))
}

/// Create a ledger for the specified strategy on top of `storage`
///
/// In-memory strategies ignore `storage`.
pub fn create_ledger_with_storage(
    strategy: StrategyType,
    storage: Arc<dyn Storage>,
) -> Box<dyn Ledger> {
    match Discipline::of(strategy) {
        Some(discipline) => Box::new(StoreLedger::new(strategy, discipline, storage)),
        None if strategy == StrategyType::Cas => Box::new(CasLedger::new()),
        None => Box::new(MutexLedger::new()),
    }
}
