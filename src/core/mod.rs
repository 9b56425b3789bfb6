//! Core ledger logic
//!
//! - `traits` - The `Ledger` and `BalanceCell` seams
//! - `validator` - Input validation shared by every ledger
//! - `ordering` - Deterministic lock order for two-account operations
//! - `cell` - Mutex and compare-and-swap balance cells
//! - `memory_ledger` - Ledger over a concurrent map of cells
//! - `coordinator` - Transaction boundaries and the conflict-retry loop
//! - `store_ledger` - Ledger over a transactional `Storage`
//! - `engine` - Boolean-result facade

pub mod cell;
pub mod coordinator;
pub mod engine;
pub mod memory_ledger;
pub mod ordering;
pub mod store_ledger;
pub mod traits;
pub mod validator;

pub use coordinator::{ConflictPolicy, Outcome, TransactionCoordinator};
pub use engine::LedgerEngine;
pub use memory_ledger::{CasLedger, MemoryLedger, MutexLedger};
pub use ordering::LockOrder;
pub use store_ledger::StoreLedger;
pub use traits::Ledger;
pub use validator::InputValidator;
