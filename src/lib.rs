//! Ledger Engine Library
//!
//! # Overview
//!
//! A money ledger offering account creation, deposit, transfer and balance
//! lookup under eight interchangeable concurrency strategies. Whatever the
//! strategy and however operations interleave:
//!
//! - the sum of all balances equals the sum of accepted deposits
//! - no balance is ever negative
//! - two-account operations cannot deadlock
//!
//! # Architecture
//!
//! - [`types`] - Accounts, operations and errors
//! - [`cli`] - CLI argument parsing and the [`StrategyType`] selector
//! - [`core`] - Ledger kernels:
//!   - [`core::memory_ledger`] - In-memory ledger over mutex or CAS cells
//!   - [`core::store_ledger`] - Ledger over a transactional [`storage::Storage`]
//!   - [`core::coordinator`] - Transaction boundaries and conflict retry
//!   - [`core::engine`] - Boolean-result facade
//! - [`storage`] - Storage traits and the in-process [`storage::MemoryTable`]
//! - [`strategy`] - Strategy to kernel mapping
//! - [`io`] - Script reading and balance output
//! - [`replay`] - Concurrent script replay with conservation check
//!
//! # Strategies
//!
//! | Strategy | Backend | Conflict handling |
//! |---|---|---|
//! | `row-lock` | store | row locks in id order |
//! | `row-lock-retry` | store | row locks at repeatable read, retry |
//! | `version-check` | store | version-guarded update, retry |
//! | `balance-check` | store | balance-guarded update, retry |
//! | `serializable` | store | serializable isolation, retry |
//! | `delta` | store | relative update, check constraint, no retry |
//! | `mutex` | memory | per-account monitors in id order |
//! | `cas` | memory | compare-and-swap loop |
//!
//! # Example
//!
//! ```
//! use ledger_engine::{LedgerEngine, StrategyType};
//!
//! let engine = LedgerEngine::new(StrategyType::VersionCheck);
//! engine.start().unwrap();
//! engine.create_account("left").unwrap();
//! engine.create_account("right").unwrap();
//! engine.deposit("left", 100).unwrap();
//!
//! assert_eq!(engine.transfer("left", "right", 30), Ok(true));
//! assert_eq!(engine.transfer("left", "right", 300), Ok(false));
//! assert_eq!(engine.get_balance("right"), Ok(Some(30)));
//! ```

pub mod cli;
pub mod core;
pub mod io;
pub mod replay;
pub mod storage;
pub mod strategy;
pub mod types;

pub use cli::StrategyType;
pub use core::{Ledger, LedgerEngine};
pub use io::write_balances_csv;
pub use strategy::{create_ledger, create_ledger_with_storage};
pub use types::{Account, LedgerError, Operation, StoreError};
