//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account snapshots and identifiers
//! - `operation`: Ledger operations as replayed from a script
//! - `error`: Error types for the ledger and its storage

pub mod account;
pub mod error;
pub mod operation;

pub use account::{Account, AccountId, Amount};
pub use error::{Disposition, LedgerError, StoreError};
pub use operation::{Operation, OperationKind};
