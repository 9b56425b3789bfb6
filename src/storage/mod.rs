//! Storage collaborator
//!
//! The store-backed ledgers talk to persistence only through the two traits
//! in this module. A [`Storage`] hands out [`Transaction`] handles; a handle
//! is bound to its scope and finishes by `commit`, `rollback`, or by being
//! dropped (which rolls back).
//!
//! Statements map one-to-one onto the SQL the ledgers would issue:
//!
//! | Call | Statement |
//! |---|---|
//! | `select(id, ReadMode::Plain)` | `SELECT balance, version FROM accounts WHERE id = ?` |
//! | `select(id, ReadMode::ForUpdate)` | `... FOR UPDATE` |
//! | `update(id, Assignment::Set(b), Guard::Version(v))` | `UPDATE accounts SET balance = ?, version = version + 1 WHERE id = ? AND version = ?` |
//! | `update(id, Assignment::Add(d), Guard::None)` | `UPDATE accounts SET balance = balance + ?, version = version + 1 WHERE id = ?` |
//! | `insert(id)` | `INSERT INTO accounts (id, balance, version) VALUES (?, 0, 0)` |
//!
//! [`MemoryTable`] is the in-process implementation shipped with the crate.

pub mod table;

pub use table::MemoryTable;

use crate::types::{Amount, StoreError};

/// Name of the single table holding the ledger
pub const ACCOUNTS_TABLE: &str = "accounts";

/// Name of the `balance >= 0` check constraint
pub const NON_NEGATIVE_CONSTRAINT: &str = "accounts_balance_non_negative";

/// Transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IsolationLevel {
    /// Every statement sees the latest committed data
    ReadCommitted,
    /// Statements see the snapshot taken when the transaction began;
    /// touching a row changed since then fails with a serialization error
    RepeatableRead,
    /// Repeatable read plus commit-time validation of everything read
    Serializable,
}

/// How a `select` treats the row it reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// No lock taken
    Plain,
    /// Take the row's exclusive lock and hold it until the transaction ends
    ForUpdate,
}

/// Right-hand side of `SET balance = ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// `balance = value`
    Set(Amount),
    /// `balance = balance + delta`
    Add(Amount),
}

/// Extra `WHERE` predicate on an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Match on id only
    None,
    /// `AND version = ?`
    Version(u64),
    /// `AND balance = ?`
    Balance(Amount),
}

/// One row of the accounts table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub balance: Amount,
    pub version: u64,
}

/// A source of transactions over the accounts table
pub trait Storage: Send + Sync {
    /// Create the accounts table if it does not exist
    fn provision(&self) -> Result<(), StoreError>;

    /// Drop the accounts table and everything in it
    fn teardown(&self) -> Result<(), StoreError>;

    /// Open a transaction at the given isolation level
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingTable`] if the table is not provisioned.
    fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn Transaction + '_>, StoreError>;
}

/// A scope-bound unit of work
///
/// Dropping an unfinished transaction rolls it back and releases its locks.
pub trait Transaction {
    /// Read one row, `None` if it does not exist
    fn select(&mut self, id: &str, mode: ReadMode) -> Result<Option<Row>, StoreError>;

    /// Read every row, ordered by id
    fn scan(&mut self) -> Result<Vec<Row>, StoreError>;

    /// Insert a row with zero balance and version
    ///
    /// # Errors
    ///
    /// [`StoreError::UniqueViolation`] when the id exists, either on insert or
    /// when a concurrent insert of the same id commits first.
    fn insert(&mut self, id: &str) -> Result<(), StoreError>;

    /// Update one row, returning the number of rows affected (0 or 1)
    ///
    /// Takes the row's exclusive lock. A guard that does not match the
    /// current row affects 0 rows; it is not an error.
    ///
    /// # Errors
    ///
    /// - [`StoreError::CheckViolation`] if the new balance is negative
    /// - [`StoreError::OutOfRange`] if `Assignment::Add` overflows
    /// - [`StoreError::SerializationFailure`] under snapshot isolation when the
    ///   row changed after the snapshot was taken
    fn update(&mut self, id: &str, assignment: Assignment, guard: Guard)
        -> Result<u64, StoreError>;

    /// Make every change visible atomically and release locks
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every change and release locks
    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
