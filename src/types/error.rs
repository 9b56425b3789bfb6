//! Error types for the ledger engine
//!
//! Two layers of errors exist:
//!
//! - [`StoreError`]: failures reported by the storage collaborator (constraint
//!   violations, serialization conflicts, missing schema).
//! - [`LedgerError`]: everything a ledger operation can fail with. Storage
//!   errors that carry domain meaning (check constraint, unique key, numeric
//!   range) are reclassified on conversion; the rest are wrapped.
//!
//! # Dispositions
//!
//! Every [`LedgerError`] maps to a [`Disposition`] that tells the caller what
//! to do with it:
//!
//! - **Retry**: a concurrent writer got there first; rerun the whole operation
//! - **Reject**: the operation is refused; the facade reports `false`
//! - **Fatal**: the storage collaborator failed; propagate to the caller

use thiserror::Error;

/// Failure reported by a [`Storage`](crate::storage::Storage) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A concurrent transaction committed a change this transaction depends on
    ///
    /// Raised under repeatable read and serializable isolation. Retryable.
    #[error("could not serialize access to account '{account}' due to concurrent update")]
    SerializationFailure {
        /// Row whose snapshot went stale
        account: String,
    },

    /// An update would break a table check constraint
    #[error("new balance for account '{account}' violates check constraint \"{constraint}\"")]
    CheckViolation {
        /// Row being updated
        account: String,
        /// Name of the violated constraint
        constraint: &'static str,
    },

    /// An insert collided with an existing primary key
    #[error("duplicate key value violates unique constraint: account '{account}' already exists")]
    UniqueViolation {
        /// The duplicated key
        account: String,
    },

    /// Arithmetic on a column left the representable range
    #[error("bigint out of range for account '{account}'")]
    OutOfRange {
        /// Row being updated
        account: String,
    },

    /// The table has not been provisioned, or has been torn down
    #[error("relation \"{table}\" does not exist")]
    MissingTable {
        /// Table name
        table: &'static str,
    },
}

/// Main error type for ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Account id is blank or too long
    #[error("Invalid account id '{id}': {reason}")]
    InvalidAccountId {
        /// The rejected id (possibly truncated in logs by the subscriber)
        id: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Amount is zero or negative
    #[error("Invalid amount {amount}: amounts must be strictly positive")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// Referenced account does not exist
    #[error("Account '{account}' not found")]
    AccountNotFound {
        /// Missing account id
        account: String,
    },

    /// Account id is already taken
    #[error("Account '{account}' already exists")]
    AccountExists {
        /// Duplicated account id
        account: String,
    },

    /// Source account cannot cover the transfer
    #[error("Insufficient funds in account '{account}': balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Source account
        account: String,
        /// Balance observed at the check point
        balance: i64,
        /// Requested amount
        requested: i64,
    },

    /// Crediting the account would overflow a 64-bit balance
    #[error("Arithmetic overflow crediting account '{account}'")]
    Overflow {
        /// Account being credited
        account: String,
    },

    /// The store refused the update because a balance would go negative
    #[error("Integrity violation on account '{account}': balance must stay non-negative")]
    IntegrityViolation {
        /// Account whose constraint failed
        account: String,
    },

    /// A conditional update matched no row because another writer won
    ///
    /// Only observed by callers of strategies that do not retry.
    #[error("Concurrent update detected on account '{account}'")]
    VersionConflict {
        /// Account whose guard no longer matched
        account: String,
    },

    /// Unclassified storage failure
    #[error("Storage failure: {0}")]
    Storage(StoreError),
}

/// What to do with a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Roll back and run the whole operation again
    Retry,
    /// Roll back and report the operation as refused
    Reject,
    /// Roll back and propagate
    Fatal,
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::CheckViolation { account, .. } => LedgerError::IntegrityViolation { account },
            StoreError::UniqueViolation { account } => LedgerError::AccountExists { account },
            StoreError::OutOfRange { account } => LedgerError::Overflow { account },
            other => LedgerError::Storage(other),
        }
    }
}

impl LedgerError {
    /// Classify this error for the transaction coordinator and the facade
    pub fn disposition(&self) -> Disposition {
        match self {
            LedgerError::VersionConflict { .. }
            | LedgerError::Storage(StoreError::SerializationFailure { .. }) => Disposition::Retry,
            LedgerError::Storage(_) => Disposition::Fatal,
            _ => Disposition::Reject,
        }
    }

    /// True when the error must propagate instead of becoming `false`
    pub fn is_fatal(&self) -> bool {
        self.disposition() == Disposition::Fatal
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidAccountId error
    pub fn invalid_account_id(id: &str, reason: &'static str) -> Self {
        LedgerError::InvalidAccountId {
            id: id.to_string(),
            reason,
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: &str) -> Self {
        LedgerError::AccountNotFound {
            account: account.to_string(),
        }
    }

    /// Create an AccountExists error
    pub fn account_exists(account: &str) -> Self {
        LedgerError::AccountExists {
            account: account.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: &str, balance: i64, requested: i64) -> Self {
        LedgerError::InsufficientFunds {
            account: account.to_string(),
            balance,
            requested,
        }
    }

    /// Create an Overflow error
    pub fn overflow(account: &str) -> Self {
        LedgerError::Overflow {
            account: account.to_string(),
        }
    }

    /// Create a VersionConflict error
    pub fn version_conflict(account: &str) -> Self {
        LedgerError::VersionConflict {
            account: account.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid_id(
        LedgerError::invalid_account_id(" ", "blank"),
        "Invalid account id ' ': blank"
    )]
    #[case::invalid_amount(
        LedgerError::InvalidAmount { amount: -5 },
        "Invalid amount -5: amounts must be strictly positive"
    )]
    #[case::not_found(LedgerError::account_not_found("left"), "Account 'left' not found")]
    #[case::insufficient(
        LedgerError::insufficient_funds("left", 3, 10),
        "Insufficient funds in account 'left': balance 3, requested 10"
    )]
    #[case::storage(
        LedgerError::Storage(StoreError::MissingTable { table: "accounts" }),
        "Storage failure: relation \"accounts\" does not exist"
    )]
    fn test_error_display(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::check(
        StoreError::CheckViolation { account: "a".into(), constraint: "balance_non_negative" },
        LedgerError::IntegrityViolation { account: "a".into() }
    )]
    #[case::unique(
        StoreError::UniqueViolation { account: "a".into() },
        LedgerError::AccountExists { account: "a".into() }
    )]
    #[case::range(
        StoreError::OutOfRange { account: "a".into() },
        LedgerError::Overflow { account: "a".into() }
    )]
    #[case::serialization(
        StoreError::SerializationFailure { account: "a".into() },
        LedgerError::Storage(StoreError::SerializationFailure { account: "a".into() })
    )]
    fn test_store_error_conversion(#[case] source: StoreError, #[case] expected: LedgerError) {
        assert_eq!(LedgerError::from(source), expected);
    }

    #[rstest]
    #[case::version_conflict(LedgerError::version_conflict("a"), Disposition::Retry)]
    #[case::serialization(
        StoreError::SerializationFailure { account: "a".into() }.into(),
        Disposition::Retry
    )]
    #[case::insufficient(LedgerError::insufficient_funds("a", 0, 1), Disposition::Reject)]
    #[case::integrity(
        StoreError::CheckViolation { account: "a".into(), constraint: "c" }.into(),
        Disposition::Reject
    )]
    #[case::missing_table(
        StoreError::MissingTable { table: "accounts" }.into(),
        Disposition::Fatal
    )]
    fn test_disposition(#[case] error: LedgerError, #[case] expected: Disposition) {
        assert_eq!(error.disposition(), expected);
        assert_eq!(error.is_fatal(), expected == Disposition::Fatal);
    }
}
