//! Ledger operations as they appear in a replay script

use super::account::{AccountId, Amount};

/// Kinds of operation a ledger accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Open an account with a zero balance
    Create,
    /// Credit an existing account
    Deposit,
    /// Move funds between two existing accounts
    Transfer,
}

/// A single ledger operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Open `account` with a zero balance
    Create { account: AccountId },

    /// Add `amount` to `account`
    Deposit { account: AccountId, amount: Amount },

    /// Move `amount` from `from` to `to`
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
}

impl Operation {
    /// The kind of this operation
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Create { .. } => OperationKind::Create,
            Operation::Deposit { .. } => OperationKind::Deposit,
            Operation::Transfer { .. } => OperationKind::Transfer,
        }
    }
}
