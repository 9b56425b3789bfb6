//! Ledger engine facade
//!
//! `LedgerEngine` wraps one [`Ledger`] and exposes the boolean surface:
//! every refused operation becomes `Ok(false)` (or `Ok(None)` for lookups)
//! and is logged at debug level with its reason. Only failures the ledger
//! cannot classify as a refusal come back as `Err`.

use crate::cli::StrategyType;
use crate::core::traits::Ledger;
use crate::storage::Storage;
use crate::strategy::{create_ledger, create_ledger_with_storage};
use crate::types::{Account, Amount, LedgerError};
use std::sync::Arc;
use tracing::debug;

/// Boolean-result front end over a ledger
pub struct LedgerEngine {
    ledger: Box<dyn Ledger>,
}

impl LedgerEngine {
    /// Create an engine running `strategy`
    ///
    /// Store-backed strategies get a private in-process table.
    pub fn new(strategy: StrategyType) -> Self {
        Self::from_ledger(create_ledger(strategy))
    }

    /// Create an engine running `strategy` over the given storage
    pub fn with_storage(strategy: StrategyType, storage: Arc<dyn Storage>) -> Self {
        Self::from_ledger(create_ledger_with_storage(strategy, storage))
    }

    pub fn from_ledger(ledger: Box<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub fn strategy(&self) -> StrategyType {
        self.ledger.strategy()
    }

    /// Provision backing storage; idempotent
    pub fn start(&self) -> Result<(), LedgerError> {
        self.ledger.start()
    }

    /// Tear down backing storage
    pub fn shutdown(&self) -> Result<(), LedgerError> {
        self.ledger.shutdown()
    }

    /// Open an account with a zero balance
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the account was created
    /// * `Ok(false)` if the id is invalid or already taken
    ///
    /// # Errors
    ///
    /// Fatal storage failures.
    pub fn create_account(&self, id: &str) -> Result<bool, LedgerError> {
        Self::settle("create_account", self.ledger.create_account(id))
    }

    /// Credit `amount` to `account`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the balance grew by exactly `amount`
    /// * `Ok(false)` if the input is invalid, the account is missing, or the
    ///   balance would overflow
    ///
    /// # Errors
    ///
    /// Fatal storage failures.
    pub fn deposit(&self, account: &str, amount: Amount) -> Result<bool, LedgerError> {
        Self::settle("deposit", self.ledger.deposit(account, amount))
    }

    /// Move `amount` from `from` to `to`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if `from` lost and `to` gained exactly `amount`
    /// * `Ok(false)` if the input is invalid, either account is missing, or
    ///   `from` could not cover the amount
    ///
    /// # Errors
    ///
    /// Fatal storage failures.
    pub fn transfer(&self, from: &str, to: &str, amount: Amount) -> Result<bool, LedgerError> {
        Self::settle("transfer", self.ledger.transfer(from, to, amount))
    }

    /// Current balance, `None` for invalid or unknown ids
    pub fn get_balance(&self, id: &str) -> Result<Option<Amount>, LedgerError> {
        match self.ledger.balance(id) {
            Ok(balance) => Ok(balance),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                debug!(operation = "get_balance", reason = %err, "lookup refused");
                Ok(None)
            }
        }
    }

    /// Every account, sorted by id
    pub fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.ledger.accounts()
    }

    fn settle(operation: &'static str, result: Result<(), LedgerError>) -> Result<bool, LedgerError> {
        match result {
            Ok(()) => Ok(true),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                debug!(operation, reason = %err, "operation rejected");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_rejections_become_false(
        #[values(StrategyType::RowLock, StrategyType::Delta, StrategyType::Cas)]
        strategy: StrategyType,
    ) {
        let engine = LedgerEngine::new(strategy);
        engine.start().unwrap();

        assert_eq!(engine.create_account("a"), Ok(true));
        assert_eq!(engine.create_account("a"), Ok(false));
        assert_eq!(engine.deposit("a", 0), Ok(false));
        assert_eq!(engine.transfer("a", "missing", 1), Ok(false));
        assert_eq!(engine.get_balance(""), Ok(None));
        assert_eq!(engine.get_balance("a"), Ok(Some(0)));
    }

    #[test]
    fn test_fatal_errors_propagate() {
        // Never started: the table does not exist
        let engine = LedgerEngine::new(StrategyType::VersionCheck);
        assert!(engine.deposit("a", 1).is_err());
        assert!(engine.get_balance("a").is_err());
    }
}
