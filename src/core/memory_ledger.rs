//! In-memory ledger
//!
//! Accounts live in a `DashMap` from id to a shared [`BalanceCell`]. The map
//! only answers "which cell belongs to this id"; balances are guarded by the
//! cell itself. Cells are cloned out of the map before any balance work so
//! no shard lock is held while a cell blocks or spins.
//!
//! The cell type picks the discipline:
//!
//! - `MemoryLedger<GuardedCell>`: the `mutex` strategy
//! - `MemoryLedger<AtomicCell>`: the `cas` strategy
//!
//! With `AtomicCell` the two legs of a transfer are separate atomic steps, so
//! a concurrent reader can observe the debit before the credit. Each balance
//! is still linearizable and money is never counted twice.
//!
//! Deposits are bounded by the ledger-wide total: the sum of every balance
//! never exceeds `i64::MAX`. Any single balance plus any amount in flight
//! therefore fits, so no credit or refund inside a transfer can overflow.

use crate::core::cell::{AtomicCell, GuardedCell};
use crate::core::ordering::LockOrder;
use crate::core::traits::{BalanceCell, CellRejection, Ledger};
use crate::core::validator::InputValidator;
use crate::strategy::StrategyType;
use crate::types::{Account, Amount, LedgerError};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Ledger keeping balances in process memory
#[derive(Debug)]
pub struct MemoryLedger<C> {
    strategy: StrategyType,
    accounts: DashMap<String, Arc<C>>,
    /// Sum of accepted deposits; reserved before the cell is credited
    total: AtomicI64,
}

/// Per-account monitors taken in lock order
pub type MutexLedger = MemoryLedger<GuardedCell>;

/// Lock-free compare-and-swap balances
pub type CasLedger = MemoryLedger<AtomicCell>;

impl MutexLedger {
    pub fn new() -> Self {
        Self::with_strategy(StrategyType::Mutex)
    }
}

impl Default for MutexLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CasLedger {
    pub fn new() -> Self {
        Self::with_strategy(StrategyType::Cas)
    }
}

impl Default for CasLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: BalanceCell> MemoryLedger<C> {
    fn with_strategy(strategy: StrategyType) -> Self {
        Self {
            strategy,
            accounts: DashMap::new(),
            total: AtomicI64::new(0),
        }
    }

    fn cell(&self, id: &str) -> Result<Arc<C>, LedgerError> {
        self.accounts
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::account_not_found(id))
    }
}

impl<C: BalanceCell + 'static> Ledger for MemoryLedger<C> {
    fn strategy(&self) -> StrategyType {
        self.strategy
    }

    fn start(&self) -> Result<(), LedgerError> {
        info!(strategy = %self.strategy, "in-memory ledger ready");
        Ok(())
    }

    fn shutdown(&self) -> Result<(), LedgerError> {
        let discarded = self.accounts.len();
        self.accounts.clear();
        self.total.store(0, Ordering::SeqCst);
        info!(strategy = %self.strategy, discarded, "in-memory ledger reset");
        Ok(())
    }

    fn create_account(&self, id: &str) -> Result<(), LedgerError> {
        InputValidator::check_account_id(id)?;

        // The entry holds the shard lock, so exactly one racing creator runs the closure
        let mut created = false;
        self.accounts.entry(id.to_string()).or_insert_with(|| {
            created = true;
            Arc::new(C::default())
        });

        if created {
            Ok(())
        } else {
            Err(LedgerError::account_exists(id))
        }
    }

    fn deposit(&self, account: &str, amount: Amount) -> Result<(), LedgerError> {
        InputValidator::check_account_id(account)?;
        InputValidator::check_amount(amount)?;

        let cell = self.cell(account)?;
        self.total
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |total| {
                total.checked_add(amount)
            })
            .map_err(|_| LedgerError::overflow(account))?;

        cell.credit(amount).map_err(|_| {
            self.total.fetch_sub(amount, Ordering::SeqCst);
            LedgerError::overflow(account)
        })
    }

    fn transfer(&self, from: &str, to: &str, amount: Amount) -> Result<(), LedgerError> {
        InputValidator::check_transfer(from, to, amount)?;

        let source = self.cell(from)?;
        if from == to {
            let balance = source.load();
            return if balance >= amount {
                Ok(())
            } else {
                Err(LedgerError::insufficient_funds(from, balance, amount))
            };
        }
        let target = self.cell(to)?;

        C::transfer(&source, &target, LockOrder::of(from, to), amount).map_err(|rejection| {
            match rejection {
                CellRejection::Insufficient { balance } => {
                    LedgerError::insufficient_funds(from, balance, amount)
                }
                CellRejection::Overflow => LedgerError::overflow(to),
            }
        })
    }

    fn balance(&self, id: &str) -> Result<Option<Amount>, LedgerError> {
        InputValidator::check_account_id(id)?;
        Ok(self.accounts.get(id).map(|entry| entry.value().load()))
    }

    fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| Account {
                id: entry.key().clone(),
                balance: entry.value().load(),
                version: None,
            })
            .collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }
}
