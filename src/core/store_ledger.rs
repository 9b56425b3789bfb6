//! Store-backed ledger
//!
//! One kernel serves all six store-backed strategies. Each operation is a
//! single transaction run through the [`TransactionCoordinator`]; the
//! [`Discipline`] decides the isolation level, whether rows are read with
//! `FOR UPDATE`, how the new balance is written and whether conflicts are
//! retried.
//!
//! Two-account operations touch rows in [`LockOrder`], both for the reads and
//! for the writes, so row locks are always acquired in the same global order.

use crate::cli::StrategyType;
use crate::core::coordinator::{ConflictPolicy, TransactionCoordinator};
use crate::core::ordering::LockOrder;
use crate::core::traits::Ledger;
use crate::core::validator::InputValidator;
use crate::storage::{Assignment, Guard, IsolationLevel, ReadMode, Row, Storage, Transaction};
use crate::strategy::{Discipline, GuardKind, WriteMode};
use crate::types::{Account, Amount, LedgerError};
use std::sync::Arc;
use tracing::info;

/// Ledger whose balances live in a [`Storage`]
pub struct StoreLedger {
    strategy: StrategyType,
    discipline: Discipline,
    /// Runs deposits and transfers under the discipline
    writer: TransactionCoordinator,
    /// Runs creation and lookups at read committed, never retrying
    reader: TransactionCoordinator,
}

impl StoreLedger {
    pub fn new(strategy: StrategyType, discipline: Discipline, storage: Arc<dyn Storage>) -> Self {
        let writer = TransactionCoordinator::new(
            Arc::clone(&storage),
            discipline.isolation,
            discipline.conflict,
        );
        let reader = TransactionCoordinator::new(
            storage,
            IsolationLevel::ReadCommitted,
            ConflictPolicy::FailFast,
        );
        Self {
            strategy,
            discipline,
            writer,
            reader,
        }
    }

    fn read_row(&self, tx: &mut dyn Transaction, id: &str) -> Result<Row, LedgerError> {
        tx.select(id, self.discipline.read)?
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Write `balance` over `row`, treating a guard miss as a lost race
    fn overwrite(
        tx: &mut dyn Transaction,
        row: &Row,
        balance: Amount,
        guard: GuardKind,
    ) -> Result<(), LedgerError> {
        match tx.update(&row.id, Assignment::Set(balance), guard.guard_for(row))? {
            0 => Err(LedgerError::version_conflict(&row.id)),
            _ => Ok(()),
        }
    }

    fn apply_delta(tx: &mut dyn Transaction, id: &str, delta: Amount) -> Result<(), LedgerError> {
        match tx.update(id, Assignment::Add(delta), Guard::None)? {
            0 => Err(LedgerError::account_not_found(id)),
            _ => Ok(()),
        }
    }

    /// A transfer onto itself moves nothing; it succeeds iff funds suffice
    fn confirm_funds(&self, id: &str, amount: Amount) -> Result<(), LedgerError> {
        self.writer.execute("transfer", |tx| {
            let row = self.read_row(tx, id)?;
            if row.balance < amount {
                return Err(LedgerError::insufficient_funds(id, row.balance, amount));
            }
            Ok(())
        })
    }

    fn transfer_overwrite(
        &self,
        tx: &mut dyn Transaction,
        from: &str,
        to: &str,
        amount: Amount,
        guard: GuardKind,
    ) -> Result<(), LedgerError> {
        let order = LockOrder::of(from, to);
        let [first_id, second_id] = order.arrange(from, to);
        let first = self.read_row(tx, first_id)?;
        let second = self.read_row(tx, second_id)?;
        let (source, target) = order.restore([first, second]);

        if source.balance < amount {
            return Err(LedgerError::insufficient_funds(
                from,
                source.balance,
                amount,
            ));
        }
        let credited = target
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::overflow(to))?;
        let debited = source.balance - amount;

        for (row, balance) in order.arrange((&source, debited), (&target, credited)) {
            Self::overwrite(tx, row, balance, guard)?;
        }
        Ok(())
    }
}

impl Ledger for StoreLedger {
    fn strategy(&self) -> StrategyType {
        self.strategy
    }

    fn start(&self) -> Result<(), LedgerError> {
        self.writer.storage().provision()?;
        info!(
            strategy = %self.strategy,
            isolation = ?self.discipline.isolation,
            "store-backed ledger ready"
        );
        Ok(())
    }

    fn shutdown(&self) -> Result<(), LedgerError> {
        self.writer.storage().teardown()?;
        info!(strategy = %self.strategy, "store-backed ledger torn down");
        Ok(())
    }

    fn create_account(&self, id: &str) -> Result<(), LedgerError> {
        InputValidator::check_account_id(id)?;
        self.reader
            .execute("create_account", |tx| Ok(tx.insert(id)?))
    }

    fn deposit(&self, account: &str, amount: Amount) -> Result<(), LedgerError> {
        InputValidator::check_account_id(account)?;
        InputValidator::check_amount(amount)?;

        self.writer
            .execute("deposit", |tx| match self.discipline.write {
                WriteMode::Delta => Self::apply_delta(tx, account, amount),
                WriteMode::Overwrite(guard) => {
                    let row = self.read_row(tx, account)?;
                    let credited = row
                        .balance
                        .checked_add(amount)
                        .ok_or_else(|| LedgerError::overflow(account))?;
                    Self::overwrite(tx, &row, credited, guard)
                }
            })
    }

    fn transfer(&self, from: &str, to: &str, amount: Amount) -> Result<(), LedgerError> {
        InputValidator::check_transfer(from, to, amount)?;
        if from == to {
            return self.confirm_funds(from, amount);
        }

        self.writer
            .execute("transfer", |tx| match self.discipline.write {
                WriteMode::Delta => {
                    let order = LockOrder::of(from, to);
                    for (id, delta) in order.arrange((from, -amount), (to, amount)) {
                        Self::apply_delta(tx, id, delta)?;
                    }
                    Ok(())
                }
                WriteMode::Overwrite(guard) => self.transfer_overwrite(tx, from, to, amount, guard),
            })
    }

    fn balance(&self, id: &str) -> Result<Option<Amount>, LedgerError> {
        InputValidator::check_account_id(id)?;
        self.reader.execute("balance", |tx| {
            Ok(tx.select(id, ReadMode::Plain)?.map(|row| row.balance))
        })
    }

    fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.reader.execute("accounts", |tx| {
            Ok(tx
                .scan()?
                .into_iter()
                .map(|row| Account {
                    id: row.id,
                    balance: row.balance,
                    version: Some(row.version),
                })
                .collect())
        })
    }
}
