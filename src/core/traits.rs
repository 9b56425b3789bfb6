//! Core traits for ledgers and their balance cells
//!
//! [`Ledger`] is the seam every concurrency strategy implements; the engine
//! facade and the replay pipeline only ever see `dyn Ledger`. [`BalanceCell`]
//! is the smaller seam inside the in-memory ledger that separates account
//! bookkeeping from the synchronisation discipline guarding one balance.

use crate::core::ordering::LockOrder;
use crate::strategy::StrategyType;
use crate::types::{Account, Amount, LedgerError};

/// Trait for a ledger running one concurrency strategy
///
/// Every operation validates its input first and reports rejections through
/// the typed error. Implementations are shared across threads.
pub trait Ledger: Send + Sync {
    /// The strategy this ledger runs
    fn strategy(&self) -> StrategyType;

    /// Prepare backing storage; calling it twice is harmless
    fn start(&self) -> Result<(), LedgerError>;

    /// Tear down backing storage, discarding every account
    fn shutdown(&self) -> Result<(), LedgerError>;

    /// Open an account with a zero balance
    fn create_account(&self, id: &str) -> Result<(), LedgerError>;

    /// Credit `amount` to `account`
    fn deposit(&self, account: &str, amount: Amount) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`
    fn transfer(&self, from: &str, to: &str, amount: Amount) -> Result<(), LedgerError>;

    /// Current balance, `None` if the account does not exist
    fn balance(&self, id: &str) -> Result<Option<Amount>, LedgerError>;

    /// Every account, sorted by id
    fn accounts(&self) -> Result<Vec<Account>, LedgerError>;
}

/// Why a cell refused an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRejection {
    /// The source balance observed was smaller than the amount
    Insufficient { balance: Amount },
    /// Crediting the target would overflow
    Overflow,
}

/// One account's balance under a synchronisation discipline
pub trait BalanceCell: Default + Send + Sync {
    /// Current balance
    fn load(&self) -> Amount;

    /// Add `amount` atomically
    fn credit(&self, amount: Amount) -> Result<(), CellRejection>;

    /// Move `amount` from `from` to `to`
    ///
    /// `from` and `to` must be distinct cells. `order` tells cells that lock
    /// which of the two to take first.
    ///
    /// A rejected transfer leaves both balances as they were. Callers keep
    /// the sum of all balances within `i64`, so undoing a partial transfer
    /// always has room.
    fn transfer(
        from: &Self,
        to: &Self,
        order: LockOrder,
        amount: Amount,
    ) -> Result<(), CellRejection>;
}
