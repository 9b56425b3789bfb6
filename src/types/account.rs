//! Account-related types for the ledger engine

/// Account identifier
///
/// Any non-blank string of at most 256 characters.
pub type AccountId = String;

/// Monetary amount in minor units
///
/// Balances are never negative; operation amounts are strictly positive.
pub type Amount = i64;

/// Point-in-time view of one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Unique, immutable account id
    pub id: AccountId,

    /// Current balance, never negative
    pub balance: Amount,

    /// Row version for store-backed ledgers
    ///
    /// Starts at 0 and is bumped by every committed update of the row.
    /// In-memory ledgers keep no version and report `None`.
    pub version: Option<u64>,
}
