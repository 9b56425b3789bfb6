//! Concurrent execution of replayed operations
//!
//! Operations are dealt round-robin to a fixed number of worker threads.
//! Each worker runs its share in script order on the shared engine; there is
//! no ordering between workers.

use crate::core::engine::LedgerEngine;
use crate::types::{Amount, LedgerError, Operation};
use std::panic;
use std::thread;
use tracing::debug;

/// Counts of what happened to a group of operations
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Operations the ledger accepted
    pub applied: usize,
    /// Operations the ledger refused
    pub rejected: usize,
    /// Sum of accepted deposit amounts
    pub deposited: i128,
}

impl Tally {
    pub fn record(&mut self, operation: &Operation, applied: bool) {
        if !applied {
            self.rejected += 1;
            return;
        }
        self.applied += 1;
        if let Operation::Deposit { amount, .. } = operation {
            self.deposited += i128::from(*amount);
        }
    }

    pub fn merge(&mut self, other: Tally) {
        self.applied += other.applied;
        self.rejected += other.rejected;
        self.deposited += other.deposited;
    }
}

/// Run one operation against the engine
///
/// # Returns
///
/// * `Ok(true)` if the ledger accepted it, `Ok(false)` if refused
///
/// # Errors
///
/// Fatal ledger failures.
pub fn execute(engine: &LedgerEngine, operation: &Operation) -> Result<bool, LedgerError> {
    match operation {
        Operation::Create { account } => engine.create_account(account),
        Operation::Deposit { account, amount } => engine.deposit(account, *amount),
        Operation::Transfer { from, to, amount } => engine.transfer(from, to, *amount),
    }
}

/// Deal operations round-robin into `workers` shares
///
/// Every operation lands in exactly one share and shares keep script order.
/// Returns fewer shares than `workers` when there are fewer operations.
pub fn partition_round_robin(operations: Vec<Operation>, workers: usize) -> Vec<Vec<Operation>> {
    let workers = workers.max(1).min(operations.len().max(1));
    let mut shares: Vec<Vec<Operation>> = (0..workers)
        .map(|_| Vec::with_capacity(operations.len() / workers + 1))
        .collect();

    for (index, operation) in operations.into_iter().enumerate() {
        shares[index % workers].push(operation);
    }
    shares.retain(|share| !share.is_empty());
    shares
}

fn run_share(engine: &LedgerEngine, share: Vec<Operation>) -> Result<Tally, LedgerError> {
    let mut tally = Tally::default();
    for operation in &share {
        let applied = execute(engine, operation)?;
        tally.record(operation, applied);
    }
    debug!(
        operations = share.len(),
        applied = tally.applied,
        "worker finished"
    );
    Ok(tally)
}

/// Run `operations` on `workers` threads and total the results
///
/// # Errors
///
/// The first fatal error any worker hit. Workers that did not fail still run
/// their whole share.
pub fn run_concurrently(
    engine: &LedgerEngine,
    operations: Vec<Operation>,
    workers: usize,
) -> Result<Tally, LedgerError> {
    let shares = partition_round_robin(operations, workers);

    thread::scope(|scope| {
        let handles: Vec<_> = shares
            .into_iter()
            .map(|share| scope.spawn(move || run_share(engine, share)))
            .collect();

        let mut total = Tally::default();
        let mut first_error = None;
        for handle in handles {
            match handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)) {
                Ok(tally) => total.merge(tally),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(total),
        }
    })
}

/// Total of `balances`, widened so it cannot overflow
pub fn balances_total<'a>(balances: impl IntoIterator<Item = &'a Amount>) -> i128 {
    balances.into_iter().map(|b| i128::from(*b)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StrategyType;
    use rstest::rstest;

    fn deposit(account: &str, amount: Amount) -> Operation {
        Operation::Deposit {
            account: account.to_string(),
            amount,
        }
    }

    #[rstest]
    #[case::even(6, 3, vec![2, 2, 2])]
    #[case::uneven(7, 3, vec![3, 2, 2])]
    #[case::fewer_ops_than_workers(2, 8, vec![1, 1])]
    #[case::zero_workers(3, 0, vec![3])]
    #[case::empty(0, 4, vec![])]
    fn test_partition_round_robin(
        #[case] count: usize,
        #[case] workers: usize,
        #[case] expected_sizes: Vec<usize>,
    ) {
        let operations: Vec<_> = (0..count).map(|i| deposit("a", i as Amount + 1)).collect();
        let shares = partition_round_robin(operations, workers);

        let sizes: Vec<usize> = shares.iter().map(Vec::len).collect();
        assert_eq!(sizes, expected_sizes);

        // Script order is kept within a share
        for share in &shares {
            let amounts: Vec<Amount> = share
                .iter()
                .map(|op| match op {
                    Operation::Deposit { amount, .. } => *amount,
                    _ => unreachable!(),
                })
                .collect();
            assert!(amounts.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_tally_counts_only_accepted_deposits() {
        let mut tally = Tally::default();
        tally.record(&deposit("a", 5), true);
        tally.record(&deposit("a", 7), false);
        tally.record(
            &Operation::Transfer {
                from: "a".into(),
                to: "b".into(),
                amount: 2,
            },
            true,
        );

        assert_eq!(
            tally,
            Tally {
                applied: 2,
                rejected: 1,
                deposited: 5
            }
        );
    }

    #[test]
    fn test_run_concurrently_totals_workers() {
        let engine = LedgerEngine::new(StrategyType::Mutex);
        engine.start().unwrap();
        engine.create_account("a").unwrap();

        let mut operations: Vec<_> = (0..100).map(|_| deposit("a", 1)).collect();
        operations.push(deposit("missing", 1));

        let tally = run_concurrently(&engine, operations, 4).unwrap();
        assert_eq!(tally.applied, 100);
        assert_eq!(tally.rejected, 1);
        assert_eq!(tally.deposited, 100);
        assert_eq!(engine.get_balance("a"), Ok(Some(100)));
    }

    #[test]
    fn test_balances_total_widens() {
        assert_eq!(
            balances_total(&[i64::MAX, i64::MAX]),
            2 * i128::from(i64::MAX)
        );
    }
}
