//! Transaction boundaries and the shared conflict-retry loop
//!
//! Store-backed ledgers describe one attempt of an operation as a closure over
//! a [`Transaction`]. The coordinator opens the transaction, runs the closure,
//! commits or rolls back, and turns the result into an [`Outcome`]. Whether a
//! conflict is retried depends only on the [`ConflictPolicy`]; the retry loop
//! is the same for every strategy.

use crate::storage::{IsolationLevel, Storage, Transaction};
use crate::types::{Disposition, LedgerError};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, trace};

/// What to do when an attempt loses to a concurrent writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Roll back and rerun the operation, with no upper bound
    Retry,
    /// Roll back and report the conflict to the caller
    FailFast,
}

/// Result of one attempt, after commit or rollback
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    RetryableConflict(LedgerError),
    Rejected(LedgerError),
    Fatal(LedgerError),
}

impl<T> From<Result<T, LedgerError>> for Outcome<T> {
    fn from(result: Result<T, LedgerError>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => match err.disposition() {
                Disposition::Retry => Outcome::RetryableConflict(err),
                Disposition::Reject => Outcome::Rejected(err),
                Disposition::Fatal => Outcome::Fatal(err),
            },
        }
    }
}

/// Runs operations inside transactions of one isolation level
#[derive(Clone)]
pub struct TransactionCoordinator {
    storage: Arc<dyn Storage>,
    isolation: IsolationLevel,
    policy: ConflictPolicy,
}

impl TransactionCoordinator {
    pub fn new(storage: Arc<dyn Storage>, isolation: IsolationLevel, policy: ConflictPolicy) -> Self {
        Self {
            storage,
            isolation,
            policy,
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Run `work` until it commits, is rejected, or fails
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in log events
    /// * `work` - One attempt of the operation; called again after every
    ///   retryable conflict when the policy is [`ConflictPolicy::Retry`]
    ///
    /// # Errors
    ///
    /// The rejection or fatal error of the last attempt. Under
    /// [`ConflictPolicy::FailFast`] a conflict is returned as is.
    pub fn execute<T, F>(&self, operation: &'static str, mut work: F) -> Result<T, LedgerError>
    where
        F: FnMut(&mut dyn Transaction) -> Result<T, LedgerError>,
    {
        let mut attempt: u64 = 1;
        loop {
            match self.attempt(&mut work) {
                Outcome::Success(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "committed after retries");
                    }
                    return Ok(value);
                }
                Outcome::RetryableConflict(err) if self.policy == ConflictPolicy::Retry => {
                    trace!(operation, attempt, error = %err, "conflict, retrying");
                    attempt += 1;
                    thread::yield_now();
                }
                Outcome::RetryableConflict(err) | Outcome::Rejected(err) => return Err(err),
                Outcome::Fatal(err) => {
                    error!(operation, attempt, error = %err, "storage failure");
                    return Err(err);
                }
            }
        }
    }

    fn attempt<T, F>(&self, work: &mut F) -> Outcome<T>
    where
        F: FnMut(&mut dyn Transaction) -> Result<T, LedgerError>,
    {
        let mut tx = match self.storage.begin(self.isolation) {
            Ok(tx) => tx,
            Err(err) => return Outcome::from(Err(LedgerError::from(err))),
        };

        match work(&mut *tx) {
            Ok(value) => tx.commit().map(|()| value).map_err(LedgerError::from).into(),
            Err(err) => match tx.rollback() {
                Ok(()) => Outcome::from(Err(err)),
                Err(rollback_err) => Outcome::Fatal(rollback_err.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Assignment, Guard, MemoryTable, ReadMode, Row};
    use crate::types::StoreError;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Storage whose transactions fail to commit a fixed number of times
    struct ConflictingStorage {
        inner: MemoryTable,
        conflicts_left: AtomicU32,
    }

    struct ConflictingTransaction<'s> {
        inner: Box<dyn Transaction + 's>,
        fail: bool,
    }

    impl Storage for ConflictingStorage {
        fn provision(&self) -> Result<(), StoreError> {
            self.inner.provision()
        }

        fn teardown(&self) -> Result<(), StoreError> {
            self.inner.teardown()
        }

        fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn Transaction + '_>, StoreError> {
            let fail = self
                .conflicts_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            Ok(Box::new(ConflictingTransaction {
                inner: self.inner.begin(isolation)?,
                fail,
            }))
        }
    }

    impl Transaction for ConflictingTransaction<'_> {
        fn select(&mut self, id: &str, mode: ReadMode) -> Result<Option<Row>, StoreError> {
            self.inner.select(id, mode)
        }

        fn scan(&mut self) -> Result<Vec<Row>, StoreError> {
            self.inner.scan()
        }

        fn insert(&mut self, id: &str) -> Result<(), StoreError> {
            self.inner.insert(id)
        }

        fn update(
            &mut self,
            id: &str,
            assignment: Assignment,
            guard: Guard,
        ) -> Result<u64, StoreError> {
            self.inner.update(id, assignment, guard)
        }

        fn commit(self: Box<Self>) -> Result<(), StoreError> {
            let this = *self;
            if this.fail {
                this.inner.rollback()?;
                return Err(StoreError::SerializationFailure {
                    account: "injected".to_string(),
                });
            }
            this.inner.commit()
        }

        fn rollback(self: Box<Self>) -> Result<(), StoreError> {
            let this = *self;
            this.inner.rollback()
        }
    }

    fn storage(conflicts: u32) -> Arc<ConflictingStorage> {
        let storage = ConflictingStorage {
            inner: MemoryTable::new(),
            conflicts_left: AtomicU32::new(0),
        };
        storage.provision().unwrap();
        let mut tx = storage.begin(IsolationLevel::ReadCommitted).unwrap();
        tx.insert("a").unwrap();
        tx.commit().unwrap();
        storage.conflicts_left.store(conflicts, Ordering::SeqCst);
        Arc::new(storage)
    }

    fn deposit_one(tx: &mut dyn Transaction) -> Result<(), LedgerError> {
        tx.update("a", Assignment::Add(1), Guard::None)?;
        Ok(())
    }

    fn balance(storage: &ConflictingStorage) -> i64 {
        let mut tx = storage.inner.begin(IsolationLevel::ReadCommitted).unwrap();
        tx.select("a", ReadMode::Plain).unwrap().unwrap().balance
    }

    #[test]
    fn test_retry_policy_reruns_until_commit() {
        let storage = storage(3);
        let coordinator = TransactionCoordinator::new(
            storage.clone(),
            IsolationLevel::Serializable,
            ConflictPolicy::Retry,
        );

        let mut attempts = 0;
        let result = coordinator.execute("deposit", |tx| {
            attempts += 1;
            deposit_one(tx)
        });

        assert_eq!(result, Ok(()));
        assert_eq!(attempts, 4);
        assert_eq!(balance(&storage), 1);
    }

    #[test]
    fn test_fail_fast_surfaces_conflict() {
        let storage = storage(1);
        let coordinator = TransactionCoordinator::new(
            storage.clone(),
            IsolationLevel::ReadCommitted,
            ConflictPolicy::FailFast,
        );

        let result = coordinator.execute("deposit", deposit_one);
        assert!(matches!(
            result,
            Err(LedgerError::Storage(StoreError::SerializationFailure { .. }))
        ));
        assert_eq!(balance(&storage), 0);
    }

    #[rstest]
    #[case::retry(ConflictPolicy::Retry)]
    #[case::fail_fast(ConflictPolicy::FailFast)]
    fn test_rejection_rolls_back_without_retry(#[case] policy: ConflictPolicy) {
        let storage = storage(0);
        let coordinator =
            TransactionCoordinator::new(storage.clone(), IsolationLevel::ReadCommitted, policy);

        let mut attempts = 0;
        let result: Result<(), LedgerError> = coordinator.execute("transfer", |tx| {
            attempts += 1;
            tx.update("a", Assignment::Add(5), Guard::None)?;
            Err(LedgerError::insufficient_funds("a", 0, 5))
        });

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(attempts, 1);
        assert_eq!(balance(&storage), 0);
    }

    #[test]
    fn test_missing_table_is_fatal() {
        let coordinator = TransactionCoordinator::new(
            Arc::new(MemoryTable::new()),
            IsolationLevel::ReadCommitted,
            ConflictPolicy::Retry,
        );

        let result = coordinator.execute("deposit", deposit_one);
        let err = result.unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_outcome_classification() {
        assert!(matches!(Outcome::from(Ok::<_, LedgerError>(1)), Outcome::Success(1)));
        assert!(matches!(
            Outcome::<()>::from(Err(LedgerError::version_conflict("a"))),
            Outcome::RetryableConflict(_)
        ));
        assert!(matches!(
            Outcome::<()>::from(Err(LedgerError::account_not_found("a"))),
            Outcome::Rejected(_)
        ));
        assert!(matches!(
            Outcome::<()>::from(Err(StoreError::MissingTable { table: "accounts" }.into())),
            Outcome::Fatal(_)
        ));
    }
}
