//! In-process transactional accounts table
//!
//! `MemoryTable` gives the store-backed ledgers the behaviour they rely on
//! from a relational database without running one:
//!
//! - **Row locks**: every row carries an exclusive owner. `select ... FOR
//!   UPDATE` and `update` take it and hold it until the transaction ends;
//!   waiters park on the row's condvar.
//! - **Buffered writes**: updates and inserts are private to the transaction
//!   until commit, which applies them atomically under the commit latch and
//!   stamps every touched row with a new commit sequence number.
//! - **Snapshots**: repeatable read and serializable transactions record the
//!   commit sequence at `begin`. Touching a row committed after that point
//!   fails with [`StoreError::SerializationFailure`]. No row history is kept,
//!   so a stale plain read fails instead of returning the old version.
//! - **Validation**: serializable transactions re-check every row they read
//!   at commit and fail if any of them changed.
//! - **Constraints**: primary key uniqueness and `CHECK (balance >= 0)`.

use super::{
    Assignment, Guard, IsolationLevel, ReadMode, Row, Storage, Transaction, ACCOUNTS_TABLE,
    NON_NEGATIVE_CONSTRAINT,
};
use crate::types::{Amount, StoreError};
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

type TxId = u64;

#[derive(Debug)]
struct RowState {
    balance: Amount,
    version: u64,
    committed_seq: u64,
    owner: Option<TxId>,
}

#[derive(Debug)]
struct RowSlot {
    state: Mutex<RowState>,
    released: Condvar,
}

impl RowSlot {
    fn new(committed_seq: u64) -> Self {
        RowSlot {
            state: Mutex::new(RowState {
                balance: 0,
                version: 0,
                committed_seq,
                owner: None,
            }),
            released: Condvar::new(),
        }
    }

    /// Block until the row is free or already ours, then own it
    ///
    /// Returns the state guard and whether ownership was newly taken.
    fn acquire(&self, tx: TxId) -> (MutexGuard<'_, RowState>, bool) {
        let mut state = self.state.lock();
        loop {
            match state.owner {
                Some(owner) if owner == tx => return (state, false),
                Some(_) => self.released.wait(&mut state),
                None => {
                    state.owner = Some(tx);
                    return (state, true);
                }
            }
        }
    }
}

/// In-process implementation of [`Storage`]
///
/// Starts unprovisioned; call [`Storage::provision`] before use.
#[derive(Debug, Default)]
pub struct MemoryTable {
    rows: RwLock<Option<HashMap<String, Arc<RowSlot>>>>,
    commit_seq: AtomicU64,
    commit_latch: Mutex<()>,
    next_tx: AtomicU64,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryTable {
    fn provision(&self) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        if rows.is_none() {
            *rows = Some(HashMap::new());
            debug!(table = ACCOUNTS_TABLE, "table created");
        }
        Ok(())
    }

    fn teardown(&self) -> Result<(), StoreError> {
        if self.rows.write().take().is_some() {
            debug!(table = ACCOUNTS_TABLE, "table dropped");
        }
        Ok(())
    }

    fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn Transaction + '_>, StoreError> {
        if self.rows.read().is_none() {
            return Err(StoreError::MissingTable {
                table: ACCOUNTS_TABLE,
            });
        }
        let id = self.next_tx.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = self.commit_seq.load(Ordering::SeqCst);
        trace!(tx = id, ?isolation, snapshot, "begin");

        Ok(Box::new(TableTransaction {
            table: self,
            id,
            isolation,
            snapshot,
            held: Vec::new(),
            writes: HashMap::new(),
            reads: HashMap::new(),
            inserts: BTreeSet::new(),
        }))
    }
}

#[derive(Debug)]
struct PendingWrite {
    slot: Arc<RowSlot>,
    balance: Amount,
    version: u64,
}

struct TableTransaction<'t> {
    table: &'t MemoryTable,
    id: TxId,
    isolation: IsolationLevel,
    snapshot: u64,
    held: Vec<Arc<RowSlot>>,
    writes: HashMap<String, PendingWrite>,
    /// Serializable read set: row and the commit sequence observed
    reads: HashMap<String, (Arc<RowSlot>, u64)>,
    inserts: BTreeSet<String>,
}

impl TableTransaction<'_> {
    fn slot(&self, id: &str) -> Result<Option<Arc<RowSlot>>, StoreError> {
        let rows = self.table.rows.read();
        let rows = rows.as_ref().ok_or(StoreError::MissingTable {
            table: ACCOUNTS_TABLE,
        })?;
        Ok(rows.get(id).cloned())
    }

    fn check_snapshot(&self, id: &str, committed_seq: u64) -> Result<(), StoreError> {
        if self.isolation >= IsolationLevel::RepeatableRead && committed_seq > self.snapshot {
            return Err(StoreError::SerializationFailure {
                account: id.to_string(),
            });
        }
        Ok(())
    }

    fn lock_row(&mut self, slot: &Arc<RowSlot>) -> (Amount, u64, u64) {
        let (state, newly_owned) = slot.acquire(self.id);
        let observed = (state.balance, state.version, state.committed_seq);
        drop(state);
        if newly_owned {
            self.held.push(Arc::clone(slot));
        }
        observed
    }

    fn apply(&mut self) -> Result<(), StoreError> {
        if self.writes.is_empty() && self.inserts.is_empty() && self.reads.is_empty() {
            return Ok(());
        }

        let _latch = self.table.commit_latch.lock();

        for (id, (slot, seen)) in &self.reads {
            if slot.state.lock().committed_seq != *seen {
                return Err(StoreError::SerializationFailure {
                    account: id.clone(),
                });
            }
        }

        let seq = self.table.commit_seq.load(Ordering::SeqCst) + 1;

        if !self.inserts.is_empty() {
            let mut rows = self.table.rows.write();
            let rows = rows.as_mut().ok_or(StoreError::MissingTable {
                table: ACCOUNTS_TABLE,
            })?;
            if let Some(duplicate) = self.inserts.iter().find(|id| rows.contains_key(id.as_str())) {
                return Err(StoreError::UniqueViolation {
                    account: duplicate.clone(),
                });
            }
            for id in std::mem::take(&mut self.inserts) {
                rows.insert(id, Arc::new(RowSlot::new(seq)));
            }
        }

        for (_, write) in self.writes.drain() {
            let mut state = write.slot.state.lock();
            state.balance = write.balance;
            state.version = write.version;
            state.committed_seq = seq;
        }

        self.table.commit_seq.store(seq, Ordering::SeqCst);
        trace!(tx = self.id, seq, "commit");
        Ok(())
    }

    /// Release every row lock and forget buffered work
    fn release(&mut self) {
        for slot in self.held.drain(..) {
            let mut state = slot.state.lock();
            if state.owner == Some(self.id) {
                state.owner = None;
            }
            drop(state);
            slot.released.notify_all();
        }
        self.writes.clear();
        self.reads.clear();
        self.inserts.clear();
    }
}

impl Transaction for TableTransaction<'_> {
    fn select(&mut self, id: &str, mode: ReadMode) -> Result<Option<Row>, StoreError> {
        if let Some(write) = self.writes.get(id) {
            return Ok(Some(Row {
                id: id.to_string(),
                balance: write.balance,
                version: write.version,
            }));
        }
        if self.inserts.contains(id) {
            return Ok(Some(Row {
                id: id.to_string(),
                balance: 0,
                version: 0,
            }));
        }
        let Some(slot) = self.slot(id)? else {
            return Ok(None);
        };

        let (balance, version, committed_seq) = match mode {
            ReadMode::Plain => {
                let state = slot.state.lock();
                (state.balance, state.version, state.committed_seq)
            }
            ReadMode::ForUpdate => self.lock_row(&slot),
        };
        self.check_snapshot(id, committed_seq)?;

        if self.isolation == IsolationLevel::Serializable {
            self.reads
                .entry(id.to_string())
                .or_insert((slot, committed_seq));
        }

        Ok(Some(Row {
            id: id.to_string(),
            balance,
            version,
        }))
    }

    fn scan(&mut self) -> Result<Vec<Row>, StoreError> {
        let _latch = self.table.commit_latch.lock();
        let rows = self.table.rows.read();
        let rows = rows.as_ref().ok_or(StoreError::MissingTable {
            table: ACCOUNTS_TABLE,
        })?;

        let mut listing: Vec<Row> = rows
            .iter()
            .map(|(id, slot)| match self.writes.get(id) {
                Some(write) => Row {
                    id: id.clone(),
                    balance: write.balance,
                    version: write.version,
                },
                None => {
                    let state = slot.state.lock();
                    Row {
                        id: id.clone(),
                        balance: state.balance,
                        version: state.version,
                    }
                }
            })
            .collect();
        listing.extend(self.inserts.iter().map(|id| Row {
            id: id.clone(),
            balance: 0,
            version: 0,
        }));
        listing.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listing)
    }

    fn insert(&mut self, id: &str) -> Result<(), StoreError> {
        if self.inserts.contains(id) || self.slot(id)?.is_some() {
            return Err(StoreError::UniqueViolation {
                account: id.to_string(),
            });
        }
        self.inserts.insert(id.to_string());
        Ok(())
    }

    fn update(
        &mut self,
        id: &str,
        assignment: Assignment,
        guard: Guard,
    ) -> Result<u64, StoreError> {
        let Some(slot) = self.slot(id)? else {
            return Ok(0);
        };
        let (committed_balance, committed_version, committed_seq) = self.lock_row(&slot);
        self.check_snapshot(id, committed_seq)?;

        let (balance, version) = self
            .writes
            .get(id)
            .map(|write| (write.balance, write.version))
            .unwrap_or((committed_balance, committed_version));

        let matched = match guard {
            Guard::None => true,
            Guard::Version(expected) => version == expected,
            Guard::Balance(expected) => balance == expected,
        };
        if !matched {
            return Ok(0);
        }

        let new_balance = match assignment {
            Assignment::Set(value) => value,
            Assignment::Add(delta) => {
                balance
                    .checked_add(delta)
                    .ok_or_else(|| StoreError::OutOfRange {
                        account: id.to_string(),
                    })?
            }
        };
        if new_balance < 0 {
            return Err(StoreError::CheckViolation {
                account: id.to_string(),
                constraint: NON_NEGATIVE_CONSTRAINT,
            });
        }

        self.writes.insert(
            id.to_string(),
            PendingWrite {
                slot,
                balance: new_balance,
                version: version + 1,
            },
        );
        Ok(1)
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let result = self.apply();
        self.release();
        result
    }

    fn rollback(mut self: Box<Self>) -> Result<(), StoreError> {
        trace!(tx = self.id, "rollback");
        self.release();
        Ok(())
    }
}

impl Drop for TableTransaction<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
