//! Balance cells for the in-memory ledger
//!
//! - [`GuardedCell`]: a `parking_lot` mutex per account. Transfers take both
//!   monitors in [`LockOrder`] and mutate while holding them.
//! - [`AtomicCell`]: a single `AtomicI64` per account updated by
//!   compare-and-swap loops. No locks, so the order is irrelevant.

use crate::core::ordering::LockOrder;
use crate::core::traits::{BalanceCell, CellRejection};
use crate::types::Amount;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;

/// Balance guarded by a per-account monitor
#[derive(Debug, Default)]
pub struct GuardedCell {
    balance: Mutex<Amount>,
}

impl BalanceCell for GuardedCell {
    fn load(&self) -> Amount {
        *self.balance.lock()
    }

    fn credit(&self, amount: Amount) -> Result<(), CellRejection> {
        let mut balance = self.balance.lock();
        *balance = balance
            .checked_add(amount)
            .ok_or(CellRejection::Overflow)?;
        Ok(())
    }

    fn transfer(
        from: &Self,
        to: &Self,
        order: LockOrder,
        amount: Amount,
    ) -> Result<(), CellRejection> {
        let [first, second] = order.arrange(from, to);
        let first = first.balance.lock();
        let second = second.balance.lock();
        let (mut source, mut target) = order.restore([first, second]);

        if *source < amount {
            return Err(CellRejection::Insufficient { balance: *source });
        }
        let credited = target
            .checked_add(amount)
            .ok_or(CellRejection::Overflow)?;

        *source -= amount;
        *target = credited;
        Ok(())
    }
}

/// Balance updated by compare-and-swap
#[derive(Debug, Default)]
pub struct AtomicCell {
    balance: AtomicI64,
}

impl BalanceCell for AtomicCell {
    fn load(&self) -> Amount {
        self.balance.load(Ordering::SeqCst)
    }

    fn credit(&self, amount: Amount) -> Result<(), CellRejection> {
        self.balance
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |balance| {
                balance.checked_add(amount)
            })
            .map(drop)
            .map_err(|_| CellRejection::Overflow)
    }

    fn transfer(
        from: &Self,
        to: &Self,
        _order: LockOrder,
        amount: Amount,
    ) -> Result<(), CellRejection> {
        // Each attempt re-checks funds against the value it is about to swap
        from.balance
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |balance| {
                (balance >= amount).then(|| balance - amount)
            })
            .map_err(|balance| CellRejection::Insufficient { balance })?;

        if let Err(rejection) = to.credit(amount) {
            // Concurrent credits to `from` may have taken the room the debit
            // freed; the refund waits for room instead of wrapping
            while from
                .balance
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |balance| {
                    balance.checked_add(amount)
                })
                .is_err()
            {
                thread::yield_now();
            }
            return Err(rejection);
        }
        Ok(())
    }
}
