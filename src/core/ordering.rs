//! Deterministic lock ordering for two-account operations
//!
//! Every operation touching two accounts acts on them in one global order:
//! byte-wise comparison of ids, greater id first. Two transfers between the
//! same pair therefore always contend on the same account first, whichever
//! direction they run in, so no cycle of waiters can form.

/// Which side of a transfer is acted on first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOrder {
    FromFirst,
    ToFirst,
}

impl LockOrder {
    /// Order for a transfer from `from` to `to`
    pub fn of(from: &str, to: &str) -> Self {
        if from > to {
            LockOrder::FromFirst
        } else {
            LockOrder::ToFirst
        }
    }

    /// Put the `from` and `to` items into acquisition order
    pub fn arrange<T>(self, from: T, to: T) -> [T; 2] {
        match self {
            LockOrder::FromFirst => [from, to],
            LockOrder::ToFirst => [to, from],
        }
    }

    /// Inverse of [`arrange`](Self::arrange): back to `(from, to)`
    pub fn restore<T>(self, [first, second]: [T; 2]) -> (T, T) {
        match self {
            LockOrder::FromFirst => (first, second),
            LockOrder::ToFirst => (second, first),
        }
    }
}
