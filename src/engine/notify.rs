//! Commit-ordered delivery of store notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Hands out tickets in commit order and lets each holder notify the
/// store only once every earlier ticket has been served.
///
/// Tickets must be taken while the region guard is held; waiting for a
/// turn happens after the guard is dropped.
#[derive(Debug, Default)]
pub struct NotifyOrder {
    issued: AtomicU64,
    served: Mutex<u64>,
    turn: Condvar,
}

/// Exclusive right to notify the store. Dropping it passes the turn on.
#[derive(Debug)]
pub struct Turn<'a> {
    order: &'a NotifyOrder,
    served: MutexGuard<'a, u64>,
}

impl NotifyOrder {
    pub fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::Relaxed)
    }

    /// Block until `ticket` is next in line.
    pub fn wait_turn(&self, ticket: u64) -> Turn<'_> {
        let mut served = self.served.lock().unwrap_or_else(PoisonError::into_inner);
        while *served != ticket {
            served = self
                .turn
                .wait(served)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Turn { order: self, served }
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        *self.served += 1;
        self.order.turn.notify_all();
    }
}
