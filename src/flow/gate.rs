//! Exclusive notification gate.
//!
//! A binary lock built on a one-permit `tokio::sync::Semaphore`. Unlike a
//! mutex guard, the hold is not tied to a scope: acquiring forgets the
//! permit and releasing adds it back, so the gate can be released from a
//! different task than the one that acquired it. The delivery path relies
//! on this to keep the gate held across a backpressure stall and let a
//! later `request` release it.
//!
//! The semaphore's FIFO wait queue gives every suspended acquirer eventual
//! access; no waiter starves.

use tokio::sync::Semaphore;

/// Binary exclusive lock with non-blocking try-acquire and suspending
/// acquire.
///
/// Protocol invariant (maintained by callers, not enforced here): at most
/// one logical holder at a time, and exactly one `release` per hold.
#[derive(Debug)]
pub(crate) struct Gate {
    permit: Semaphore,
}

impl Gate {
    /// Create a gate, optionally already held.
    pub fn new(held: bool) -> Self {
        Self {
            permit: Semaphore::new(usize::from(!held)),
        }
    }

    /// Non-blocking acquire. Returns `true` on success.
    pub fn try_acquire(&self) -> bool {
        match self.permit.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Suspend until the gate is available, then hold it.
    pub async fn acquire(&self) {
        match self.permit.acquire().await {
            Ok(permit) => permit.forget(),
            // The semaphore is never closed.
            Err(_) => unreachable!("gate semaphore closed"),
        }
    }

    /// Release the gate, waking the oldest waiter if any.
    pub fn release(&self) {
        self.permit.add_permits(1);
    }
}
