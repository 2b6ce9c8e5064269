//! Atomic demand accounting for credit-based flow control.
//!
//! Outstanding consumer credit lives in a single `AtomicI64` that also
//! encodes the two terminal states of a subscription. All mutation goes
//! through compare-exchange retry loops; there is no locking and a lost
//! race is always safe to retry.

use std::sync::atomic::{AtomicI64, Ordering};

/// Demand value meaning the consumer has opted out of flow control:
/// deliveries never stall again.
pub const UNLIMITED: i64 = i64::MAX;

/// The subscription reached a terminal state; the terminal signal has not
/// fired yet.
const CLOSED: i64 = -1;

/// The terminal signal has been delivered (or suppressed). Absorbing.
const SIGNALLED: i64 = -2;

/// Outcome of [`DemandCounter::increase`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Increase {
    /// Credit was added (or demand was already unlimited).
    Granted,
    /// Credit was added and the prior value was exactly 0: the gate is held
    /// for backpressure and must be released to resume a stalled send.
    Resumed,
    /// The subscription is already terminal; the request is a no-op.
    Closed,
}

/// Outcome of [`DemandCounter::consume_one`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Consume {
    /// Demand remains (or flow control is off, or the subscription is
    /// terminal): the gate may be released.
    Release,
    /// Demand hit exactly 0: the gate must stay held, re-engaging
    /// backpressure until the next request.
    KeepHeld,
}

/// Outcome of [`DemandCounter::close`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Close {
    /// Another path already delivered the terminal signal.
    AlreadySignalled,
    /// Pre-close demand was exactly 0, so the gate was held for
    /// backpressure. Ownership transfers to the closer: signal inline.
    GateHeld,
    /// Pre-close demand was positive (or already closed); the gate may be
    /// free or held by an in-flight delivery. Try-acquire before signaling.
    TryAcquire,
}

/// Outstanding consumer credit plus terminal sentinels.
///
/// Invariant: once the value goes negative it never returns to the
/// non-negative range.
#[derive(Debug)]
pub(crate) struct DemandCounter {
    value: AtomicI64,
}

impl DemandCounter {
    /// New counter with zero credit (deliveries stall until the first
    /// request).
    pub fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }

    /// Current raw value. Negative values are terminal sentinels.
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Add `n` credits, saturating at [`UNLIMITED`].
    ///
    /// Callers must validate `n > 0` first; non-positive requests are a
    /// protocol violation handled on the control path, not here.
    pub fn increase(&self, n: i64) -> Increase {
        debug_assert!(n > 0, "non-positive demand must be rejected upstream");
        loop {
            let current = self.value.load(Ordering::SeqCst);
            if current < 0 {
                return Increase::Closed;
            }
            let updated = if n == UNLIMITED {
                UNLIMITED
            } else {
                current.saturating_add(n)
            };
            if updated == current {
                // Already unlimited.
                return Increase::Granted;
            }
            if self
                .value
                .compare_exchange(current, updated, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return if current == 0 {
                    Increase::Resumed
                } else {
                    Increase::Granted
                };
            }
        }
    }

    /// Consume one credit after a successful delivery.
    pub fn consume_one(&self) -> Consume {
        loop {
            let current = self.value.load(Ordering::SeqCst);
            if current < 0 || current == UNLIMITED {
                // Closed concurrently, or flow control is off.
                return Consume::Release;
            }
            debug_assert!(current > 0, "delivery ran without credit");
            let updated = current - 1;
            if self
                .value
                .compare_exchange(current, updated, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return if updated == 0 {
                    Consume::KeepHeld
                } else {
                    Consume::Release
                };
            }
        }
    }

    /// Transition to [`CLOSED`], reporting how the terminal signal should
    /// acquire the gate. Never overwrites [`SIGNALLED`].
    pub fn close(&self) -> Close {
        loop {
            let current = self.value.load(Ordering::SeqCst);
            if current == SIGNALLED {
                return Close::AlreadySignalled;
            }
            if self
                .value
                .compare_exchange(current, CLOSED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return if current == 0 {
                    Close::GateHeld
                } else {
                    Close::TryAcquire
                };
            }
        }
    }

    /// Transition to [`SIGNALLED`]. Returns `true` if this call won the
    /// transition, `false` if the signal was already delivered.
    pub fn mark_signalled(&self) -> bool {
        self.value.swap(SIGNALLED, Ordering::SeqCst) != SIGNALLED
    }
}
