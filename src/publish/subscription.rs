//! Consumer-facing subscription handle.

use std::fmt;
use std::sync::Arc;

/// Narrow control seam the handle exposes to the consumer. Implemented by
/// the coordinator; the consumer never sees the send side or task control.
pub(crate) trait Control: Send + Sync {
    fn request(&self, n: i64);
    fn cancel(&self);
}

/// Handle for controlling an active subscription.
///
/// Delivered to the subscriber exactly once, synchronously, before any item
/// notification. Cloneable; all clones control the same attachment. Both
/// methods may be called concurrently, any number of times, before or after
/// termination, and never block.
#[derive(Clone)]
pub struct Subscription {
    control: Arc<dyn Control>,
}

impl Subscription {
    pub(crate) fn new(control: Arc<dyn Control>) -> Self {
        Self { control }
    }

    /// Grant `n` credits of demand.
    ///
    /// Demand accumulates with saturation: once the sum would overflow (or
    /// `n` is `i64::MAX`) flow control is disabled for the rest of the
    /// subscription. A non-positive `n` is a protocol violation: the
    /// subscription terminates with an error notification carrying an
    /// illegal-demand cause.
    pub fn request(&self, n: i64) {
        self.control.request(n);
    }

    /// Cancel the subscription.
    ///
    /// Idempotent. After cancellation is observed no further item or
    /// terminal notifications occur; an in-flight delivery may still finish
    /// if it already passed its activity check.
    pub fn cancel(&self) {
        self.control.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
