//! Producer-side send endpoint.

use std::fmt;
use std::sync::Arc;

use crate::error::{SendError, TrySendError};
use crate::publish::coordinator::Coordinator;

/// Send endpoint handed to the producer closure.
///
/// Cloneable: multiple tasks may share one scope and send concurrently. The
/// notification gate is the sole serialization point, so callers never
/// manage locks themselves.
pub struct ProducerScope<T> {
    coordinator: Arc<Coordinator<T>>,
}

impl<T> ProducerScope<T> {
    pub(crate) fn new(coordinator: Arc<Coordinator<T>>) -> Self {
        Self { coordinator }
    }

    /// Emit one item to the subscriber.
    ///
    /// Suspends while another delivery holds the gate, and while outstanding
    /// demand is exhausted (backpressure); credit granted via
    /// [`Subscription::request`](crate::Subscription::request) resumes it.
    ///
    /// # Errors
    ///
    /// [`SendError::Cancelled`] if the subscription was cancelled or already
    /// terminated, [`SendError::Subscriber`] if the subscriber rejected the
    /// item (the producer is then cancelled with the same cause).
    pub async fn send(&self, item: T) -> Result<(), SendError> {
        self.coordinator.send(item).await
    }

    /// Emit one item without waiting.
    ///
    /// # Errors
    ///
    /// [`TrySendError::Full`] when the delivery would have to wait for the
    /// gate; otherwise as [`send`](Self::send).
    pub fn try_send(&self, item: T) -> Result<(), TrySendError> {
        self.coordinator.try_send(item)
    }

    /// Terminate the subscription early.
    ///
    /// `Some(error)` reaches the subscriber as an error notification;
    /// `None` completes it normally. The producer task is cancelled at its
    /// next suspension point.
    pub fn close(&self, error: Option<anyhow::Error>) {
        self.coordinator.close(error);
    }

    /// True until the subscription is cancelled or terminated. A send
    /// attempted after this turns false fails with a cancellation error.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.coordinator.is_active()
    }
}

impl<T> Clone for ProducerScope<T> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<T> fmt::Debug for ProducerScope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerScope")
            .field("active", &self.is_active())
            .finish()
    }
}
