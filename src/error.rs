//! Error types shared across the send and signaling paths.

use std::sync::Arc;

use thiserror::Error;

/// A completion or failure cause, shared between the send caller, the
/// terminal signal, and the failure hook.
///
/// Causes are opaque `anyhow` errors behind an `Arc` because a single cause
/// can surface in more than one place: a subscriber rejection is returned to
/// the send caller *and* recorded as the producer's completion cause.
pub type Cause = Arc<anyhow::Error>;

/// Error returned by [`ProducerScope::send`](crate::ProducerScope::send).
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The subscription was cancelled or the producer already terminated.
    /// The item was not delivered.
    #[error("subscription cancelled")]
    Cancelled,

    /// The subscriber rejected the item. The producer has been cancelled
    /// with the same cause.
    #[error("subscriber rejected item: {0}")]
    Subscriber(Cause),
}

/// Error returned by [`ProducerScope::try_send`](crate::ProducerScope::try_send).
#[derive(Debug, Clone, Error)]
pub enum TrySendError {
    /// No outstanding demand (or another delivery in flight); delivery would
    /// have to wait for the gate.
    #[error("no pending demand, delivery would block")]
    Full,

    /// The subscription was cancelled or the producer already terminated.
    #[error("subscription cancelled")]
    Cancelled,

    /// The subscriber rejected the item.
    #[error("subscriber rejected item: {0}")]
    Subscriber(Cause),
}

/// Cause attached to a subscription terminated by a non-positive demand
/// request, per the protocol's invalid-argument rule.
#[derive(Debug, Error)]
#[error("non-positive demand request: {0}")]
pub struct IllegalDemand(pub i64);

/// Whether a cause represents plain cancellation rather than a failure.
///
/// Plain cancellation completes the subscriber normally instead of surfacing
/// an error notification.
pub(crate) fn is_cancellation(cause: &anyhow::Error) -> bool {
    matches!(cause.downcast_ref::<SendError>(), Some(SendError::Cancelled))
}
