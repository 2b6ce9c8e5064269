//! Publisher assembly: subscriber trait, producer factory, attachment.
//!
//! `publish` wraps a producer closure into a [`Publisher`]. Each
//! [`Publisher::subscribe`] call creates a fresh coordinator, hands the
//! subscription handle to the subscriber synchronously, then spawns the
//! producer future raced against the attachment's cancellation token.

mod coordinator;
pub mod scope;
pub mod subscription;

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::error::Cause;
use crate::publish::coordinator::Coordinator;
use crate::publish::scope::ProducerScope;
use crate::publish::subscription::Subscription;

/// Consumer of a published stream.
///
/// The coordinator serializes every call through the notification gate, so
/// implementations never see concurrent callbacks for one attachment.
/// Receivers are `&self`; keep mutable state behind interior mutability.
pub trait Subscriber<T>: Send + Sync {
    /// Receives the subscription handle, exactly once, before any item.
    fn on_subscribe(&self, subscription: Subscription);

    /// Receives one item. Returning an error rejects the item and cancels
    /// the producer with that cause; it comes back as the subscription's
    /// error notification.
    fn on_next(&self, item: T) -> anyhow::Result<()>;

    /// Receives the completion notification. An error here cannot be
    /// re-delivered (the terminal slot is spent) and goes to the failure
    /// hook.
    fn on_complete(&self) -> anyhow::Result<()>;

    /// Receives the error notification. Same escalation rule as
    /// [`on_complete`](Self::on_complete).
    fn on_error(&self, error: Cause) -> anyhow::Result<()>;
}

/// Sink for failures that have no caller left to report to: causes
/// suppressed by cancellation and errors raised by terminal callbacks.
pub type FailureHook = Arc<dyn Fn(Cause) + Send + Sync>;

fn default_failure_hook() -> FailureHook {
    Arc::new(|error| tracing::error!(error = %error, "unreported subscription failure"))
}

type ProducerFactory<T> =
    dyn Fn(ProducerScope<T>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// A cold stream of items backed by a producer closure.
///
/// Each [`subscribe`](Self::subscribe) runs an independent instance of the
/// producer with its own coordinator, demand, and lifecycle.
pub struct Publisher<T> {
    producer: Arc<ProducerFactory<T>>,
    hook: FailureHook,
}

/// Expose a cooperative producer as a demand-driven [`Publisher`].
///
/// The closure runs once per subscriber attachment, receiving the
/// attachment's [`ProducerScope`]. Returning `Ok(())` completes the
/// subscription; returning an error terminates it with an error
/// notification.
pub fn publish<T, F, Fut>(producer: F) -> Publisher<T>
where
    T: Send + 'static,
    F: Fn(ProducerScope<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Publisher {
        producer: Arc::new(move |scope| -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(producer(scope))
        }),
        hook: default_failure_hook(),
    }
}

impl<T: Send + 'static> Publisher<T> {
    /// Replace the failure hook. The default logs at error level.
    #[must_use]
    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.hook = hook;
        self
    }

    /// Attach a subscriber and start the producer task.
    ///
    /// The subscription handle reaches `subscriber` synchronously, before
    /// this method returns and before any item notification. The returned
    /// join handle resolves once the producer task has finished and the
    /// terminal signal has been dispatched.
    pub fn subscribe<S>(&self, subscriber: S) -> JoinHandle<()>
    where
        S: Subscriber<T> + 'static,
    {
        let coordinator = Arc::new(Coordinator::new(Box::new(subscriber), self.hook.clone()));
        Coordinator::attach(&coordinator);

        let producer = (*self.producer)(ProducerScope::new(Arc::clone(&coordinator)));
        tokio::spawn(async move {
            let result = tokio::select! {
                result = producer => Some(result),
                // Cancellation tears the producer future down at its next
                // suspension point; in-flight deliveries are synchronous and
                // always run to their own release.
                () = coordinator.cancelled() => None,
            };
            coordinator.finish(result);
        })
    }
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            hook: self.hook.clone(),
        }
    }
}
