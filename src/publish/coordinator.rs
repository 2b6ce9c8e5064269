//! Producer/subscription coordinator.
//!
//! One coordinator exists per consumer attachment. It composes the demand
//! counter and the notification gate with the producer task's cancellation
//! token, and owns the three hard guarantees of the protocol:
//!
//! - every subscriber notification happens while the gate is held, so
//!   notifications never overlap;
//! - a delivery that drains demand to exactly 0 keeps the gate held,
//!   stalling further sends until the consumer requests more;
//! - exactly one terminal signal fires per attachment, regardless of how
//!   production, completion, and cancellation interleave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::error::{is_cancellation, Cause, IllegalDemand, SendError, TrySendError};
use crate::flow::{Close, Consume, DemandCounter, Gate, Increase};
use crate::publish::subscription::{Control, Subscription};
use crate::publish::{FailureHook, Subscriber};

/// Terminal cause captured when the producer finishes or is cancelled with
/// a reason.
///
/// `handled` records whether some path already propagated the error to a
/// caller (e.g. the send caller that received the subscriber's rejection).
/// An unhandled cause that signaling must suppress goes to the failure hook
/// instead of being dropped.
#[derive(Debug, Clone)]
pub(crate) struct CompletionCause {
    pub error: Option<Cause>,
    pub handled: bool,
}

pub(crate) struct Coordinator<T> {
    demand: DemandCounter,
    gate: Gate,
    cancelled: AtomicBool,
    /// Cause attached to an explicit producer cancellation (illegal demand,
    /// subscriber rejection, `close`). Empty for plain consumer `cancel`.
    cancel_cause: OnceLock<CompletionCause>,
    /// Resolved terminal state. Present once the producer task finished;
    /// doubles as the "producer terminal" flag for the delivery path.
    completion: OnceLock<CompletionCause>,
    token: CancellationToken,
    subscriber: Box<dyn Subscriber<T>>,
    hook: FailureHook,
}

impl<T> Coordinator<T> {
    pub fn new(subscriber: Box<dyn Subscriber<T>>, hook: FailureHook) -> Self {
        Self {
            demand: DemandCounter::new(),
            // Demand starts at 0, so the gate starts held.
            gate: Gate::new(true),
            cancelled: AtomicBool::new(false),
            cancel_cause: OnceLock::new(),
            completion: OnceLock::new(),
            token: CancellationToken::new(),
            subscriber,
            hook,
        }
    }

    /// Deliver the subscription handle. Must run before the producer task
    /// starts so the handle precedes every item notification.
    pub fn attach(this: &Arc<Self>)
    where
        T: 'static,
    {
        tracing::debug!("subscriber attached");
        let control = Arc::clone(this) as Arc<dyn Control>;
        this.subscriber.on_subscribe(Subscription::new(control));
    }

    /// True until the producer is cancelled or reaches a terminal state.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.completion.get().is_none()
    }

    /// Resolves when producer cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Request producer cancellation, recording `error` as the completion
    /// cause. The first recorded cause wins; later ones are dropped.
    fn cancel_producer(&self, error: Option<Cause>, handled: bool) {
        let _ = self.cancel_cause.set(CompletionCause { error, handled });
        self.token.cancel();
    }

    /// Producer-side early termination with an optional cause.
    pub fn close(&self, error: Option<anyhow::Error>) {
        self.cancel_producer(error.map(Arc::new), false);
    }

    // --- delivery path ---

    /// Deliver one item, suspending while the gate is unavailable (another
    /// delivery in flight, or no outstanding demand).
    pub async fn send(&self, item: T) -> Result<(), SendError> {
        if !self.gate.try_acquire() {
            self.gate.acquire().await;
        }
        self.deliver(item)
    }

    /// Non-blocking delivery attempt.
    pub fn try_send(&self, item: T) -> Result<(), TrySendError> {
        if !self.gate.try_acquire() {
            return Err(TrySendError::Full);
        }
        self.deliver(item).map_err(|e| match e {
            SendError::Cancelled => TrySendError::Cancelled,
            SendError::Subscriber(cause) => TrySendError::Subscriber(cause),
        })
    }

    /// Gate-held delivery of one item.
    fn deliver(&self, item: T) -> Result<(), SendError> {
        if !self.is_active() {
            // Cancellation (or completion) was requested before this
            // delivery's activity check: stay silent and fail the send.
            self.release_and_check_terminal();
            return Err(SendError::Cancelled);
        }

        if let Err(e) = self.subscriber.on_next(item) {
            // A subscriber rejection is a downstream failure: it cancels the
            // producer and propagates to the send caller, so it is handled.
            let cause: Cause = Arc::new(e);
            self.cancel_producer(Some(Arc::clone(&cause)), true);
            self.release_and_check_terminal();
            return Err(SendError::Subscriber(cause));
        }

        // Consume credit only after on_next, so a reentrant request() from
        // inside the callback cannot observe demand at 0 and release the
        // gate under us.
        match self.demand.consume_one() {
            // Demand exhausted: keep the gate held until the next request.
            Consume::KeepHeld => Ok(()),
            Consume::Release => {
                self.release_and_check_terminal();
                Ok(())
            }
        }
    }

    /// Release the gate, then re-check for a terminal state that arrived
    /// while the gate was held. Closes the race where the producer finishes
    /// mid-delivery and its try-acquire loses to us.
    fn release_and_check_terminal(&self) {
        self.gate.release();
        self.try_signal();
    }

    // --- terminal signaling ---

    /// Resolve and deliver the terminal state for a finished producer task.
    ///
    /// `result` is the producer future's outcome, or `None` if the task was
    /// torn down by cancellation before completing. An explicitly recorded
    /// cancel cause takes precedence over the future's own result.
    pub fn finish(&self, result: Option<anyhow::Result<()>>) {
        let resolved = match self.cancel_cause.get() {
            Some(cause) => cause.clone(),
            None => match result {
                Some(Err(e)) => CompletionCause {
                    error: Some(Arc::new(e)),
                    handled: false,
                },
                Some(Ok(())) | None => CompletionCause {
                    error: None,
                    handled: false,
                },
            },
        };
        let _ = self.completion.set(resolved);
        self.try_signal();
    }

    /// Attempt to deliver the terminal signal, if the producer is terminal.
    ///
    /// Runs the close protocol on the demand counter: a pre-close value of 0
    /// means the gate was held for backpressure and its ownership transfers
    /// to us; a positive value means the gate may be held by an in-flight
    /// delivery, which will re-run this check after its own release. Either
    /// way the signal fires exactly once, eventually.
    fn try_signal(&self) {
        let Some(cause) = self.completion.get() else {
            return;
        };
        match self.demand.close() {
            Close::AlreadySignalled => {}
            Close::GateHeld => self.locked_signal(cause),
            Close::TryAcquire => {
                if self.gate.try_acquire() {
                    self.locked_signal(cause);
                }
                // Otherwise the current gate holder signals after release.
            }
        }
    }

    /// Deliver the terminal notification. Gate must be held on entry; always
    /// released on exit.
    fn locked_signal(&self, cause: &CompletionCause) {
        if !self.demand.mark_signalled() {
            self.gate.release();
            return;
        }

        if self.cancelled.load(Ordering::SeqCst) {
            // Cancelled consumers get silence, but an unhandled failure is
            // escalated rather than dropped. A cancellation-typed cause is
            // not a failure: the producer merely propagated the failed send
            // that the cancellation itself caused.
            if let Some(error) = &cause.error {
                if !cause.handled && !is_cancellation(error) {
                    (*self.hook)(Arc::clone(error));
                }
            }
            tracing::debug!("terminal signal suppressed after cancellation");
            self.gate.release();
            return;
        }

        let outcome = match &cause.error {
            Some(error) if !is_cancellation(error) => {
                tracing::debug!(error = %error, "signaling error");
                self.subscriber.on_error(Arc::clone(error))
            }
            _ => {
                tracing::debug!("signaling completion");
                self.subscriber.on_complete()
            }
        };
        if let Err(e) = outcome {
            // The terminal slot is spent; the failure cannot be re-delivered.
            (*self.hook)(Arc::new(e));
        }
        self.gate.release();
    }
}

impl<T> Control for Coordinator<T> {
    fn request(&self, n: i64) {
        if n <= 0 {
            tracing::warn!(n, "non-positive demand request");
            self.cancel_producer(Some(Arc::new(anyhow::Error::new(IllegalDemand(n)))), false);
            return;
        }
        let outcome = self.demand.increase(n);
        tracing::trace!(n, outstanding = self.demand.get(), "demand requested");
        if outcome == Increase::Resumed {
            // Prior demand was 0: the gate is held for backpressure (or
            // still held from attachment); release it to resume a stalled
            // send.
            self.release_and_check_terminal();
        }
    }

    fn cancel(&self) {
        // Flag strictly before the cancellation request, so any terminal
        // signaling that follows observes it and stays silent.
        self.cancelled.store(true, Ordering::SeqCst);
        tracing::debug!("subscription cancelled");
        self.token.cancel();
    }
}
