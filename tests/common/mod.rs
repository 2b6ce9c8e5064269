//! Shared fixtures for integration tests.
//!
//! Provides a recording subscriber whose event log and subscription handle
//! are observable from the test body, plus a polling helper for waiting on
//! asynchronous notifications.

// Not every test binary exercises every fixture.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use headgate::{publish, Cause, ProducerScope, Publisher, Subscriber, Subscription};
use tokio::sync::oneshot;

/// Install a test tracing subscriber honoring `RUST_LOG`. Safe to call
/// from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Publisher whose producer hands its scope to the test body and then
/// parks, letting tests drive sends directly. The producer only ends via
/// cancellation or close.
pub fn scoped_publisher() -> (Publisher<String>, oneshot::Receiver<ProducerScope<String>>) {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    let publisher = publish(move |scope: ProducerScope<String>| {
        let tx = tx.lock().unwrap().take();
        async move {
            if let Some(tx) = tx {
                let _ = tx.send(scope.clone());
            }
            std::future::pending::<anyhow::Result<()>>().await
        }
    });
    (publisher, rx)
}

/// One observed subscriber notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Next(String),
    Complete,
    Error(String),
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Complete | Event::Error(_))
    }
}

/// Test-side view of a [`TestSubscriber`]: the event log plus the
/// subscription handle captured at attach time.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    subscription: Arc<Mutex<Option<Subscription>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.lock().unwrap().is_some()
    }

    /// Request demand through the captured handle.
    pub fn request(&self, n: i64) {
        let guard = self.subscription.lock().unwrap();
        guard.as_ref().expect("no subscription captured").request(n);
    }

    /// Cancel through the captured handle.
    pub fn cancel(&self) {
        let guard = self.subscription.lock().unwrap();
        guard.as_ref().expect("no subscription captured").cancel();
    }

    /// Poll until the event log satisfies `pred`, returning the log.
    /// Panics after ~2.5s.
    pub async fn wait_for(&self, pred: impl Fn(&[Event]) -> bool) -> Vec<Event> {
        for _ in 0..500 {
            let events = self.events();
            if pred(&events) {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for events, saw: {:?}", self.events());
    }
}

/// Recording subscriber with configurable behavior.
pub struct TestSubscriber {
    recorder: Recorder,
    /// Demand requested from inside `on_subscribe`; 0 requests nothing.
    initial_request: i64,
    /// Item value that `on_next` rejects with an error.
    reject_item: Option<String>,
    /// Make `on_complete` / `on_error` return an error.
    fail_terminal: bool,
}

impl TestSubscriber {
    /// Subscriber that requests `initial_request` on attach (0 = nothing).
    pub fn new(initial_request: i64) -> (Self, Recorder) {
        let recorder = Recorder::default();
        (
            Self {
                recorder: recorder.clone(),
                initial_request,
                reject_item: None,
                fail_terminal: false,
            },
            recorder,
        )
    }

    /// Subscriber whose `on_next` rejects `item`.
    pub fn rejecting(item: &str, initial_request: i64) -> (Self, Recorder) {
        let (mut subscriber, recorder) = Self::new(initial_request);
        subscriber.reject_item = Some(item.to_string());
        (subscriber, recorder)
    }

    /// Subscriber whose terminal callbacks fail.
    pub fn failing_terminal(initial_request: i64) -> (Self, Recorder) {
        let (mut subscriber, recorder) = Self::new(initial_request);
        subscriber.fail_terminal = true;
        (subscriber, recorder)
    }
}

impl Subscriber<String> for TestSubscriber {
    fn on_subscribe(&self, subscription: Subscription) {
        *self.recorder.subscription.lock().unwrap() = Some(subscription.clone());
        if self.initial_request > 0 {
            subscription.request(self.initial_request);
        }
    }

    fn on_next(&self, item: String) -> anyhow::Result<()> {
        if self.reject_item.as_deref() == Some(item.as_str()) {
            anyhow::bail!("rejected {item}");
        }
        self.recorder.push(Event::Next(item));
        Ok(())
    }

    fn on_complete(&self) -> anyhow::Result<()> {
        self.recorder.push(Event::Complete);
        if self.fail_terminal {
            anyhow::bail!("on_complete failed");
        }
        Ok(())
    }

    fn on_error(&self, error: Cause) -> anyhow::Result<()> {
        self.recorder.push(Event::Error(error.to_string()));
        if self.fail_terminal {
            anyhow::bail!("on_error failed");
        }
        Ok(())
    }
}
