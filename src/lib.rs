//! Headgate adapts cooperative producers to a pull-based subscriber protocol.
//!
//! A producer is an async closure that emits items by awaiting
//! [`ProducerScope::send`]. Headgate exposes it as a [`Publisher`] that honors
//! credit-based flow control:
//!
//! - Consumers signal demand explicitly via [`Subscription::request`]; a send
//!   with no outstanding demand suspends until credit arrives.
//! - All subscriber notifications are strictly serialized, even when multiple
//!   tasks share one send endpoint.
//! - Exactly one terminal notification (completion or error) fires per
//!   attachment, and none at all after [`Subscription::cancel`].
//!
//! # Example
//!
//! ```no_run
//! use headgate::publish;
//!
//! let publisher = publish(|scope| async move {
//!     scope.send("one").await?;
//!     scope.send("two").await?;
//!     Ok(())
//! });
//! // publisher.subscribe(subscriber) attaches a consumer and starts the
//! // producer task; items flow as the consumer requests them.
//! ```

pub mod error;
mod flow;
pub mod publish;

pub use error::{Cause, IllegalDemand, SendError, TrySendError};
pub use publish::scope::ProducerScope;
pub use publish::subscription::Subscription;
pub use publish::{publish, FailureHook, Publisher, Subscriber};
