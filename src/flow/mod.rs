//! Flow control primitives.
//!
//! Provides:
//! - Lock-free demand accounting for credit-based flow control
//! - The exclusive gate that serializes subscriber notifications

pub mod demand;
pub mod gate;

pub(crate) use demand::{Close, Consume, DemandCounter, Increase};
pub(crate) use gate::Gate;
