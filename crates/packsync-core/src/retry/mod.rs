//! Per-URL failure classification and the same-URL retry policy.
//!
//! Mirrors are the primary retry mechanism: by default each candidate URL is
//! tried once. `RetryPolicy::attempts_per_url` > 1 re-tries transient
//! failures on the same URL, immediately, before the transfer unit moves on.

mod classify;
mod error;
mod policy;

pub use classify::classify;
pub use error::AttemptError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
