//! Policy-driven retry for single-result and streaming operations.
//!
//! A [`RetryPolicy`] maps `(failure, attempt)` to a [`RetryDecision`]. The
//! decorators [`Single::retry_when`](crate::Single::retry_when) and
//! [`Streaming::retry_when`](crate::Streaming::retry_when) use it to re-run a
//! whole operation:
//!
//! - **Lazy**: nothing runs until the decorated container is subscribed
//! - **Isolated**: each subscription gets its own [`RetrySession`]
//! - **Transparent**: when the policy gives up, the caller sees the original
//!   failure, never a wrapper
//!
//! # Quick Start
//!
//! ```rust
//! use eddy::{retry_with_delay, Single};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = retry_with_delay(|_: &String, attempt| {
//!     (attempt <= 3).then(|| Duration::from_millis(1))
//! });
//!
//! let lookup = Single::<u32, String>::failed("unreachable".to_string()).retry_when(policy);
//! assert_eq!(lookup.await, Err("unreachable".to_string()));
//! # });
//! ```
//!
//! # Ready-made policies
//!
//! - [`retry_with_delay`]: caller-computed delay per attempt, `None` gives up
//! - [`retry_if`]: predicate-gated, randomized delay that grows each attempt
//! - [`retry_backoff`]: constant, linear, exponential or Fibonacci schedules
//!   with optional jitter, described by a [`Backoff`]

mod backoff;
mod decision;
mod decorator;
mod factories;
mod policy;

pub use backoff::{Backoff, JitterStrategy, RetryStrategy};
pub use decision::RetryDecision;
pub use factories::{
    retry_backoff, retry_if, retry_if_with_jitter, retry_with_delay, DEFAULT_JITTER_STEP,
};
pub use policy::{RetryEvent, RetryPolicy, RetrySession};

#[cfg(test)]
mod tests;
