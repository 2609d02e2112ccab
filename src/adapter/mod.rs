//! Push-based containers built from callback-style producers.
//!
//! - [`Single`] resolves once: `Ok(Some(value))`, `Ok(None)` or `Err(error)`.
//! - [`Streaming`] emits `Ok(value)` items, then completes or yields one `Err`.
//!
//! Both are lazy and re-executable: each subscription runs the producer again
//! with a fresh sink, which is what lets [`retry_when`](Single::retry_when)
//! restart an operation from scratch.

mod single;
mod stream;

pub use single::{Single, SingleSubscription};
pub use stream::{Streaming, Subscription};
