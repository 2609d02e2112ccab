//! # Eddy
//!
//! Callback-to-async adapters and policy-driven retry for asynchronous
//! data-service clients.
//!
//! ## Layers
//!
//! - **Sinks** ([`SingleSink`], [`StreamSink`]): thread-safe, write-once
//!   handles a callback writes its completion into
//! - **Containers** ([`Single`], [`Streaming`]): lazy, re-subscribable
//!   operations built from a callback producer or a native future/stream
//! - **Retry** ([`RetryPolicy`], [`retry_if`], [`retry_with_delay`],
//!   [`Backoff`]): decides after each failure whether to run the whole
//!   operation again, and after how long
//! - **Client** ([`client`]): a data-service surface where every operation
//!   returns a container, plus a decorator that retries all of them
//!
//! ## Quick Example
//!
//! ```rust
//! use eddy::{retry_if, Single, SinkError};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Debug, PartialEq)]
//! enum Error {
//!     ConnectionExhausted,
//!     Lost(SinkError),
//! }
//!
//! impl From<SinkError> for Error {
//!     fn from(e: SinkError) -> Self {
//!         Error::Lost(e)
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let calls = Arc::new(AtomicU32::new(0));
//!
//! // A callback-style operation: the first call runs out of connections.
//! let lookup = {
//!     let calls = calls.clone();
//!     Single::<&str, Error>::create(move |sink| {
//!         if calls.fetch_add(1, Ordering::SeqCst) == 0 {
//!             let _ = sink.fail(Error::ConnectionExhausted);
//!         } else {
//!             let _ = sink.succeed("X");
//!         }
//!     })
//! };
//!
//! let retried = lookup.retry_when(retry_if(|e| *e == Error::ConnectionExhausted));
//! assert_eq!(retried.await, Ok(Some("X")));
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod adapter;
pub mod client;
mod instrument;
pub mod retry;
pub mod signal;
pub mod sink;
pub mod testing;

// Re-exports
pub use adapter::{Single, SingleSubscription, Streaming, Subscription};
pub use retry::{
    retry_backoff, retry_if, retry_if_with_jitter, retry_with_delay, Backoff, JitterStrategy,
    RetryDecision, RetryEvent, RetryPolicy, RetrySession, RetryStrategy, DEFAULT_JITTER_STEP,
};
pub use signal::{Completion, Signal};
pub use sink::{SingleSink, SinkError, SinkFailure, StreamSink};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::{Single, Streaming};
    pub use crate::client::{ClientError, DataClient, ReactiveClient, RetryClient};
    pub use crate::retry::{retry_if, retry_with_delay, RetryDecision, RetryPolicy};
    pub use crate::signal::{Completion, Signal};
    pub use crate::sink::{SingleSink, SinkError, StreamSink};
}
