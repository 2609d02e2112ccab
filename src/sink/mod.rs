//! Completion sinks: the write side of every adapted operation.
//!
//! A producer (typically a callback of an underlying client) receives a sink
//! and writes its result into it. The read side is owned by exactly one
//! subscriber of a [`Single`](crate::Single) or [`Streaming`](crate::Streaming)
//! container.
//!
//! - [`SingleSink`] accepts exactly one of `succeed`, `succeed_empty`, `fail`.
//! - [`StreamSink`] accepts any number of `emit` calls, then one of
//!   `complete` or `fail`.
//!
//! Writes that break these rules never reach the subscriber. They return
//! [`SinkError::Terminated`] and are logged at `warn` level. Once the
//! subscriber went away, every write returns [`SinkError::Cancelled`].
//!
//! # Example
//!
//! ```rust
//! use eddy::{Single, SinkError};
//!
//! # tokio_test::block_on(async {
//! let single = Single::<i32, SinkError>::create(|sink| {
//!     sink.succeed(1).unwrap();
//!     // A second terminal write is rejected, never delivered.
//!     assert_eq!(sink.succeed(2), Err(SinkError::Terminated));
//! });
//!
//! assert_eq!(single.await, Ok(Some(1)));
//! # });
//! ```

use std::fmt;

mod single;
mod stream;

pub use single::SingleSink;
pub use stream::StreamSink;

/// Error returned by a sink write that was not delivered.
///
/// `Abandoned` is never returned by a write; it is the failure a subscriber
/// observes when the producer dropped its sink without a terminal signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkError {
    /// The sink already received its terminal signal.
    Terminated,
    /// The subscriber cancelled or dropped its subscription.
    Cancelled,
    /// The producer released the sink without writing a terminal signal.
    Abandoned,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminated => write!(f, "sink already received its terminal signal"),
            Self::Cancelled => write!(f, "subscriber cancelled the operation"),
            Self::Abandoned => write!(f, "producer released the sink without completing"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Failure types a container can deliver.
///
/// Containers need to report an abandoned sink through the caller's own
/// error type, so they require `From<SinkError>`.
pub trait SinkFailure: From<SinkError> + Send + 'static {}

impl<E> SinkFailure for E where E: From<SinkError> + Send + 'static {}

/// Write side of a sink channel.
pub(crate) enum Slot<S> {
    Open(S),
    /// A terminal signal was written.
    Closed,
    /// The subscriber is gone.
    Cancelled,
}

impl<S> Slot<S> {
    pub(crate) fn is_open(&self) -> bool {
        matches!(self, Slot::Open(_))
    }
}
