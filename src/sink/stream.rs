//! Write-many sink for streaming operations.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::signal::Signal;
use crate::sink::{SinkError, Slot};

/// Destination for the values of a streaming operation.
///
/// Values reach the subscriber in `emit` order. The channel is unbounded:
/// the producer paces itself and nothing emitted before the terminal signal
/// is dropped.
pub struct StreamSink<T, E> {
    inner: Arc<Inner<T, E>>,
}

struct Inner<T, E> {
    tx: Mutex<Slot<mpsc::UnboundedSender<Signal<T, E>>>>,
    token: CancellationToken,
}

impl<T, E> StreamSink<T, E> {
    pub(crate) fn channel(
        token: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<Signal<T, E>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            inner: Arc::new(Inner {
                tx: Mutex::new(Slot::Open(tx)),
                token,
            }),
        };
        (sink, rx)
    }

    /// Deliver the next value.
    pub fn emit(&self, value: T) -> Result<(), SinkError> {
        self.send(Signal::Next(value))
    }

    /// Finish the sequence successfully.
    pub fn complete(&self) -> Result<(), SinkError> {
        self.send(Signal::Complete)
    }

    /// Finish the sequence with a failure.
    pub fn fail(&self, error: E) -> Result<(), SinkError> {
        self.send(Signal::Failure(error))
    }

    /// Write a raw signal. Terminal signals close the sink.
    pub fn send(&self, signal: Signal<T, E>) -> Result<(), SinkError> {
        // The lock is held across the send so a terminal signal can never be
        // overtaken by a concurrent emit.
        let mut slot = self.inner.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_open() && self.inner.token.is_cancelled() {
            *slot = Slot::Cancelled;
        }

        let tx = match &*slot {
            Slot::Open(tx) => tx,
            Slot::Cancelled => {
                tracing::trace!("stream sink written after cancellation");
                return Err(SinkError::Cancelled);
            }
            Slot::Closed => {
                tracing::warn!("stream sink written after its terminal signal");
                return Err(SinkError::Terminated);
            }
        };

        let terminal = signal.is_terminal();
        if tx.send(signal).is_err() {
            *slot = Slot::Cancelled;
            return Err(SinkError::Cancelled);
        }
        if terminal {
            *slot = Slot::Closed;
        }
        Ok(())
    }

    /// Returns true once the sink is closed, by a terminal signal or by
    /// cancellation observed on a write.
    pub fn is_terminated(&self) -> bool {
        !self
            .inner
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_open()
    }

    /// Returns true if the subscriber cancelled the stream.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Wait until the subscriber cancels the stream.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + '_ {
        self.inner.token.cancelled()
    }

    /// A token cancelled together with the subscription.
    ///
    /// It is a child of the subscriber's token: cancelling it from the
    /// producer side only rejects later writes. Values already emitted are
    /// still delivered, and the stream then fails as abandoned once the sink
    /// is released.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }
}

impl<T, E> Clone for StreamSink<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for StreamSink<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSink")
            .field("terminated", &self.is_terminated())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
