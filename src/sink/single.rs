//! Write-once sink for single-result operations.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::signal::Completion;
use crate::sink::{SinkError, Slot};

/// Destination for the result of a single-result operation.
///
/// Cloning a sink is cheap and every clone writes to the same subscriber, so
/// separate success and failure callbacks can each hold one. Only the first
/// terminal write is delivered.
pub struct SingleSink<T, E> {
    inner: Arc<Inner<T, E>>,
}

struct Inner<T, E> {
    tx: Mutex<Slot<oneshot::Sender<Completion<T, E>>>>,
    token: CancellationToken,
}

impl<T, E> SingleSink<T, E> {
    pub(crate) fn channel(token: CancellationToken) -> (Self, oneshot::Receiver<Completion<T, E>>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self {
            inner: Arc::new(Inner {
                tx: Mutex::new(Slot::Open(tx)),
                token,
            }),
        };
        (sink, rx)
    }

    /// Resolve the operation with a value.
    pub fn succeed(&self, value: T) -> Result<(), SinkError> {
        self.complete(Completion::Value(value))
    }

    /// Resolve the operation successfully without a value.
    pub fn succeed_empty(&self) -> Result<(), SinkError> {
        self.complete(Completion::Empty)
    }

    /// Resolve the operation with a failure.
    pub fn fail(&self, error: E) -> Result<(), SinkError> {
        self.complete(Completion::Failure(error))
    }

    /// Write the terminal completion.
    ///
    /// Returns [`SinkError::Terminated`] if a completion was already written
    /// and [`SinkError::Cancelled`] if the subscriber is gone.
    pub fn complete(&self, completion: Completion<T, E>) -> Result<(), SinkError> {
        let mut slot = self.inner.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_open() && self.inner.token.is_cancelled() {
            *slot = Slot::Cancelled;
        }

        let tx = match std::mem::replace(&mut *slot, Slot::Closed) {
            Slot::Open(tx) => tx,
            Slot::Cancelled => {
                *slot = Slot::Cancelled;
                tracing::trace!("single-result sink written after cancellation");
                return Err(SinkError::Cancelled);
            }
            Slot::Closed => {
                tracing::warn!("single-result sink written after its terminal signal");
                return Err(SinkError::Terminated);
            }
        };

        if tx.send(completion).is_err() {
            tracing::trace!("single-result subscriber dropped before completion");
            *slot = Slot::Cancelled;
            return Err(SinkError::Cancelled);
        }
        Ok(())
    }

    /// Returns true once the sink is closed, by a terminal completion or by
    /// cancellation observed on a write.
    pub fn is_terminated(&self) -> bool {
        !self
            .inner
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_open()
    }

    /// Returns true if the subscriber cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Wait until the subscriber cancels the operation.
    ///
    /// Producers can race their work against this to release resources early.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + '_ {
        self.inner.token.cancelled()
    }

    /// A token cancelled together with the subscription.
    ///
    /// It is a child of the subscriber's token: cancelling it from the
    /// producer side only rejects later writes, and the subscriber then fails
    /// as abandoned once the sink is released.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }
}

impl<T, E> Clone for SingleSink<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for SingleSink<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleSink")
            .field("terminated", &self.is_terminated())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
