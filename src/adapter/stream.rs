//! Stream container and its cancellable subscription.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use futures::stream::{self, BoxStream, FusedStream, Stream, StreamExt, TryStreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::signal::Signal;
use crate::sink::{SinkError, SinkFailure, StreamSink};

type Factory<T, E> = dyn Fn() -> BoxStream<'static, Result<T, E>> + Send + Sync;

/// A lazily executed operation that emits zero or more values, then
/// completes or fails.
///
/// Like [`Single`](crate::Single), every subscription executes the operation
/// from scratch. A subscription yields `Ok(value)` items in the order the
/// producer emitted them, then ends: `None` after completion, or one
/// `Err(error)` followed by `None` after a failure.
///
/// # Example
///
/// ```rust
/// use eddy::{SinkError, Streaming};
/// use futures::StreamExt;
///
/// # tokio_test::block_on(async {
/// let numbers = Streaming::<_, SinkError>::create(|sink| {
///     for n in 1..=3 {
///         let _ = sink.emit(n);
///     }
///     let _ = sink.complete();
/// });
///
/// let seen: Vec<_> = numbers.subscribe().collect().await;
/// assert_eq!(seen, vec![Ok(1), Ok(2), Ok(3)]);
/// # });
/// ```
pub struct Streaming<T, E> {
    factory: Arc<Factory<T, E>>,
}

impl<T, E> Streaming<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Build a container from a stream factory, called once per subscription.
    ///
    /// The first `Err` item the stream yields is treated as its terminal
    /// failure; later items are never delivered.
    pub fn defer<F, S>(make: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = Result<T, E>> + Send + 'static,
    {
        Self {
            factory: Arc::new(move || make().boxed()),
        }
    }

    /// A container that emits `values` and completes.
    pub fn iter(values: Vec<T>) -> Self
    where
        T: Clone + Sync,
    {
        Self::defer(move || stream::iter(values.clone().into_iter().map(Ok)))
    }

    /// A container that completes without emitting.
    pub fn empty() -> Self {
        Self::defer(|| stream::empty())
    }

    /// A container that fails immediately with `error`.
    pub fn failed(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::defer(move || stream::once(futures::future::ready(Err(error.clone()))))
    }

    /// Start a fresh execution of the operation.
    pub fn subscribe(&self) -> Subscription<T, E> {
        Subscription {
            inner: Some((self.factory)()),
        }
    }

    /// Transform every emitted value.
    pub fn map<U, F>(self, f: F) -> Streaming<U, E>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Streaming::defer(move || {
            let f = Arc::clone(&f);
            self.subscribe().map_ok(move |value| f(value))
        })
    }

    /// Subscribe and collect every value, or return the terminal failure.
    pub fn collect_all(&self) -> impl Future<Output = Result<Vec<T>, E>> + Send + 'static {
        self.subscribe().try_collect()
    }
}

impl<T, E> Streaming<T, E>
where
    T: Send + 'static,
    E: SinkFailure,
{
    /// Adapt a callback-style producer.
    ///
    /// `producer` is called with a fresh [`StreamSink`] on every subscription.
    /// It may call `emit` any number of times, then must write one terminal
    /// signal. Dropping every clone of the sink without a terminal signal fails
    /// the subscription with `E::from(SinkError::Abandoned)`.
    pub fn create<P>(producer: P) -> Self
    where
        P: Fn(StreamSink<T, E>) + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move || {
                let token = CancellationToken::new();
                let (sink, rx) = StreamSink::channel(token.child_token());
                producer(sink);
                SinkStream {
                    rx,
                    guard: Some(token.drop_guard()),
                }
                .boxed()
            }),
        }
    }

    /// A container that replays `signals` on every subscription.
    ///
    /// Signals after the first terminal one are rejected by the sink. Without
    /// a terminal signal the subscription fails as abandoned.
    pub fn from_signals(signals: Vec<Signal<T, E>>) -> Self
    where
        T: Clone + Sync,
        E: Clone + Sync,
    {
        Self::create(move |sink| {
            for signal in signals.iter().cloned() {
                if sink.send(signal).is_err() {
                    break;
                }
            }
        })
    }
}

impl<T, E> Clone for Streaming<T, E> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T, E> fmt::Debug for Streaming<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streaming").finish_non_exhaustive()
    }
}

/// An active subscription to a [`Streaming`] container.
///
/// Dropping the subscription or calling [`cancel`](Subscription::cancel)
/// releases the running operation. Once `cancel` returns, no further value is
/// delivered.
pub struct Subscription<T, E> {
    inner: Option<BoxStream<'static, Result<T, E>>>,
}

impl<T, E> Subscription<T, E> {
    /// Cancel the operation.
    ///
    /// The producer observes the cancellation through its sink, and every
    /// later poll of this subscription returns `None`.
    pub fn cancel(&mut self) {
        self.inner = None;
    }

    /// Returns true until the subscription was cancelled or reached its
    /// terminal signal.
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }
}

impl<T, E> Stream for Subscription<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        let item = ready!(inner.poll_next_unpin(cx));
        if !matches!(item, Some(Ok(_))) {
            this.inner = None;
        }
        Poll::Ready(item)
    }
}

impl<T, E> FusedStream for Subscription<T, E> {
    fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}

impl<T, E> fmt::Debug for Subscription<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Read side of a [`StreamSink`].
///
/// The guard owns the subscriber's token; sinks only hold a child of it, so
/// nothing on the producer side can end this stream early.
struct SinkStream<T, E> {
    rx: mpsc::UnboundedReceiver<Signal<T, E>>,
    guard: Option<DropGuard>,
}

impl<T, E> SinkStream<T, E> {
    fn finish(&mut self) {
        self.rx.close();
        if let Some(guard) = self.guard.take() {
            let _ = guard.disarm();
        }
    }
}

impl<T, E> Stream for SinkStream<T, E>
where
    E: From<SinkError>,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.guard.is_none() {
            return Poll::Ready(None);
        }

        match ready!(this.rx.poll_recv(cx)) {
            Some(Signal::Next(value)) => Poll::Ready(Some(Ok(value))),
            Some(Signal::Complete) => {
                this.finish();
                Poll::Ready(None)
            }
            Some(Signal::Failure(error)) => {
                this.finish();
                Poll::Ready(Some(Err(error)))
            }
            None => {
                this.finish();
                Poll::Ready(Some(Err(E::from(SinkError::Abandoned))))
            }
        }
    }
}
