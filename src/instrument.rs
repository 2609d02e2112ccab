//! Tracing spans for adapted operations.
//!
//! `instrument` wraps every subscription of a container in a span: the span
//! is entered while the producer starts and while the subscription is
//! polled. Retry decorators log through `tracing` inside it, so instrumenting
//! a retried container puts the retry events under the caller's span.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tracing::Instrument as _;

use crate::adapter::{Single, Streaming, Subscription};

impl<T, E> Single<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Run every subscription inside `span`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eddy::Single;
    ///
    /// # tokio_test::block_on(async {
    /// let lookup = Single::<_, String>::value(42)
    ///     .instrument(tracing::debug_span!("lookup", key = "user:1"));
    /// assert_eq!(lookup.await, Ok(Some(42)));
    /// # });
    /// ```
    pub fn instrument(self, span: tracing::Span) -> Single<T, E> {
        Single::defer(move || {
            let subscription = span.in_scope(|| self.subscribe());
            subscription.instrument(span.clone())
        })
    }
}

impl<T, E> Streaming<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Run every subscription inside `span`.
    pub fn instrument(self, span: tracing::Span) -> Streaming<T, E> {
        Streaming::defer(move || {
            let inner = span.in_scope(|| self.subscribe());
            InstrumentedStream {
                inner,
                span: span.clone(),
            }
        })
    }
}

struct InstrumentedStream<T, E> {
    inner: Subscription<T, E>,
    span: tracing::Span,
}

impl<T, E> Stream for InstrumentedStream<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.poll_next_unpin(cx)
    }
}

impl<T, E> fmt::Debug for InstrumentedStream<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedStream")
            .field("inner", &self.inner)
            .field("span", &self.span)
            .finish()
    }
}
