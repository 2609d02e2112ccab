//! Single-result container.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use crate::sink::{SingleSink, SinkError, SinkFailure};

/// Future returned by [`Single::subscribe`].
///
/// Dropping it before it resolves cancels the running operation.
pub type SingleSubscription<T, E> = BoxFuture<'static, Result<Option<T>, E>>;

type Factory<T, E> = dyn Fn() -> SingleSubscription<T, E> + Send + Sync;

/// A lazily executed operation that resolves once with a value, no value,
/// or a failure.
///
/// Nothing runs until the container is subscribed (or awaited). Every
/// subscription executes the operation again; results are never cached, so a
/// `Single` can be re-subscribed to retry the whole operation.
///
/// # Example
///
/// ```rust
/// use eddy::{Single, SinkError};
///
/// # tokio_test::block_on(async {
/// let found = Single::<_, SinkError>::create(|sink| {
///     let _ = sink.succeed("X");
/// });
/// assert_eq!(found.await, Ok(Some("X")));
///
/// let missing = Single::<&str, SinkError>::create(|sink| {
///     let _ = sink.succeed_empty();
/// });
/// assert_eq!(missing.await, Ok(None));
/// # });
/// ```
pub struct Single<T, E> {
    factory: Arc<Factory<T, E>>,
}

impl<T, E> Single<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Build a container from a future factory.
    ///
    /// The factory is called once per subscription.
    pub fn defer<F, Fut>(make: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    {
        Self {
            factory: Arc::new(move || make().boxed()),
        }
    }

    /// A container that always resolves with `value`.
    pub fn value(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::defer(move || future::ready(Ok(Some(value.clone()))))
    }

    /// A container that always resolves without a value.
    pub fn empty() -> Self {
        Self::defer(|| future::ready(Ok(None)))
    }

    /// A container that always fails with `error`.
    pub fn failed(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::defer(move || future::ready(Err(error.clone())))
    }

    /// Start a fresh execution of the operation.
    pub fn subscribe(&self) -> SingleSubscription<T, E> {
        (self.factory)()
    }

    /// Transform the value of every execution.
    pub fn map<U, F>(self, f: F) -> Single<U, E>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Single::defer(move || {
            let f = Arc::clone(&f);
            self.subscribe().map(move |result| result.map(|value| value.map(|v| f(v))))
        })
    }
}

impl<T, E> Single<T, E>
where
    T: Send + 'static,
    E: SinkFailure,
{
    /// Adapt a callback-style producer.
    ///
    /// `producer` is called with a fresh [`SingleSink`] on every subscription
    /// and must eventually write one completion into it, typically from the
    /// completion callback of an underlying client. A producer that drops the
    /// sink without writing makes the subscription fail with
    /// `E::from(SinkError::Abandoned)`.
    pub fn create<P>(producer: P) -> Self
    where
        P: Fn(SingleSink<T, E>) + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move || {
                let token = CancellationToken::new();
                let (sink, rx) = SingleSink::channel(token.child_token());
                producer(sink);

                let guard = token.drop_guard();
                async move {
                    let _guard = guard;
                    match rx.await {
                        Ok(completion) => completion.into_result(),
                        Err(_) => Err(E::from(SinkError::Abandoned)),
                    }
                }
                .boxed()
            }),
        }
    }
}

impl<T, E> Clone for Single<T, E> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T, E> fmt::Debug for Single<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Single").finish_non_exhaustive()
    }
}

impl<T, E> IntoFuture for Single<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = Result<Option<T>, E>;
    type IntoFuture = SingleSubscription<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        self.subscribe()
    }
}
