//! Re-running a whole container according to a retry policy.

use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::adapter::{Single, Streaming, Subscription};
use crate::retry::{RetryDecision, RetryPolicy, RetrySession};

impl<T, E> Single<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Retry the whole operation according to `policy`.
    ///
    /// Every subscription of the returned container starts a new
    /// [`RetrySession`]. On failure the policy decides: `Retry(delay)` waits,
    /// then subscribes to `self` again from scratch; `GiveUp` resolves with
    /// the failure exactly as the last attempt produced it. Attempts never
    /// overlap. Dropping the subscription cancels the running attempt or the
    /// pending delay, and no further attempt starts.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eddy::{retry_if, Single};
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let calls = Arc::new(AtomicU32::new(0));
    /// let flaky = {
    ///     let calls = calls.clone();
    ///     Single::defer(move || {
    ///         let n = calls.fetch_add(1, Ordering::SeqCst);
    ///         async move { if n == 0 { Err("busy") } else { Ok(Some("X")) } }
    ///     })
    /// };
    ///
    /// let get = flaky.retry_when(retry_if(|error: &&str| *error == "busy"));
    /// assert_eq!(get.await, Ok(Some("X")));
    /// assert_eq!(calls.load(Ordering::SeqCst), 2);
    /// # });
    /// ```
    pub fn retry_when(self, policy: RetryPolicy<E>) -> Single<T, E> {
        Single::defer(move || {
            let source = self.clone();
            let mut session = policy.start();
            async move {
                loop {
                    match source.subscribe().await {
                        Ok(value) => {
                            if session.attempt() > 0 {
                                tracing::trace!(
                                    attempts = session.attempt() + 1,
                                    "single-result operation succeeded after retry"
                                );
                            }
                            return Ok(value);
                        }
                        Err(error) => {
                            let step = next_step(&mut session, &error, "single-result");
                            match step {
                                Some(delay) => pause(delay).await,
                                None => return Err(error),
                            }
                        }
                    }
                }
            }
        })
    }
}

impl<T, E> Streaming<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Retry the whole stream according to `policy`.
    ///
    /// A retried stream restarts from its beginning, so values delivered by a
    /// failed attempt may be delivered again (at-least-once). Values already
    /// delivered are never retracted. When the policy gives up, the
    /// subscriber receives the original failure as the terminal item.
    /// Cancelling the subscription cancels the running attempt or the pending
    /// delay, and no further attempt starts.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eddy::{RetryPolicy, SinkError, Streaming};
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let calls = Arc::new(AtomicU32::new(0));
    /// let flaky = {
    ///     let calls = calls.clone();
    ///     Streaming::<_, SinkError>::create(move |sink| {
    ///         let _ = sink.emit("a");
    ///         if calls.fetch_add(1, Ordering::SeqCst) == 0 {
    ///             let _ = sink.fail(SinkError::Abandoned);
    ///         } else {
    ///             let _ = sink.emit("b");
    ///             let _ = sink.complete();
    ///         }
    ///     })
    /// };
    ///
    /// let values = flaky.retry_when(RetryPolicy::immediately()).collect_all().await;
    /// assert_eq!(values, Ok(vec!["a", "a", "b"]));
    /// # });
    /// ```
    pub fn retry_when(self, policy: RetryPolicy<E>) -> Streaming<T, E> {
        Streaming::defer(move || {
            let state = RetryState {
                source: self.clone(),
                session: policy.start(),
                current: None,
                finished: false,
            };
            stream::unfold(state, |mut state| async move {
                if state.finished {
                    return None;
                }
                loop {
                    let source = &state.source;
                    let attempt = state.current.get_or_insert_with(|| source.subscribe());
                    match attempt.next().await {
                        Some(Ok(value)) => return Some((Ok(value), state)),
                        None => {
                            if state.session.attempt() > 0 {
                                tracing::trace!(
                                    attempts = state.session.attempt() + 1,
                                    "stream completed after retry"
                                );
                            }
                            return None;
                        }
                        Some(Err(error)) => {
                            state.current = None;
                            let step = next_step(&mut state.session, &error, "stream");
                            match step {
                                Some(delay) => pause(delay).await,
                                None => {
                                    state.finished = true;
                                    return Some((Err(error), state));
                                }
                            }
                        }
                    }
                }
            })
        })
    }
}

struct RetryState<T, E> {
    source: Streaming<T, E>,
    session: RetrySession<E>,
    current: Option<Subscription<T, E>>,
    finished: bool,
}

/// Consult the session; `Some(delay)` means run again after `delay`.
fn next_step<E>(session: &mut RetrySession<E>, error: &E, kind: &'static str) -> Option<Duration> {
    match session.next_decision(error) {
        RetryDecision::Retry(delay) => {
            tracing::debug!(
                operation = kind,
                attempt = session.attempt(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "operation failed, retrying"
            );
            Some(delay)
        }
        RetryDecision::GiveUp => {
            tracing::debug!(
                operation = kind,
                attempts = session.attempt(),
                "operation failed, giving up"
            );
            None
        }
    }
}

async fn pause(delay: Duration) {
    if delay.is_zero() {
        // Keep a zero-delay retry loop from starving the runtime.
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}
