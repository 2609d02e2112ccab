//! Retry policies and the per-invocation sessions they create.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::retry::RetryDecision;

type Decide<E> = Box<dyn FnMut(&E, u32) -> RetryDecision + Send>;
type MakeDecide<E> = dyn Fn() -> Decide<E> + Send + Sync;

/// A decision function from `(failure, attempt)` to [`RetryDecision`].
///
/// A policy is a cloneable recipe. Every logical call starts its own
/// [`RetrySession`], which owns the attempt counter and a freshly built
/// decision closure, so state such as an accumulating backoff is never shared
/// between two invocations, even when they run concurrently.
///
/// The attempt counter passed to the decision function starts at 1 for the
/// first failure. There is no implicit limit: a policy that keeps returning
/// `Retry` retries forever. Use [`with_max_attempts`](Self::with_max_attempts)
/// to cap it.
///
/// # Examples
///
/// ```rust
/// use eddy::{RetryDecision, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::<&str>::from_fn(|error, attempt| {
///     if *error == "busy" {
///         RetryDecision::Retry(Duration::from_millis(10) * attempt)
///     } else {
///         RetryDecision::GiveUp
///     }
/// })
/// .with_max_attempts(2);
///
/// let mut session = policy.start();
/// assert_eq!(session.next_decision(&"busy"), RetryDecision::Retry(Duration::from_millis(10)));
/// assert_eq!(session.next_decision(&"busy"), RetryDecision::Retry(Duration::from_millis(20)));
/// assert_eq!(session.next_decision(&"busy"), RetryDecision::GiveUp);
/// ```
pub struct RetryPolicy<E> {
    make: Arc<MakeDecide<E>>,
}

/// Information about a failed attempt, passed to [`RetryPolicy::on_retry`] hooks.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before next attempt, `None` when the policy gives up.
    pub next_delay: Option<Duration>,
    /// Time since the session started.
    pub elapsed: Duration,
}

impl<E: 'static> RetryPolicy<E> {
    /// Build a stateless policy from a decision function.
    pub fn from_fn<F>(decide: F) -> Self
    where
        F: Fn(&E, u32) -> RetryDecision + Send + Sync + 'static,
    {
        let decide = Arc::new(decide);
        Self::stateful(move || {
            let decide = Arc::clone(&decide);
            move |error: &E, attempt: u32| decide(error, attempt)
        })
    }

    /// Build a policy whose decision closure may keep mutable state.
    ///
    /// `make` runs once per session, so each invocation starts from fresh
    /// state.
    ///
    /// ```rust
    /// use eddy::{RetryDecision, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// // Delays grow 1ms, 3ms, 6ms, ... within one invocation.
    /// let policy = RetryPolicy::<()>::stateful(|| {
    ///     let mut total = Duration::ZERO;
    ///     move |_: &(), attempt: u32| {
    ///         total += Duration::from_millis(u64::from(attempt));
    ///         RetryDecision::Retry(total)
    ///     }
    /// });
    ///
    /// let mut first = policy.start();
    /// first.next_decision(&());
    /// assert_eq!(first.next_decision(&()), RetryDecision::Retry(Duration::from_millis(3)));
    ///
    /// // A new session does not see the first one's state.
    /// let mut second = policy.start();
    /// assert_eq!(second.next_decision(&()), RetryDecision::Retry(Duration::from_millis(1)));
    /// ```
    pub fn stateful<F, D>(make: F) -> Self
    where
        F: Fn() -> D + Send + Sync + 'static,
        D: FnMut(&E, u32) -> RetryDecision + Send + 'static,
    {
        Self {
            make: Arc::new(move || Box::new(make()) as Decide<E>),
        }
    }

    /// A policy that never retries.
    pub fn never() -> Self {
        Self::from_fn(|_, _| RetryDecision::GiveUp)
    }

    /// A policy that always retries without delay.
    pub fn immediately() -> Self {
        Self::from_fn(|_, _| RetryDecision::IMMEDIATELY)
    }

    /// Start a session for one logical call.
    pub fn start(&self) -> RetrySession<E> {
        RetrySession {
            decide: (self.make)(),
            attempt: 0,
        }
    }

    /// Only consult this policy for failures matching `predicate`; give up
    /// immediately on anything else.
    pub fn when<P>(self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        self.wrap(move |mut inner| {
            let predicate = Arc::clone(&predicate);
            move |error: &E, attempt: u32| {
                if predicate(error) {
                    inner(error, attempt)
                } else {
                    RetryDecision::GiveUp
                }
            }
        })
    }

    /// Give up once more than `max` retries were requested.
    ///
    /// `with_max_attempts(3)` allows up to 4 executions in total.
    pub fn with_max_attempts(self, max: u32) -> Self {
        self.wrap(move |mut inner| {
            move |error: &E, attempt: u32| {
                if attempt > max {
                    RetryDecision::GiveUp
                } else {
                    inner(error, attempt)
                }
            }
        })
    }

    /// Cap every delay at `max`.
    pub fn with_max_delay(self, max: Duration) -> Self {
        self.wrap(move |mut inner| {
            move |error: &E, attempt: u32| match inner(error, attempt) {
                RetryDecision::Retry(delay) => RetryDecision::Retry(delay.min(max)),
                RetryDecision::GiveUp => RetryDecision::GiveUp,
            }
        })
    }

    /// Call `hook` after every decision, including the final give-up.
    ///
    /// The hook is synchronous and should not block; use it for logging and
    /// metrics.
    pub fn on_retry<H>(self, hook: H) -> Self
    where
        H: Fn(&RetryEvent<'_, E>) + Send + Sync + 'static,
    {
        let hook = Arc::new(hook);
        self.wrap(move |mut inner| {
            let hook = Arc::clone(&hook);
            let started = Instant::now();
            move |error: &E, attempt: u32| {
                let decision = inner(error, attempt);
                hook(&RetryEvent {
                    attempt,
                    error,
                    next_delay: decision.delay(),
                    elapsed: started.elapsed(),
                });
                decision
            }
        })
    }

    fn wrap<W, D>(self, wrap: W) -> Self
    where
        W: Fn(Decide<E>) -> D + Send + Sync + 'static,
        D: FnMut(&E, u32) -> RetryDecision + Send + 'static,
    {
        let make = self.make;
        Self::stateful(move || wrap(make()))
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            make: Arc::clone(&self.make),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy").finish_non_exhaustive()
    }
}

/// Retry state for one logical call.
pub struct RetrySession<E> {
    decide: Decide<E>,
    attempt: u32,
}

impl<E> RetrySession<E> {
    /// Record a failure and decide what to do next.
    ///
    /// The attempt counter saturates at `u32::MAX`.
    pub fn next_decision(&mut self, failure: &E) -> RetryDecision {
        self.attempt = self.attempt.saturating_add(1);
        (self.decide)(failure, self.attempt)
    }

    /// Number of failures recorded so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl<E> fmt::Debug for RetrySession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySession")
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}
