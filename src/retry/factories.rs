//! Ready-made retry policies.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::retry::{Backoff, RetryDecision, RetryPolicy};

/// Upper bound of the random step [`retry_if`] adds to its delay per attempt.
pub const DEFAULT_JITTER_STEP: Duration = Duration::from_millis(10);

/// Retry every failure, waiting whatever `delay` returns.
///
/// `delay` receives the failure and the attempt counter (starting at 1).
/// Returning `None` gives up on that attempt, and the caller receives the
/// original failure unchanged.
///
/// # Example
///
/// ```rust
/// use eddy::{retry_with_delay, RetryDecision};
/// use std::time::Duration;
///
/// let policy = retry_with_delay(|_: &String, attempt| {
///     (attempt <= 2).then(|| Duration::from_millis(50))
/// });
///
/// let mut session = policy.start();
/// let error = "busy".to_string();
/// assert_eq!(session.next_decision(&error), RetryDecision::Retry(Duration::from_millis(50)));
/// assert_eq!(session.next_decision(&error), RetryDecision::Retry(Duration::from_millis(50)));
/// assert_eq!(session.next_decision(&error), RetryDecision::GiveUp);
/// ```
pub fn retry_with_delay<E, F>(delay: F) -> RetryPolicy<E>
where
    E: 'static,
    F: Fn(&E, u32) -> Option<Duration> + Send + Sync + 'static,
{
    RetryPolicy::from_fn(move |error, attempt| delay(error, attempt).into())
}

/// Retry failures matching `predicate` with a randomized, growing delay.
///
/// Any failure the predicate rejects ends the call at once, without delay.
/// For accepted failures each attempt adds a random step of 1ms to
/// [`DEFAULT_JITTER_STEP`] to a delay accumulator, so waits strictly
/// increase within one call. The accumulator belongs to the call's session
/// and starts from zero for every new call.
///
/// There is no attempt limit; combine with
/// [`with_max_attempts`](RetryPolicy::with_max_attempts) if one is needed.
///
/// # Example
///
/// ```rust
/// use eddy::retry_if;
///
/// #[derive(Debug)]
/// enum Error { Busy, Invalid }
///
/// let policy = retry_if(|error: &Error| matches!(error, Error::Busy));
/// let mut session = policy.start();
///
/// let first = session.next_decision(&Error::Busy).delay().unwrap();
/// let second = session.next_decision(&Error::Busy).delay().unwrap();
/// assert!(second > first);
/// assert!(session.next_decision(&Error::Invalid).is_give_up());
/// ```
pub fn retry_if<E, P>(predicate: P) -> RetryPolicy<E>
where
    E: 'static,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    retry_if_with_jitter(predicate, DEFAULT_JITTER_STEP)
}

/// [`retry_if`] with a custom upper bound for the random step.
///
/// Steps are whole milliseconds in `1..=max_step`; bounds below 1ms are
/// treated as 1ms.
pub fn retry_if_with_jitter<E, P>(predicate: P, max_step: Duration) -> RetryPolicy<E>
where
    E: 'static,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    let predicate = Arc::new(predicate);
    let max_step_ms = u64::try_from(max_step.as_millis()).unwrap_or(u64::MAX).max(1);

    RetryPolicy::stateful(move || {
        let predicate = Arc::clone(&predicate);
        let mut backoff = Duration::ZERO;
        move |error: &E, _attempt: u32| {
            if !predicate(error) {
                return RetryDecision::GiveUp;
            }
            let step = rand::rng().random_range(1..=max_step_ms);
            backoff = backoff.saturating_add(Duration::from_millis(step));
            RetryDecision::Retry(backoff)
        }
    })
}

/// Retry every failure on a [`Backoff`] schedule.
pub fn retry_backoff<E: 'static>(backoff: Backoff) -> RetryPolicy<E> {
    backoff.into_policy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn retry_with_delay_passes_failure_and_attempt() {
        let policy = retry_with_delay(|error: &u64, attempt| {
            Some(Duration::from_millis(*error * u64::from(attempt)))
        });
        let mut session = policy.start();

        assert_eq!(
            session.next_decision(&3),
            RetryDecision::Retry(Duration::from_millis(3))
        );
        assert_eq!(
            session.next_decision(&3),
            RetryDecision::Retry(Duration::from_millis(6))
        );
    }

    #[test]
    fn retry_with_delay_none_gives_up_on_that_attempt() {
        let policy = retry_with_delay(|_: &(), attempt| {
            (attempt != 2).then_some(Duration::ZERO)
        });
        let mut session = policy.start();

        assert!(session.next_decision(&()).is_retry());
        assert!(session.next_decision(&()).is_give_up());
    }

    #[test]
    fn retry_if_rejects_without_delay() {
        let policy = retry_if(|error: &i32| *error == 0);
        let mut session = policy.start();
        assert_eq!(session.next_decision(&1), RetryDecision::GiveUp);
    }

    #[test]
    fn retry_if_accumulator_is_per_session() {
        let policy = retry_if_with_jitter(|_: &()| true, Duration::from_millis(1));

        let mut first = policy.start();
        for _ in 0..5 {
            first.next_decision(&());
        }
        assert_eq!(
            first.next_decision(&()),
            RetryDecision::Retry(Duration::from_millis(6))
        );

        let mut second = policy.start();
        assert_eq!(
            second.next_decision(&()),
            RetryDecision::Retry(Duration::from_millis(1))
        );
    }

    #[test]
    fn retry_if_sub_millisecond_step_is_one_millisecond() {
        let policy = retry_if_with_jitter(|_: &()| true, Duration::from_micros(10));
        let mut session = policy.start();
        assert_eq!(
            session.next_decision(&()),
            RetryDecision::Retry(Duration::from_millis(1))
        );
    }

    #[tokio::test]
    async fn concurrent_sessions_do_not_share_state() {
        let policy = retry_if_with_jitter(|_: &()| true, Duration::from_millis(1));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let policy = policy.clone();
                tokio::spawn(async move {
                    let mut session = policy.start();
                    let mut last = None;
                    for _ in 0..10 {
                        last = session.next_decision(&()).delay();
                        tokio::task::yield_now().await;
                    }
                    last
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(Duration::from_millis(10)));
        }
    }

    #[test]
    fn retry_backoff_uses_schedule() {
        let policy = retry_backoff::<()>(Backoff::constant(Duration::from_millis(7)).with_max_retries(1));
        let mut session = policy.start();
        assert_eq!(
            session.next_decision(&()),
            RetryDecision::Retry(Duration::from_millis(7))
        );
        assert!(session.next_decision(&()).is_give_up());
    }

    proptest! {
        #[test]
        fn retry_if_delays_strictly_increase(attempts in 1usize..50, step_ms in 1u64..100) {
            let policy = retry_if_with_jitter(|_: &()| true, Duration::from_millis(step_ms));
            let mut session = policy.start();
            let mut previous = Duration::ZERO;
            for _ in 0..attempts {
                let delay = session.next_decision(&()).delay().unwrap();
                prop_assert!(delay > previous);
                prop_assert!(delay - previous <= Duration::from_millis(step_ms));
                previous = delay;
            }
        }

        #[test]
        fn predicate_rejection_is_immediate_regardless_of_attempt(prior in 0usize..20) {
            let policy = retry_if(|error: &bool| *error);
            let mut session = policy.start();
            for _ in 0..prior {
                session.next_decision(&true);
            }
            prop_assert_eq!(session.next_decision(&false), RetryDecision::GiveUp);
        }
    }
}
