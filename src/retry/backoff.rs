//! Backoff schedules: how long to wait before retry N.

use std::time::Duration;

use rand::Rng;

use crate::retry::{RetryDecision, RetryPolicy};

/// A delay schedule, optionally bounded and jittered.
///
/// A `Backoff` is plain data. Turn it into a [`RetryPolicy`] with
/// [`into_policy`](Self::into_policy) (or
/// [`retry_backoff`](crate::retry_backoff)) and narrow it with the policy
/// combinators.
///
/// With the `serde` feature a `Backoff` can be loaded from configuration.
///
/// # Examples
///
/// ```rust
/// use eddy::Backoff;
/// use std::time::Duration;
///
/// // 100ms, 200ms, 400ms, ... for at most five retries
/// let backoff = Backoff::exponential(Duration::from_millis(100))
///     .with_max_retries(5);
///
/// assert_eq!(backoff.max_retries(), Some(5));
///
/// // A flat half second, never more than 30s even if reconfigured
/// let backoff = Backoff::constant(Duration::from_millis(500))
///     .with_max_delay(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Backoff {
    strategy: RetryStrategy,
    #[cfg_attr(feature = "serde", serde(default))]
    max_retries: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    max_delay: Option<Duration>,
    #[cfg_attr(feature = "serde", serde(default))]
    jitter: JitterStrategy,
}

/// The growth curve of retry delays.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RetryStrategy {
    /// The same delay for every retry.
    Constant(Duration),
    /// `base`, `2 * base`, `3 * base`, ...
    Linear {
        /// First delay.
        base: Duration,
    },
    /// `base`, doubling on every retry.
    Exponential {
        /// First delay.
        base: Duration,
    },
    /// `base` scaled by 1, 1, 2, 3, 5, 8, ...
    Fibonacci {
        /// First delay.
        base: Duration,
    },
}

/// How a computed delay is randomized.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JitterStrategy {
    /// Use the computed delay as is.
    #[default]
    None,
    /// Spread the delay by up to ± the given fraction of itself.
    Proportional(f64),
    /// Pick uniformly between zero and the computed delay.
    Full,
    /// Pick between the computed delay and three times the previous one.
    Decorrelated,
}

impl Backoff {
    /// Wait `delay` before every retry.
    ///
    /// ```rust
    /// use eddy::Backoff;
    /// use std::time::Duration;
    ///
    /// let backoff = Backoff::constant(Duration::from_millis(500))
    ///     .with_max_retries(3);
    ///
    /// assert_eq!(backoff.delay_for_attempt(0), Some(Duration::from_millis(500)));
    /// assert_eq!(backoff.delay_for_attempt(2), Some(Duration::from_millis(500)));
    /// assert_eq!(backoff.delay_for_attempt(3), None);
    /// ```
    pub fn constant(delay: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Constant(delay))
    }

    /// Linearly increasing delay: base * (attempt + 1).
    pub fn linear(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Linear { base })
    }

    /// Exponentially increasing delay: base * 2^attempt.
    ///
    /// ```rust
    /// use eddy::Backoff;
    /// use std::time::Duration;
    ///
    /// let backoff = Backoff::exponential(Duration::from_millis(100));
    ///
    /// assert_eq!(backoff.delay_for_attempt(0), Some(Duration::from_millis(100)));
    /// assert_eq!(backoff.delay_for_attempt(1), Some(Duration::from_millis(200)));
    /// assert_eq!(backoff.delay_for_attempt(2), Some(Duration::from_millis(400)));
    /// ```
    pub fn exponential(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Exponential { base })
    }

    /// Fibonacci delay: base * fib(attempt + 1).
    pub fn fibonacci(base: Duration) -> Self {
        Self::with_strategy(RetryStrategy::Fibonacci { base })
    }

    fn with_strategy(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            max_retries: None,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    /// Stop after `n` retries.
    ///
    /// This does not include the initial attempt: `with_max_retries(3)`
    /// means up to 4 executions. Without it the schedule never ends.
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Cap every delay, regardless of the strategy.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = Some(d);
        self
    }

    /// Add ±`factor` proportional jitter (clamped to `0.0..=1.0`).
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter = JitterStrategy::Proportional(factor.clamp(0.0, 1.0));
        self
    }

    /// Use full jitter: a random delay between 0 and the calculated delay.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Use decorrelated jitter: random between base and 3x the previous delay.
    pub fn with_decorrelated_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Decorrelated;
        self
    }

    /// Retry limit, if any.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Delay cap, if any.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Jitter applied to each delay.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// Growth curve of the schedule.
    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// Delay before retry `attempt` (0-indexed), without jitter.
    ///
    /// Returns `None` once `max_retries` is exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_retries {
            if attempt >= max {
                return None;
            }
        }

        let base_delay = match &self.strategy {
            RetryStrategy::Constant(d) => *d,
            RetryStrategy::Linear { base } => base.saturating_mul(attempt.saturating_add(1)),
            RetryStrategy::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(attempt))
            }
            RetryStrategy::Fibonacci { base } => {
                base.saturating_mul(fibonacci(attempt.saturating_add(1)))
            }
        };

        Some(match self.max_delay {
            Some(max) => base_delay.min(max),
            None => base_delay,
        })
    }

    /// Delay before retry `attempt` with jitter applied.
    pub fn delay_with_jitter(&self, attempt: u32, prev_delay: Option<Duration>) -> Option<Duration> {
        let base_delay = self.delay_for_attempt(attempt)?;
        Some(self.jitter.apply(base_delay, prev_delay, self.max_delay))
    }

    /// Retry every failure on this schedule, giving up when it ends.
    pub fn into_policy<E: 'static>(self) -> RetryPolicy<E> {
        RetryPolicy::stateful(move || {
            let backoff = self.clone();
            let mut prev_delay = None;
            move |_: &E, attempt: u32| {
                match backoff.delay_with_jitter(attempt.saturating_sub(1), prev_delay) {
                    Some(delay) => {
                        prev_delay = Some(delay);
                        RetryDecision::Retry(delay)
                    }
                    None => RetryDecision::GiveUp,
                }
            }
        })
    }
}

impl JitterStrategy {
    /// Apply jitter to `base_delay`, then cap the result at `max_delay`.
    ///
    /// `prev_delay` is only used by decorrelated jitter.
    pub fn apply(
        &self,
        base_delay: Duration,
        prev_delay: Option<Duration>,
        max_delay: Option<Duration>,
    ) -> Duration {
        let mut rng = rand::rng();
        let jittered = match self {
            JitterStrategy::None => base_delay,
            JitterStrategy::Proportional(factor) => {
                let base_millis = base_delay.as_millis() as f64;
                let jitter_range = base_millis * factor;
                let min = (base_millis - jitter_range).max(0.0);
                let max = base_millis + jitter_range;
                Duration::from_millis(rng.random_range(min..=max) as u64)
            }
            JitterStrategy::Full => {
                let max_millis = base_delay.as_millis() as u64;
                if max_millis == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rng.random_range(0..=max_millis))
                }
            }
            JitterStrategy::Decorrelated => {
                let prev = prev_delay.unwrap_or(base_delay);
                let base_millis = base_delay.as_millis() as u64;
                let max_millis = prev.as_millis().saturating_mul(3) as u64;
                if max_millis <= base_millis {
                    base_delay
                } else {
                    Duration::from_millis(rng.random_range(base_millis..=max_millis))
                }
            }
        };

        match max_delay {
            Some(max) => jittered.min(max),
            None => jittered,
        }
    }
}

/// `n`-th Fibonacci number with `fibonacci(1) == 1`, saturating at `u32::MAX`.
fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let mut a = 0u32;
    let mut b = 1u32;
    for _ in 1..n {
        let temp = a.saturating_add(b);
        a = b;
        b = temp;
    }
    b
}

#[cfg(test)]
mod backoff_tests {
    use super::*;
    use proptest::prelude::*;

    fn millis(ms: u64) -> Option<Duration> {
        Some(Duration::from_millis(ms))
    }

    #[test]
    fn constant_schedule_stops_at_the_limit() {
        let backoff = Backoff::constant(Duration::from_millis(100)).with_max_retries(3);

        assert_eq!(backoff.delay_for_attempt(0), millis(100));
        assert_eq!(backoff.delay_for_attempt(1), millis(100));
        assert_eq!(backoff.delay_for_attempt(2), millis(100));
        assert_eq!(backoff.delay_for_attempt(3), None);
    }

    #[test]
    fn linear_schedule_grows_by_base() {
        let backoff = Backoff::linear(Duration::from_millis(100));

        assert_eq!(backoff.delay_for_attempt(0), millis(100));
        assert_eq!(backoff.delay_for_attempt(1), millis(200));
        assert_eq!(backoff.delay_for_attempt(3), millis(400));
    }

    #[test]
    fn exponential_schedule_doubles() {
        let backoff = Backoff::exponential(Duration::from_millis(100)).with_max_retries(5);

        assert_eq!(backoff.delay_for_attempt(0), millis(100));
        assert_eq!(backoff.delay_for_attempt(1), millis(200));
        assert_eq!(backoff.delay_for_attempt(2), millis(400));
        assert_eq!(backoff.delay_for_attempt(3), millis(800));
    }

    #[test]
    fn fibonacci_schedule_scales_base() {
        let backoff = Backoff::fibonacci(Duration::from_millis(100));

        assert_eq!(backoff.delay_for_attempt(0), millis(100));
        assert_eq!(backoff.delay_for_attempt(1), millis(100));
        assert_eq!(backoff.delay_for_attempt(2), millis(200));
        assert_eq!(backoff.delay_for_attempt(3), millis(300));
        assert_eq!(backoff.delay_for_attempt(4), millis(500));
        assert_eq!(backoff.delay_for_attempt(5), millis(800));
    }

    #[test]
    fn max_delay_caps_every_strategy() {
        let backoff = Backoff::exponential(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(backoff.delay_for_attempt(2), millis(400));
        assert_eq!(backoff.delay_for_attempt(3), millis(500));
        assert_eq!(backoff.delay_for_attempt(40), millis(500));
    }

    #[test]
    fn unbounded_schedule_never_ends() {
        let backoff = Backoff::constant(Duration::from_millis(1));
        assert_eq!(backoff.delay_for_attempt(u32::MAX - 1), millis(1));
    }

    #[test]
    fn fibonacci_numbers() {
        let fibs: Vec<_> = (0..8).map(fibonacci).collect();
        assert_eq!(fibs, vec![0, 1, 1, 2, 3, 5, 8, 13]);
    }

    #[test]
    fn no_jitter_keeps_the_delay() {
        let base = Duration::from_millis(100);
        assert_eq!(JitterStrategy::None.apply(base, None, None), base);
        assert_eq!(JitterStrategy::default(), JitterStrategy::None);
    }

    #[test]
    fn accessors_reflect_builders() {
        let backoff = Backoff::exponential(Duration::from_millis(100))
            .with_max_retries(3)
            .with_max_delay(Duration::from_secs(5))
            .with_jitter(0.25);

        assert_eq!(backoff.max_retries(), Some(3));
        assert_eq!(backoff.max_delay(), Some(Duration::from_secs(5)));
        assert!(matches!(backoff.jitter(), JitterStrategy::Proportional(_)));
        assert!(matches!(
            backoff.strategy(),
            RetryStrategy::Exponential { .. }
        ));
    }

    #[test]
    fn into_policy_follows_schedule_then_gives_up() {
        let policy = Backoff::linear(Duration::from_millis(10))
            .with_max_retries(2)
            .into_policy::<()>();
        let mut session = policy.start();

        assert_eq!(session.next_decision(&()), RetryDecision::Retry(Duration::from_millis(10)));
        assert_eq!(session.next_decision(&()), RetryDecision::Retry(Duration::from_millis(20)));
        assert_eq!(session.next_decision(&()), RetryDecision::GiveUp);
    }

    proptest! {
        #[test]
        fn full_jitter_stays_below_base(base_ms in 0u64..10_000) {
            let base = Duration::from_millis(base_ms);
            let jittered = JitterStrategy::Full.apply(base, None, None);
            prop_assert!(jittered <= base);
        }

        #[test]
        fn proportional_jitter_stays_in_band(base_ms in 0u64..10_000, factor in 0.0f64..=1.0) {
            let base = Duration::from_millis(base_ms);
            let jittered = JitterStrategy::Proportional(factor).apply(base, None, None);
            let spread = (base_ms as f64 * factor).ceil() as u64;
            prop_assert!(jittered.as_millis() as u64 <= base_ms + spread);
            prop_assert!(jittered.as_millis() as u64 + spread + 1 >= base_ms);
        }

        #[test]
        fn jitter_respects_max_delay(base_ms in 0u64..10_000, cap_ms in 0u64..5_000) {
            let cap = Duration::from_millis(cap_ms);
            let jittered = JitterStrategy::Decorrelated.apply(
                Duration::from_millis(base_ms),
                Some(Duration::from_millis(base_ms * 2)),
                Some(cap),
            );
            prop_assert!(jittered <= cap);
        }
    }
}
