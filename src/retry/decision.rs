//! The per-failure output of a retry policy.

use std::time::Duration;

/// What to do after a failed attempt.
///
/// # Examples
///
/// ```rust
/// use eddy::RetryDecision;
/// use std::time::Duration;
///
/// let retry: RetryDecision = Some(Duration::from_millis(5)).into();
/// assert_eq!(retry.delay(), Some(Duration::from_millis(5)));
///
/// let stop: RetryDecision = None.into();
/// assert!(stop.is_give_up());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryDecision {
    /// Wait for the delay, then run the whole operation again.
    Retry(Duration),
    /// Stop and hand the failure to the caller unchanged.
    GiveUp,
}

impl RetryDecision {
    /// Retry without waiting.
    pub const IMMEDIATELY: Self = Self::Retry(Duration::ZERO);

    /// Returns true for `Retry`.
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    /// Returns true for `GiveUp`.
    pub fn is_give_up(&self) -> bool {
        matches!(self, Self::GiveUp)
    }

    /// The delay before the next attempt, if retrying.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Retry(delay) => Some(*delay),
            Self::GiveUp => None,
        }
    }
}

impl From<Option<Duration>> for RetryDecision {
    fn from(delay: Option<Duration>) -> Self {
        match delay {
            Some(delay) => Self::Retry(delay),
            None => Self::GiveUp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_accessors() {
        let retry = RetryDecision::Retry(Duration::from_millis(3));
        assert!(retry.is_retry());
        assert!(!retry.is_give_up());
        assert_eq!(retry.delay(), Some(Duration::from_millis(3)));

        assert!(RetryDecision::GiveUp.is_give_up());
        assert_eq!(RetryDecision::GiveUp.delay(), None);
        assert_eq!(RetryDecision::IMMEDIATELY.delay(), Some(Duration::ZERO));
    }

    #[test]
    fn from_option() {
        assert_eq!(
            RetryDecision::from(Some(Duration::from_secs(1))),
            RetryDecision::Retry(Duration::from_secs(1))
        );
        assert_eq!(RetryDecision::from(None), RetryDecision::GiveUp);
    }
}
