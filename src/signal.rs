//! Completion signals written by producers of asynchronous results.
//!
//! A single-result producer finishes with exactly one [`Completion`]. A
//! streaming producer writes any number of [`Signal::Next`] values followed by
//! exactly one terminal signal ([`Signal::Complete`] or [`Signal::Failure`]).

/// Outcome of a single-result operation.
///
/// `Empty` is a successful outcome, not an error: an operation that looks up a
/// key which does not exist resolves with `Empty`.
///
/// # Example
///
/// ```rust
/// use eddy::Completion;
///
/// let found: Completion<i32, String> = Completion::Value(7);
/// assert_eq!(found.into_result(), Ok(Some(7)));
///
/// let missing: Completion<i32, String> = Completion::Empty;
/// assert_eq!(missing.into_result(), Ok(None));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T, E> {
    /// The operation produced a value.
    Value(T),
    /// The operation succeeded without a value.
    Empty,
    /// The operation failed.
    Failure(E),
}

impl<T, E> Completion<T, E> {
    /// Returns true for `Value` and `Empty`.
    pub fn is_success(&self) -> bool {
        !self.is_failure()
    }

    /// Returns true for `Failure`.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Convert into the `Result<Option<T>, E>` shape containers resolve to.
    pub fn into_result(self) -> Result<Option<T>, E> {
        match self {
            Self::Value(value) => Ok(Some(value)),
            Self::Empty => Ok(None),
            Self::Failure(error) => Err(error),
        }
    }
}

impl<T, E> From<Result<Option<T>, E>> for Completion<T, E> {
    fn from(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(Some(value)) => Self::Value(value),
            Ok(None) => Self::Empty,
            Err(error) => Self::Failure(error),
        }
    }
}

impl<T, E> From<Option<T>> for Completion<T, E> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Value(value),
            None => Self::Empty,
        }
    }
}

/// One event of a streaming operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<T, E> {
    /// The next value of the sequence.
    Next(T),
    /// Terminal: the sequence finished successfully.
    Complete,
    /// Terminal: the sequence failed.
    Failure(E),
}

impl<T, E> Signal<T, E> {
    /// Returns true for `Complete` and `Failure`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_into_result() {
        assert_eq!(Completion::<_, String>::Value(1).into_result(), Ok(Some(1)));
        assert_eq!(Completion::<i32, String>::Empty.into_result(), Ok(None));
        assert_eq!(
            Completion::<i32, _>::Failure("boom").into_result(),
            Err("boom")
        );
    }

    #[test]
    fn completion_from_result_roundtrips_each_shape() {
        let value: Completion<i32, &str> = Ok(Some(3)).into();
        assert_eq!(value, Completion::Value(3));
        let empty: Completion<i32, &str> = Ok(None).into();
        assert_eq!(empty, Completion::Empty);
        let failed: Completion<i32, &str> = Err("x").into();
        assert!(failed.is_failure());
        assert!(!failed.is_success());
    }

    #[test]
    fn empty_is_a_success() {
        assert!(Completion::<i32, String>::Empty.is_success());
        assert_eq!(Completion::<i32, String>::from(None), Completion::Empty);
    }

    #[test]
    fn signal_terminality() {
        assert!(!Signal::<_, String>::Next(1).is_terminal());
        assert!(Signal::<i32, String>::Complete.is_terminal());
        assert!(Signal::<i32, _>::Failure("e").is_terminal());
    }
}
