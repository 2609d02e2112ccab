//! Client failures and the retry policy tuned for them.

use std::fmt;

use crate::retry::{retry_if, RetryPolicy};
use crate::sink::SinkError;

/// Category of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The connection pool to a node is exhausted.
    NoMoreConnections,
    /// Connecting to or talking with a node failed.
    Connection,
    /// The command ran out of time.
    Timeout,
    /// The record does not exist.
    KeyNotFound,
    /// The server rejected the command with a result code.
    Server(i32),
    /// The request was malformed.
    InvalidRequest,
    /// A transaction commit failed.
    Commit,
    /// The callback client dropped the listener without answering.
    Abandoned,
    /// The caller cancelled the operation or stopped consuming its results.
    Cancelled,
    /// A listener was called again after it had already completed.
    Terminated,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NoMoreConnections => write!(f, "no more connections"),
            ErrorKind::Connection => write!(f, "connection error"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::KeyNotFound => write!(f, "key not found"),
            ErrorKind::Server(code) => write!(f, "server error {}", code),
            ErrorKind::InvalidRequest => write!(f, "invalid request"),
            ErrorKind::Commit => write!(f, "commit failed"),
            ErrorKind::Abandoned => write!(f, "operation abandoned"),
            ErrorKind::Cancelled => write!(f, "operation cancelled"),
            ErrorKind::Terminated => write!(f, "operation already completed"),
        }
    }
}

/// A failed client operation.
///
/// # Example
///
/// ```rust
/// use eddy::client::{ClientError, ErrorKind};
///
/// let error = ClientError::timeout(true);
/// assert_eq!(error.kind, ErrorKind::Timeout);
/// assert!(error.in_doubt);
/// assert_eq!(error.to_string(), "timeout (in doubt)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Detail, possibly empty.
    pub message: String,
    /// A write may have been applied even though the call failed.
    pub in_doubt: bool,
}

impl ClientError {
    /// Create an error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            in_doubt: false,
        }
    }

    /// Connection pool exhausted.
    pub fn no_more_connections() -> Self {
        Self::new(ErrorKind::NoMoreConnections, "")
    }

    /// Timeout, flagged in doubt if a write may have happened.
    pub fn timeout(in_doubt: bool) -> Self {
        Self {
            in_doubt,
            ..Self::new(ErrorKind::Timeout, "")
        }
    }

    /// Mark the error as in doubt.
    pub fn in_doubt(mut self) -> Self {
        self.in_doubt = true;
        self
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if self.in_doubt {
            write!(f, " (in doubt)")?;
        }
        Ok(())
    }
}

impl std::error::Error for ClientError {}

impl From<SinkError> for ClientError {
    fn from(error: SinkError) -> Self {
        let kind = match error {
            SinkError::Abandoned => ErrorKind::Abandoned,
            SinkError::Cancelled => ErrorKind::Cancelled,
            SinkError::Terminated => ErrorKind::Terminated,
        };
        Self::new(kind, error.to_string())
    }
}

/// Retry only [`ErrorKind::NoMoreConnections`], with the default jittered
/// growing delay of [`retry_if`]. Everything else fails immediately.
///
/// ```rust
/// use eddy::client::{retry_on_no_more_connections, ClientError};
///
/// let mut session = retry_on_no_more_connections().start();
/// assert!(session.next_decision(&ClientError::no_more_connections()).is_retry());
/// assert!(session.next_decision(&ClientError::timeout(false)).is_give_up());
/// ```
pub fn retry_on_no_more_connections() -> RetryPolicy<ClientError> {
    retry_if(|error: &ClientError| error.kind == ErrorKind::NoMoreConnections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let error = ClientError::new(ErrorKind::Server(22), "forbidden");
        assert_eq!(error.to_string(), "server error 22: forbidden");
    }

    #[test]
    fn sink_errors_keep_their_kind() {
        let error = ClientError::from(SinkError::Abandoned);
        assert_eq!(error.kind, ErrorKind::Abandoned);
        assert!(!error.in_doubt);

        assert_eq!(ClientError::from(SinkError::Cancelled).kind, ErrorKind::Cancelled);
        assert_eq!(ClientError::from(SinkError::Terminated).kind, ErrorKind::Terminated);
    }

    #[test]
    fn no_more_connections_policy_ignores_other_kinds() {
        let policy = retry_on_no_more_connections();
        for kind in [
            ErrorKind::Connection,
            ErrorKind::Timeout,
            ErrorKind::KeyNotFound,
            ErrorKind::Server(1),
            ErrorKind::Abandoned,
            ErrorKind::Cancelled,
        ] {
            assert!(policy
                .start()
                .next_decision(&ClientError::new(kind, ""))
                .is_give_up());
        }
    }
}
