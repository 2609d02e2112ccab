//! Per-call policies and the client's defaults.
//!
//! Every client method takes `Option<&P>`; `None` means "use the client's
//! default", which comes from [`ClientPolicies`].
//!
//! The `max_retries` fields below are the underlying client's own
//! transport-level retries. Retries of whole operations are configured with a
//! [`RetryPolicy`](crate::RetryPolicy) on a
//! [`RetryClient`](crate::client::RetryClient).

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Base policy for reads and other single-record commands.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Policy {
    /// Total time budget for the command, zero for none.
    pub total_timeout: Duration,
    /// Time budget for each socket operation, zero for none.
    pub socket_timeout: Duration,
    /// Transport-level retries inside the underlying client.
    pub max_retries: u32,
    /// Pause between transport-level retries.
    pub sleep_between_retries: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(1),
            socket_timeout: Duration::from_secs(30),
            max_retries: 2,
            sleep_between_retries: Duration::ZERO,
        }
    }
}

/// Policy for writes.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WritePolicy {
    /// Shared command settings.
    pub base: Policy,
    /// Expected generation, zero to skip the check.
    pub generation: u32,
    /// Record time-to-live in seconds, zero for the namespace default.
    pub expiration: u32,
    /// Store the user key alongside the record.
    pub send_key: bool,
    /// Leave a tombstone on delete.
    pub durable_delete: bool,
}

/// Policy for batch commands.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatchPolicy {
    /// Shared command settings.
    pub base: Policy,
    /// Maximum nodes contacted in parallel, zero for all.
    pub max_concurrent_nodes: u32,
    /// Allow the server to process keys inline.
    pub allow_inline: bool,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            base: Policy::default(),
            max_concurrent_nodes: 1,
            allow_inline: true,
        }
    }
}

/// Policy for secondary-index queries.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QueryPolicy {
    /// Shared command settings.
    pub base: Policy,
    /// Stop after this many records, zero for no limit.
    pub max_records: u64,
    /// Throttle, zero for none.
    pub records_per_second: u32,
}

/// Policy for full scans.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScanPolicy {
    /// Shared command settings.
    pub base: Policy,
    /// Stop after this many records, zero for no limit.
    pub max_records: u64,
    /// Throttle, zero for none.
    pub records_per_second: u32,
    /// Scan nodes in parallel.
    pub concurrent_nodes: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            base: Policy::default(),
            max_records: 0,
            records_per_second: 0,
            concurrent_nodes: true,
        }
    }
}

/// Policy for info commands.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InfoPolicy {
    /// Time budget for the command.
    pub timeout: Duration,
}

impl Default for InfoPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
        }
    }
}

/// Default policies a client falls back to when a call passes `None`.
///
/// # Example
///
/// ```rust
/// use eddy::client::{ClientPolicies, Policy};
/// use std::time::Duration;
///
/// let mut defaults = ClientPolicies::default();
/// defaults.read.total_timeout = Duration::from_millis(250);
///
/// let custom = Policy::default();
/// assert_eq!(defaults.read_or(None).total_timeout, Duration::from_millis(250));
/// assert_eq!(defaults.read_or(Some(&custom)).total_timeout, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientPolicies {
    /// Default for reads.
    pub read: Policy,
    /// Default for writes.
    pub write: WritePolicy,
    /// Default for batch commands.
    pub batch: BatchPolicy,
    /// Default for queries.
    pub query: QueryPolicy,
    /// Default for scans.
    pub scan: ScanPolicy,
    /// Default for info commands.
    pub info: InfoPolicy,
}

impl ClientPolicies {
    /// `policy`, or the read default.
    pub fn read_or(&self, policy: Option<&Policy>) -> Policy {
        policy.unwrap_or(&self.read).clone()
    }

    /// `policy`, or the write default.
    pub fn write_or(&self, policy: Option<&WritePolicy>) -> WritePolicy {
        policy.unwrap_or(&self.write).clone()
    }

    /// `policy`, or the batch default.
    pub fn batch_or(&self, policy: Option<&BatchPolicy>) -> BatchPolicy {
        policy.unwrap_or(&self.batch).clone()
    }

    /// `policy`, or the query default.
    pub fn query_or(&self, policy: Option<&QueryPolicy>) -> QueryPolicy {
        policy.unwrap_or(&self.query).clone()
    }

    /// `policy`, or the scan default.
    pub fn scan_or(&self, policy: Option<&ScanPolicy>) -> ScanPolicy {
        policy.unwrap_or(&self.scan).clone()
    }

    /// `policy`, or the info default.
    pub fn info_or(&self, policy: Option<&InfoPolicy>) -> InfoPolicy {
        policy.unwrap_or(&self.info).clone()
    }
}
