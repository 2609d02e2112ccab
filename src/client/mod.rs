//! A data-service client surface built on the adapters and retry decorators.
//!
//! The layers stack like this:
//!
//! - [`CallbackClient`]: the underlying asynchronous client, reporting
//!   through [`Listener`]s and [`SequenceListener`]s
//! - [`ReactiveClient`]: adapts it into the [`DataClient`] surface, where
//!   every operation returns a lazy [`Single`](crate::Single) or
//!   [`Streaming`](crate::Streaming)
//! - [`RetryClient`]: wraps any [`DataClient`] and retries every operation
//!   with one [`RetryPolicy`](crate::RetryPolicy)
//!
//! ```rust
//! use eddy::client::{retry_on_no_more_connections, ReactiveClient, RetryClient};
//! use eddy::testing::ScriptedClient;
//!
//! let client = RetryClient::wrap(
//!     ReactiveClient::new(ScriptedClient::new()),
//!     retry_on_no_more_connections(),
//! );
//! # let _ = client;
//! ```

mod callback;
mod error;
mod listener;
mod policy;
mod reactive;
mod retrying;
mod types;

pub use callback::{BoxListener, BoxSequenceListener, CallbackClient};
pub use error::{retry_on_no_more_connections, ClientError, ErrorKind};
pub use listener::{Listener, SequenceListener, SequenceSinkListener, SingleListener};
pub use policy::{
    BatchPolicy, ClientPolicies, InfoPolicy, Policy, QueryPolicy, ScanPolicy, WritePolicy,
};
pub use reactive::{ClientSingle, ClientStreaming, DataClient, ReactiveClient};
pub use retrying::RetryClient;
pub use types::{
    AbortStatus, BatchRead, BatchResults, Bin, CommitStatus, IndexCollectionType, IndexSpec,
    IndexType, Key, KeyExists, KeyObject, KeyRecord, KeysExists, KeysRecords, Node, Operation,
    Record, Statement, Txn, Value,
};
