//! The listener-based client contract.

use std::collections::BTreeMap;

use crate::client::listener::{Listener, SequenceListener};
use crate::client::policy::{
    BatchPolicy, ClientPolicies, InfoPolicy, Policy, QueryPolicy, ScanPolicy, WritePolicy,
};
use crate::client::types::{
    AbortStatus, BatchRead, BatchResults, Bin, CommitStatus, IndexSpec, Key, KeyExists,
    KeyObject, KeyRecord, KeysExists, KeysRecords, Node, Operation, Statement, Txn, Value,
};

/// Boxed single-outcome listener.
pub type BoxListener<T> = Box<dyn Listener<T>>;

/// Boxed sequence listener.
pub type BoxSequenceListener<T> = Box<dyn SequenceListener<T>>;

/// An asynchronous client that reports completions through listeners.
///
/// Implementations start the operation and return immediately. Every
/// listener receives exactly one terminal call, from any thread. Policies are
/// already resolved against the client's defaults.
///
/// Missing records are not failures at this level: reads report a
/// [`KeyRecord`] without record and `exists`/`delete` report a
/// [`KeyExists`] flag.
pub trait CallbackClient: Send + Sync + 'static {
    /// Defaults used when a caller passes no policy.
    fn policies(&self) -> &ClientPolicies;

    /// Read a record, optionally restricted to `bin_names`.
    fn get(&self, policy: &Policy, key: &Key, bin_names: Option<&[String]>, listener: BoxListener<KeyRecord>);

    /// Read a record's metadata.
    fn get_header(&self, policy: &Policy, key: &Key, listener: BoxListener<KeyRecord>);

    /// Read several records, optionally applying read `operations` to each.
    fn get_batch(
        &self,
        policy: &BatchPolicy,
        keys: &[Key],
        operations: Option<&[Operation]>,
        listener: BoxListener<KeysRecords>,
    );

    /// Read the metadata of several records.
    fn get_headers(&self, policy: &BatchPolicy, keys: &[Key], listener: BoxListener<KeysRecords>);

    /// Heterogeneous batch read.
    fn get_batch_reads(&self, policy: &BatchPolicy, records: &[BatchRead], listener: BoxListener<Vec<BatchRead>>);

    /// Read several records, reporting each as it arrives.
    fn get_sequence(
        &self,
        policy: &BatchPolicy,
        keys: &[Key],
        operations: Option<&[Operation]>,
        listener: BoxSequenceListener<KeyRecord>,
    );

    /// Heterogeneous batch read, reporting each entry as it arrives.
    fn get_batch_reads_sequence(
        &self,
        policy: &BatchPolicy,
        records: &[BatchRead],
        listener: BoxSequenceListener<BatchRead>,
    );

    /// Check whether a record exists.
    fn exists(&self, policy: &Policy, key: &Key, listener: BoxListener<KeyExists>);

    /// Check several keys.
    fn exists_batch(&self, policy: &BatchPolicy, keys: &[Key], listener: BoxListener<KeysExists>);

    /// Check several keys, reporting each as it arrives.
    fn exists_sequence(&self, policy: &BatchPolicy, keys: &[Key], listener: BoxSequenceListener<KeyExists>);

    /// Write bins.
    fn put(&self, policy: &WritePolicy, key: &Key, bins: &[Bin], listener: BoxListener<Key>);

    /// Append to string bins.
    fn append(&self, policy: &WritePolicy, key: &Key, bins: &[Bin], listener: BoxListener<Key>);

    /// Prepend to string bins.
    fn prepend(&self, policy: &WritePolicy, key: &Key, bins: &[Bin], listener: BoxListener<Key>);

    /// Add to integer bins.
    fn add(&self, policy: &WritePolicy, key: &Key, bins: &[Bin], listener: BoxListener<Key>);

    /// Delete a record; the flag reports whether it existed.
    fn delete(&self, policy: &WritePolicy, key: &Key, listener: BoxListener<KeyExists>);

    /// Delete several records.
    fn delete_batch(&self, policy: &BatchPolicy, keys: &[Key], listener: BoxListener<BatchResults>);

    /// Reset a record's expiration.
    fn touch(&self, policy: &WritePolicy, key: &Key, listener: BoxListener<Key>);

    /// Apply several operations to one record atomically.
    fn operate(&self, policy: &WritePolicy, key: &Key, operations: &[Operation], listener: BoxListener<KeyRecord>);

    /// Commit a transaction.
    fn commit(&self, txn: &Txn, listener: BoxListener<CommitStatus>);

    /// Abort a transaction.
    fn abort(&self, txn: &Txn, listener: BoxListener<AbortStatus>);

    /// Run a secondary-index query.
    fn query(&self, policy: &QueryPolicy, statement: &Statement, listener: BoxSequenceListener<KeyRecord>);

    /// Scan a whole set.
    fn scan_all(
        &self,
        policy: &ScanPolicy,
        namespace: &str,
        set: &str,
        bin_names: &[String],
        listener: BoxSequenceListener<KeyRecord>,
    );

    /// Call a server-side function on one record.
    fn execute(
        &self,
        policy: &WritePolicy,
        key: &Key,
        package: &str,
        function: &str,
        args: &[Value],
        listener: BoxListener<KeyObject>,
    );

    /// Send info commands to a node.
    fn info(
        &self,
        policy: &InfoPolicy,
        node: &Node,
        commands: &[String],
        listener: BoxListener<BTreeMap<String, String>>,
    );

    /// Create a secondary index.
    fn create_index(&self, policy: &Policy, index: &IndexSpec, listener: BoxListener<()>);

    /// Drop a secondary index.
    fn drop_index(&self, policy: &Policy, namespace: &str, set: &str, index_name: &str, listener: BoxListener<()>);
}
