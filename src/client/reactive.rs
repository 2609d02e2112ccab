//! The container-returning client surface and its callback-backed
//! implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::adapter::{Single, Streaming};
use crate::client::callback::CallbackClient;
use crate::client::error::ClientError;
use crate::client::listener::{Listener, SequenceSinkListener, SingleListener};
use crate::client::policy::{
    BatchPolicy, ClientPolicies, InfoPolicy, Policy, QueryPolicy, ScanPolicy, WritePolicy,
};
use crate::client::types::{
    AbortStatus, BatchRead, BatchResults, Bin, CommitStatus, IndexSpec, Key, KeyExists,
    KeyObject, KeyRecord, KeysExists, KeysRecords, Node, Operation, Statement, Txn, Value,
};
use crate::sink::{SingleSink, StreamSink};

/// A lazy single-result client call.
pub type ClientSingle<T> = Single<T, ClientError>;

/// A lazy streaming client call.
pub type ClientStreaming<T> = Streaming<T, ClientError>;

/// Operations of a data-service client, as lazy containers.
///
/// Nothing is sent until the returned container is subscribed, and every
/// subscription sends the request again. Passing `None` as policy uses the
/// matching default from [`policies`](DataClient::policies).
///
/// Reads of a missing record, `exists` of a missing key and `delete` of a
/// missing record succeed without a value.
///
/// # Example
///
/// ```rust
/// use eddy::client::{Bin, DataClient, Key, ReactiveClient};
/// use eddy::testing::ScriptedClient;
///
/// # tokio_test::block_on(async {
/// let client = ReactiveClient::new(ScriptedClient::new());
/// let key = Key::new("test", "users", "ada");
///
/// assert_eq!(client.exists(None, &key).await, Ok(None));
/// client.put(None, &key, &[Bin::new("age", 36)]).await.unwrap();
/// assert_eq!(client.exists(None, &key).await, Ok(Some(key.clone())));
/// # });
/// ```
pub trait DataClient: Send + Sync {
    /// Defaults used when a call passes no policy.
    fn policies(&self) -> &ClientPolicies;

    /// Read all bins of a record.
    fn get(&self, policy: Option<&Policy>, key: &Key) -> ClientSingle<KeyRecord>;

    /// Read selected bins of a record.
    fn get_bins(&self, policy: Option<&Policy>, key: &Key, bin_names: &[&str]) -> ClientSingle<KeyRecord>;

    /// Read a record's metadata.
    fn get_header(&self, policy: Option<&Policy>, key: &Key) -> ClientSingle<KeyRecord>;

    /// Read several records.
    fn get_batch(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<KeysRecords>;

    /// Read several records, applying read `operations` to each.
    fn get_batch_ops(
        &self,
        policy: Option<&BatchPolicy>,
        keys: &[Key],
        operations: &[Operation],
    ) -> ClientSingle<KeysRecords>;

    /// Read the metadata of several records.
    fn get_headers(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<KeysRecords>;

    /// Heterogeneous batch read.
    fn get_batch_reads(&self, policy: Option<&BatchPolicy>, records: &[BatchRead]) -> ClientSingle<Vec<BatchRead>>;

    /// Read several records as a stream.
    fn get_flux(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientStreaming<KeyRecord>;

    /// Read several records as a stream, applying read `operations` to each.
    fn get_flux_ops(
        &self,
        policy: Option<&BatchPolicy>,
        keys: &[Key],
        operations: &[Operation],
    ) -> ClientStreaming<KeyRecord>;

    /// Heterogeneous batch read as a stream.
    fn get_batch_reads_flux(&self, policy: Option<&BatchPolicy>, records: &[BatchRead]) -> ClientStreaming<BatchRead>;

    /// The key if its record exists, otherwise empty.
    fn exists(&self, policy: Option<&Policy>, key: &Key) -> ClientSingle<Key>;

    /// Existence flags of several keys.
    fn exists_batch(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<KeysExists>;

    /// Existence flags of several keys as a stream.
    fn exists_flux(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientStreaming<KeyExists>;

    /// Write bins.
    fn put(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key>;

    /// Append to string bins.
    fn append(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key>;

    /// Prepend to string bins.
    fn prepend(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key>;

    /// Add to integer bins.
    fn add(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key>;

    /// Delete a record; empty if it did not exist.
    fn delete(&self, policy: Option<&WritePolicy>, key: &Key) -> ClientSingle<Key>;

    /// Delete several records.
    fn delete_batch(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<BatchResults>;

    /// Reset a record's expiration.
    fn touch(&self, policy: Option<&WritePolicy>, key: &Key) -> ClientSingle<Key>;

    /// Apply several operations to one record atomically.
    fn operate(&self, policy: Option<&WritePolicy>, key: &Key, operations: &[Operation]) -> ClientSingle<KeyRecord>;

    /// Commit a transaction.
    fn commit(&self, txn: &Txn) -> ClientSingle<CommitStatus>;

    /// Abort a transaction.
    fn abort(&self, txn: &Txn) -> ClientSingle<AbortStatus>;

    /// Run a secondary-index query.
    fn query(&self, policy: Option<&QueryPolicy>, statement: &Statement) -> ClientStreaming<KeyRecord>;

    /// Scan a whole set.
    fn scan_all(
        &self,
        policy: Option<&ScanPolicy>,
        namespace: &str,
        set: &str,
        bin_names: &[&str],
    ) -> ClientStreaming<KeyRecord>;

    /// Call a server-side function on one record.
    fn execute(
        &self,
        policy: Option<&WritePolicy>,
        key: &Key,
        package: &str,
        function: &str,
        args: &[Value],
    ) -> ClientSingle<KeyObject>;

    /// Send one info command; empty if the node returned no answer for it.
    fn info(&self, policy: Option<&InfoPolicy>, node: &Node, command: &str) -> ClientSingle<String>;

    /// Send several info commands.
    fn info_many(
        &self,
        policy: Option<&InfoPolicy>,
        node: &Node,
        commands: &[&str],
    ) -> ClientSingle<BTreeMap<String, String>>;

    /// Create a secondary index. Succeeds without value.
    fn create_index(&self, policy: Option<&Policy>, index: &IndexSpec) -> ClientSingle<()>;

    /// Drop a secondary index. Succeeds without value.
    fn drop_index(&self, policy: Option<&Policy>, namespace: &str, set: &str, index_name: &str) -> ClientSingle<()>;
}

/// [`DataClient`] over a [`CallbackClient`].
///
/// Each subscription starts one callback operation with a listener bridged
/// to the subscription's sink.
pub struct ReactiveClient<C> {
    client: Arc<C>,
}

impl<C: CallbackClient> ReactiveClient<C> {
    /// Adapt `client`.
    pub fn new(client: C) -> Self {
        Self::from_arc(Arc::new(client))
    }

    /// Adapt a shared `client`.
    pub fn from_arc(client: Arc<C>) -> Self {
        Self { client }
    }

    /// The underlying callback client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    fn single<T, F>(&self, operation: &'static str, start: F) -> ClientSingle<T>
    where
        T: Send + 'static,
        F: Fn(&C, SingleSink<T, ClientError>) + Send + Sync + 'static,
    {
        let client = Arc::clone(&self.client);
        Single::create(move |sink| {
            tracing::trace!(operation, "starting callback operation");
            start(&client, sink)
        })
    }

    fn streaming<T, F>(&self, operation: &'static str, start: F) -> ClientStreaming<T>
    where
        T: Send + 'static,
        F: Fn(&C, StreamSink<T, ClientError>) + Send + Sync + 'static,
    {
        let client = Arc::clone(&self.client);
        Streaming::create(move |sink| {
            tracing::trace!(operation, "starting callback sequence operation");
            start(&client, sink)
        })
    }

    fn write(
        &self,
        operation: &'static str,
        policy: Option<&WritePolicy>,
        key: &Key,
        bins: &[Bin],
        call: fn(&C, &WritePolicy, &Key, &[Bin], Box<dyn Listener<Key>>),
    ) -> ClientSingle<Key> {
        let policy = self.policies().write_or(policy);
        let (key, bins) = (key.clone(), bins.to_vec());
        self.single(operation, move |client, sink| {
            call(client, &policy, &key, &bins, Box::new(SingleListener::value(sink)))
        })
    }
}

impl<C> Clone for ReactiveClient<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C> fmt::Debug for ReactiveClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveClient").finish_non_exhaustive()
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Picks one command's answer out of an info response.
struct InfoListener {
    sink: SingleSink<String, ClientError>,
    command: String,
}

impl Listener<BTreeMap<String, String>> for InfoListener {
    fn on_success(self: Box<Self>, mut answers: BTreeMap<String, String>) {
        let result = match answers.remove(&self.command) {
            Some(answer) => self.sink.succeed(answer),
            None => self.sink.succeed_empty(),
        };
        if let Err(error) = result {
            tracing::trace!(%error, "info answer not delivered");
        }
    }

    fn on_failure(self: Box<Self>, error: ClientError) {
        if let Err(sink_error) = self.sink.fail(error) {
            tracing::trace!(error = %sink_error, "info failure not delivered");
        }
    }
}

impl<C: CallbackClient> DataClient for ReactiveClient<C> {
    fn policies(&self) -> &ClientPolicies {
        self.client.policies()
    }

    fn get(&self, policy: Option<&Policy>, key: &Key) -> ClientSingle<KeyRecord> {
        let policy = self.policies().read_or(policy);
        let key = key.clone();
        self.single("get", move |client, sink| {
            client.get(&policy, &key, None, Box::new(SingleListener::found_record(sink)))
        })
    }

    fn get_bins(&self, policy: Option<&Policy>, key: &Key, bin_names: &[&str]) -> ClientSingle<KeyRecord> {
        let policy = self.policies().read_or(policy);
        let (key, bin_names) = (key.clone(), owned(bin_names));
        self.single("get_bins", move |client, sink| {
            client.get(
                &policy,
                &key,
                Some(bin_names.as_slice()),
                Box::new(SingleListener::found_record(sink)),
            )
        })
    }

    fn get_header(&self, policy: Option<&Policy>, key: &Key) -> ClientSingle<KeyRecord> {
        let policy = self.policies().read_or(policy);
        let key = key.clone();
        self.single("get_header", move |client, sink| {
            client.get_header(&policy, &key, Box::new(SingleListener::found_record(sink)))
        })
    }

    fn get_batch(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<KeysRecords> {
        let policy = self.policies().batch_or(policy);
        let keys = keys.to_vec();
        self.single("get_batch", move |client, sink| {
            client.get_batch(&policy, &keys, None, Box::new(SingleListener::value(sink)))
        })
    }

    fn get_batch_ops(
        &self,
        policy: Option<&BatchPolicy>,
        keys: &[Key],
        operations: &[Operation],
    ) -> ClientSingle<KeysRecords> {
        let policy = self.policies().batch_or(policy);
        let (keys, operations) = (keys.to_vec(), operations.to_vec());
        self.single("get_batch_ops", move |client, sink| {
            client.get_batch(
                &policy,
                &keys,
                Some(operations.as_slice()),
                Box::new(SingleListener::value(sink)),
            )
        })
    }

    fn get_headers(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<KeysRecords> {
        let policy = self.policies().batch_or(policy);
        let keys = keys.to_vec();
        self.single("get_headers", move |client, sink| {
            client.get_headers(&policy, &keys, Box::new(SingleListener::value(sink)))
        })
    }

    fn get_batch_reads(&self, policy: Option<&BatchPolicy>, records: &[BatchRead]) -> ClientSingle<Vec<BatchRead>> {
        let policy = self.policies().batch_or(policy);
        let records = records.to_vec();
        self.single("get_batch_reads", move |client, sink| {
            client.get_batch_reads(&policy, &records, Box::new(SingleListener::value(sink)))
        })
    }

    fn get_flux(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientStreaming<KeyRecord> {
        let policy = self.policies().batch_or(policy);
        let keys = keys.to_vec();
        self.streaming("get_flux", move |client, sink| {
            client.get_sequence(&policy, &keys, None, Box::new(SequenceSinkListener::new(sink)))
        })
    }

    fn get_flux_ops(
        &self,
        policy: Option<&BatchPolicy>,
        keys: &[Key],
        operations: &[Operation],
    ) -> ClientStreaming<KeyRecord> {
        let policy = self.policies().batch_or(policy);
        let (keys, operations) = (keys.to_vec(), operations.to_vec());
        self.streaming("get_flux_ops", move |client, sink| {
            client.get_sequence(
                &policy,
                &keys,
                Some(operations.as_slice()),
                Box::new(SequenceSinkListener::new(sink)),
            )
        })
    }

    fn get_batch_reads_flux(&self, policy: Option<&BatchPolicy>, records: &[BatchRead]) -> ClientStreaming<BatchRead> {
        let policy = self.policies().batch_or(policy);
        let records = records.to_vec();
        self.streaming("get_batch_reads_flux", move |client, sink| {
            client.get_batch_reads_sequence(&policy, &records, Box::new(SequenceSinkListener::new(sink)))
        })
    }

    fn exists(&self, policy: Option<&Policy>, key: &Key) -> ClientSingle<Key> {
        let policy = self.policies().read_or(policy);
        let key = key.clone();
        self.single("exists", move |client, sink| {
            client.exists(&policy, &key, Box::new(SingleListener::existing_key(sink)))
        })
    }

    fn exists_batch(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<KeysExists> {
        let policy = self.policies().batch_or(policy);
        let keys = keys.to_vec();
        self.single("exists_batch", move |client, sink| {
            client.exists_batch(&policy, &keys, Box::new(SingleListener::value(sink)))
        })
    }

    fn exists_flux(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientStreaming<KeyExists> {
        let policy = self.policies().batch_or(policy);
        let keys = keys.to_vec();
        self.streaming("exists_flux", move |client, sink| {
            client.exists_sequence(&policy, &keys, Box::new(SequenceSinkListener::new(sink)))
        })
    }

    fn put(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key> {
        self.write("put", policy, key, bins, |client, policy, key, bins, listener| {
            client.put(policy, key, bins, listener)
        })
    }

    fn append(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key> {
        self.write("append", policy, key, bins, |client, policy, key, bins, listener| {
            client.append(policy, key, bins, listener)
        })
    }

    fn prepend(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key> {
        self.write("prepend", policy, key, bins, |client, policy, key, bins, listener| {
            client.prepend(policy, key, bins, listener)
        })
    }

    fn add(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key> {
        self.write("add", policy, key, bins, |client, policy, key, bins, listener| {
            client.add(policy, key, bins, listener)
        })
    }

    fn delete(&self, policy: Option<&WritePolicy>, key: &Key) -> ClientSingle<Key> {
        let policy = self.policies().write_or(policy);
        let key = key.clone();
        self.single("delete", move |client, sink| {
            client.delete(&policy, &key, Box::new(SingleListener::existing_key(sink)))
        })
    }

    fn delete_batch(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<BatchResults> {
        let policy = self.policies().batch_or(policy);
        let keys = keys.to_vec();
        self.single("delete_batch", move |client, sink| {
            client.delete_batch(&policy, &keys, Box::new(SingleListener::value(sink)))
        })
    }

    fn touch(&self, policy: Option<&WritePolicy>, key: &Key) -> ClientSingle<Key> {
        let policy = self.policies().write_or(policy);
        let key = key.clone();
        self.single("touch", move |client, sink| {
            client.touch(&policy, &key, Box::new(SingleListener::value(sink)))
        })
    }

    fn operate(&self, policy: Option<&WritePolicy>, key: &Key, operations: &[Operation]) -> ClientSingle<KeyRecord> {
        let policy = self.policies().write_or(policy);
        let (key, operations) = (key.clone(), operations.to_vec());
        self.single("operate", move |client, sink| {
            client.operate(&policy, &key, &operations, Box::new(SingleListener::value(sink)))
        })
    }

    fn commit(&self, txn: &Txn) -> ClientSingle<CommitStatus> {
        let txn = txn.clone();
        self.single("commit", move |client, sink| {
            client.commit(&txn, Box::new(SingleListener::value(sink)))
        })
    }

    fn abort(&self, txn: &Txn) -> ClientSingle<AbortStatus> {
        let txn = txn.clone();
        self.single("abort", move |client, sink| {
            client.abort(&txn, Box::new(SingleListener::value(sink)))
        })
    }

    fn query(&self, policy: Option<&QueryPolicy>, statement: &Statement) -> ClientStreaming<KeyRecord> {
        let policy = self.policies().query_or(policy);
        let statement = statement.clone();
        self.streaming("query", move |client, sink| {
            client.query(&policy, &statement, Box::new(SequenceSinkListener::new(sink)))
        })
    }

    fn scan_all(
        &self,
        policy: Option<&ScanPolicy>,
        namespace: &str,
        set: &str,
        bin_names: &[&str],
    ) -> ClientStreaming<KeyRecord> {
        let policy = self.policies().scan_or(policy);
        let (namespace, set, bin_names) = (namespace.to_string(), set.to_string(), owned(bin_names));
        self.streaming("scan_all", move |client, sink| {
            client.scan_all(
                &policy,
                &namespace,
                &set,
                &bin_names,
                Box::new(SequenceSinkListener::new(sink)),
            )
        })
    }

    fn execute(
        &self,
        policy: Option<&WritePolicy>,
        key: &Key,
        package: &str,
        function: &str,
        args: &[Value],
    ) -> ClientSingle<KeyObject> {
        let policy = self.policies().write_or(policy);
        let (key, package, function, args) =
            (key.clone(), package.to_string(), function.to_string(), args.to_vec());
        self.single("execute", move |client, sink| {
            client.execute(
                &policy,
                &key,
                &package,
                &function,
                &args,
                Box::new(SingleListener::value(sink)),
            )
        })
    }

    fn info(&self, policy: Option<&InfoPolicy>, node: &Node, command: &str) -> ClientSingle<String> {
        let policy = self.policies().info_or(policy);
        let (node, command) = (node.clone(), command.to_string());
        self.single("info", move |client, sink| {
            let listener = InfoListener {
                sink,
                command: command.clone(),
            };
            client.info(&policy, &node, std::slice::from_ref(&command), Box::new(listener))
        })
    }

    fn info_many(
        &self,
        policy: Option<&InfoPolicy>,
        node: &Node,
        commands: &[&str],
    ) -> ClientSingle<BTreeMap<String, String>> {
        let policy = self.policies().info_or(policy);
        let (node, commands) = (node.clone(), owned(commands));
        self.single("info_many", move |client, sink| {
            client.info(&policy, &node, &commands, Box::new(SingleListener::value(sink)))
        })
    }

    fn create_index(&self, policy: Option<&Policy>, index: &IndexSpec) -> ClientSingle<()> {
        let policy = self.policies().read_or(policy);
        let index = index.clone();
        self.single("create_index", move |client, sink| {
            client.create_index(&policy, &index, Box::new(SingleListener::unit(sink)))
        })
    }

    fn drop_index(&self, policy: Option<&Policy>, namespace: &str, set: &str, index_name: &str) -> ClientSingle<()> {
        let policy = self.policies().read_or(policy);
        let (namespace, set, index_name) = (namespace.to_string(), set.to_string(), index_name.to_string());
        self.single("drop_index", move |client, sink| {
            client.drop_index(
                &policy,
                &namespace,
                &set,
                &index_name,
                Box::new(SingleListener::unit(sink)),
            )
        })
    }
}
