//! A [`DataClient`] decorator that retries every operation.

use std::collections::BTreeMap;
use std::fmt;

use crate::client::error::ClientError;
use crate::client::policy::{
    BatchPolicy, ClientPolicies, InfoPolicy, Policy, QueryPolicy, ScanPolicy, WritePolicy,
};
use crate::client::reactive::{ClientSingle, ClientStreaming, DataClient};
use crate::client::types::{
    AbortStatus, BatchRead, BatchResults, Bin, CommitStatus, IndexSpec, Key, KeyExists,
    KeyObject, KeyRecord, KeysExists, KeysRecords, Node, Operation, Statement, Txn, Value,
};
use crate::retry::RetryPolicy;

/// Wraps a [`DataClient`] so that every operation is retried by one policy.
///
/// Arguments and policies are forwarded unchanged. Each subscription of a
/// returned container runs its own retry session. Streams are retried from
/// the beginning, so their items may repeat after a retry.
///
/// # Example
///
/// ```rust
/// use eddy::client::{retry_on_no_more_connections, ClientError, DataClient, Key, ReactiveClient, RetryClient};
/// use eddy::testing::ScriptedClient;
///
/// # tokio_test::block_on(async {
/// let scripted = ScriptedClient::new().fail_next(vec![ClientError::no_more_connections()]);
/// let client = RetryClient::wrap(ReactiveClient::new(scripted), retry_on_no_more_connections());
///
/// let key = Key::new("test", "users", 1);
/// assert_eq!(client.get(None, &key).await, Ok(None));
/// assert_eq!(client.inner().inner().calls(), 2);
/// # });
/// ```
pub struct RetryClient<C> {
    client: C,
    policy: RetryPolicy<ClientError>,
}

impl<C: DataClient> RetryClient<C> {
    /// Retry every operation of `client` with `policy`.
    pub fn wrap(client: C, policy: RetryPolicy<ClientError>) -> Self {
        Self { client, policy }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &RetryPolicy<ClientError> {
        &self.policy
    }

    fn single<T: Send + 'static>(&self, single: ClientSingle<T>) -> ClientSingle<T> {
        single.retry_when(self.policy.clone())
    }

    fn streaming<T: Send + 'static>(&self, streaming: ClientStreaming<T>) -> ClientStreaming<T> {
        streaming.retry_when(self.policy.clone())
    }
}

impl<C: Clone> Clone for RetryClient<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for RetryClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryClient")
            .field("client", &self.client)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<C: DataClient> DataClient for RetryClient<C> {
    fn policies(&self) -> &ClientPolicies {
        self.client.policies()
    }

    fn get(&self, policy: Option<&Policy>, key: &Key) -> ClientSingle<KeyRecord> {
        self.single(self.client.get(policy, key))
    }

    fn get_bins(&self, policy: Option<&Policy>, key: &Key, bin_names: &[&str]) -> ClientSingle<KeyRecord> {
        self.single(self.client.get_bins(policy, key, bin_names))
    }

    fn get_header(&self, policy: Option<&Policy>, key: &Key) -> ClientSingle<KeyRecord> {
        self.single(self.client.get_header(policy, key))
    }

    fn get_batch(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<KeysRecords> {
        self.single(self.client.get_batch(policy, keys))
    }

    fn get_batch_ops(
        &self,
        policy: Option<&BatchPolicy>,
        keys: &[Key],
        operations: &[Operation],
    ) -> ClientSingle<KeysRecords> {
        self.single(self.client.get_batch_ops(policy, keys, operations))
    }

    fn get_headers(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<KeysRecords> {
        self.single(self.client.get_headers(policy, keys))
    }

    fn get_batch_reads(&self, policy: Option<&BatchPolicy>, records: &[BatchRead]) -> ClientSingle<Vec<BatchRead>> {
        self.single(self.client.get_batch_reads(policy, records))
    }

    fn get_flux(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientStreaming<KeyRecord> {
        self.streaming(self.client.get_flux(policy, keys))
    }

    fn get_flux_ops(
        &self,
        policy: Option<&BatchPolicy>,
        keys: &[Key],
        operations: &[Operation],
    ) -> ClientStreaming<KeyRecord> {
        self.streaming(self.client.get_flux_ops(policy, keys, operations))
    }

    fn get_batch_reads_flux(&self, policy: Option<&BatchPolicy>, records: &[BatchRead]) -> ClientStreaming<BatchRead> {
        self.streaming(self.client.get_batch_reads_flux(policy, records))
    }

    fn exists(&self, policy: Option<&Policy>, key: &Key) -> ClientSingle<Key> {
        self.single(self.client.exists(policy, key))
    }

    fn exists_batch(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<KeysExists> {
        self.single(self.client.exists_batch(policy, keys))
    }

    fn exists_flux(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientStreaming<KeyExists> {
        self.streaming(self.client.exists_flux(policy, keys))
    }

    fn put(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key> {
        self.single(self.client.put(policy, key, bins))
    }

    fn append(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key> {
        self.single(self.client.append(policy, key, bins))
    }

    fn prepend(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key> {
        self.single(self.client.prepend(policy, key, bins))
    }

    fn add(&self, policy: Option<&WritePolicy>, key: &Key, bins: &[Bin]) -> ClientSingle<Key> {
        self.single(self.client.add(policy, key, bins))
    }

    fn delete(&self, policy: Option<&WritePolicy>, key: &Key) -> ClientSingle<Key> {
        self.single(self.client.delete(policy, key))
    }

    fn delete_batch(&self, policy: Option<&BatchPolicy>, keys: &[Key]) -> ClientSingle<BatchResults> {
        self.single(self.client.delete_batch(policy, keys))
    }

    fn touch(&self, policy: Option<&WritePolicy>, key: &Key) -> ClientSingle<Key> {
        self.single(self.client.touch(policy, key))
    }

    fn operate(&self, policy: Option<&WritePolicy>, key: &Key, operations: &[Operation]) -> ClientSingle<KeyRecord> {
        self.single(self.client.operate(policy, key, operations))
    }

    fn commit(&self, txn: &Txn) -> ClientSingle<CommitStatus> {
        self.single(self.client.commit(txn))
    }

    fn abort(&self, txn: &Txn) -> ClientSingle<AbortStatus> {
        self.single(self.client.abort(txn))
    }

    fn query(&self, policy: Option<&QueryPolicy>, statement: &Statement) -> ClientStreaming<KeyRecord> {
        self.streaming(self.client.query(policy, statement))
    }

    fn scan_all(
        &self,
        policy: Option<&ScanPolicy>,
        namespace: &str,
        set: &str,
        bin_names: &[&str],
    ) -> ClientStreaming<KeyRecord> {
        self.streaming(self.client.scan_all(policy, namespace, set, bin_names))
    }

    fn execute(
        &self,
        policy: Option<&WritePolicy>,
        key: &Key,
        package: &str,
        function: &str,
        args: &[Value],
    ) -> ClientSingle<KeyObject> {
        self.single(self.client.execute(policy, key, package, function, args))
    }

    fn info(&self, policy: Option<&InfoPolicy>, node: &Node, command: &str) -> ClientSingle<String> {
        self.single(self.client.info(policy, node, command))
    }

    fn info_many(
        &self,
        policy: Option<&InfoPolicy>,
        node: &Node,
        commands: &[&str],
    ) -> ClientSingle<BTreeMap<String, String>> {
        self.single(self.client.info_many(policy, node, commands))
    }

    fn create_index(&self, policy: Option<&Policy>, index: &IndexSpec) -> ClientSingle<()> {
        self.single(self.client.create_index(policy, index))
    }

    fn drop_index(&self, policy: Option<&Policy>, namespace: &str, set: &str, index_name: &str) -> ClientSingle<()> {
        self.single(self.client.drop_index(policy, namespace, set, index_name))
    }
}
