//! Testing utilities for code built on eddy.
//!
//! This module provides a scripted in-memory [`CallbackClient`], scripted
//! containers whose outcome changes per subscription, and assertion macros
//! for single-result outcomes.
//!
//! # Examples
//!
//! ## ScriptedClient
//!
//! ```rust
//! use eddy::client::{ClientError, DataClient, Key, ReactiveClient};
//! use eddy::testing::ScriptedClient;
//!
//! # tokio_test::block_on(async {
//! let key = Key::new("test", "users", 1);
//! let scripted = ScriptedClient::new().fail_next(vec![ClientError::timeout(false)]);
//! let client = ReactiveClient::new(scripted);
//!
//! assert!(client.get(None, &key).await.is_err());
//! assert_eq!(client.get(None, &key).await, Ok(None));
//! # });
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use eddy::{assert_empty, assert_failed, assert_value};
//!
//! let found: Result<Option<i32>, String> = Ok(Some(42));
//! assert_value!(found, 42);
//!
//! let missing: Result<Option<i32>, String> = Ok(None);
//! assert_empty!(missing);
//!
//! let failed: Result<Option<i32>, String> = Err("boom".to_string());
//! assert_failed!(failed);
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::adapter::{Single, Streaming};
use crate::client::{
    AbortStatus, BatchPolicy, BatchRead, BatchResults, Bin, BoxListener, BoxSequenceListener,
    CallbackClient, ClientError, ClientPolicies, CommitStatus, ErrorKind, IndexSpec, InfoPolicy,
    Key, KeyExists, KeyObject, KeyRecord, KeysExists, KeysRecords, Node, Operation, Policy,
    QueryPolicy, Record, ScanPolicy, Statement, Txn, Value, WritePolicy,
};
use crate::signal::Signal;
use crate::sink::SinkFailure;

/// An in-memory [`CallbackClient`] with scripted failures.
///
/// Every call first consumes the next scripted failure, if any, and reports
/// it. Otherwise the call runs against an in-memory record store and reports
/// synchronously on the calling thread.
///
/// `execute` echoes its arguments back as a list. `info` answers commands
/// registered with [`with_info`](ScriptedClient::with_info).
pub struct ScriptedClient {
    policies: ClientPolicies,
    failures: Mutex<VecDeque<ClientError>>,
    records: Mutex<Vec<(Key, Record)>>,
    info: BTreeMap<String, String>,
    indexes: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    /// An empty store with default policies and no scripted failures.
    pub fn new() -> Self {
        Self {
            policies: ClientPolicies::default(),
            failures: Mutex::new(VecDeque::new()),
            records: Mutex::new(Vec::new()),
            info: BTreeMap::new(),
            indexes: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Use `policies` as defaults.
    pub fn with_policies(mut self, policies: ClientPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// Store a record.
    pub fn with_record(self, key: Key, bins: impl IntoIterator<Item = Bin>) -> Self {
        self.lock_records().push((key, Record::from_bins(bins)));
        self
    }

    /// Answer info `command` with `answer`.
    pub fn with_info(mut self, command: impl Into<String>, answer: impl Into<String>) -> Self {
        self.info.insert(command.into(), answer.into());
        self
    }

    /// Fail the next calls, one error per call, in order.
    pub fn fail_next(self, errors: Vec<ClientError>) -> Self {
        self.lock_failures().extend(errors);
        self
    }

    /// Fail the next call not already scripted to fail.
    pub fn push_failure(&self, error: ClientError) {
        self.lock_failures().push_back(error);
    }

    /// Number of calls received so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Current state of the record under `key`.
    pub fn record(&self, key: &Key) -> Option<Record> {
        self.lookup(key)
    }

    /// Names of the indexes created and not dropped.
    pub fn indexes(&self) -> Vec<String> {
        self.indexes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, VecDeque<ClientError>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, Vec<(Key, Record)>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and pop its scripted failure.
    fn begin(&self, operation: &'static str) -> Option<ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.lock_failures().pop_front();
        if let Some(error) = &failure {
            tracing::trace!(operation, %error, "scripted failure");
        }
        failure
    }

    fn lookup(&self, key: &Key) -> Option<Record> {
        self.lock_records()
            .iter()
            .find(|(stored, _)| stored == key)
            .map(|(_, record)| record.clone())
    }

    fn write_bins(&self, key: &Key, bins: &[Bin], combine: fn(Option<&Value>, &Value) -> Value) {
        let mut records = self.lock_records();
        let index = match records.iter().position(|(stored, _)| stored == key) {
            Some(index) => index,
            None => {
                records.push((key.clone(), Record::default()));
                records.len() - 1
            }
        };
        let record = &mut records[index].1;
        for bin in bins {
            let value = combine(record.bins.get(&bin.name), &bin.value);
            record.bins.insert(bin.name.clone(), value);
        }
        record.generation += 1;
    }

    fn remove(&self, key: &Key) -> bool {
        let mut records = self.lock_records();
        let before = records.len();
        records.retain(|(stored, _)| stored != key);
        records.len() != before
    }

    fn read(&self, key: &Key, operations: Option<&[Operation]>) -> KeyRecord {
        let record = self.lookup(key).map(|record| match operations {
            Some(operations) => project(&record, operations),
            None => record,
        });
        KeyRecord {
            key: key.clone(),
            record,
        }
    }

    fn scan(&self, namespace: &str, set: &str, bin_names: &[String]) -> Vec<KeyRecord> {
        self.lock_records()
            .iter()
            .filter(|(key, _)| key.namespace == namespace && key.set == set)
            .map(|(key, record)| KeyRecord {
                key: key.clone(),
                record: Some(select_bins(record, bin_names)),
            })
            .collect()
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScriptedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedClient")
            .field("calls", &self.calls())
            .field("pending_failures", &self.lock_failures().len())
            .field("records", &self.lock_records().len())
            .finish()
    }
}

const HEADER_ONLY: &[Operation] = &[Operation::GetHeader];

fn put_value(_: Option<&Value>, new: &Value) -> Value {
    new.clone()
}

fn add_value(old: Option<&Value>, new: &Value) -> Value {
    match (old, new) {
        (Some(Value::Int(a)), Value::Int(b)) => Value::Int(a.saturating_add(*b)),
        _ => new.clone(),
    }
}

fn append_value(old: Option<&Value>, new: &Value) -> Value {
    match (old, new) {
        (Some(Value::Str(a)), Value::Str(b)) => Value::Str(format!("{}{}", a, b)),
        _ => new.clone(),
    }
}

fn prepend_value(old: Option<&Value>, new: &Value) -> Value {
    match (old, new) {
        (Some(Value::Str(a)), Value::Str(b)) => Value::Str(format!("{}{}", b, a)),
        _ => new.clone(),
    }
}

fn select_bins(record: &Record, bin_names: &[String]) -> Record {
    if bin_names.is_empty() {
        return record.clone();
    }
    let mut selected = record.header();
    for name in bin_names {
        if let Some(value) = record.bins.get(name) {
            selected.bins.insert(name.clone(), value.clone());
        }
    }
    selected
}

/// Result of the read operations in `operations`.
fn project(record: &Record, operations: &[Operation]) -> Record {
    let mut result = record.header();
    for operation in operations {
        match operation {
            Operation::Get => result.bins.extend(record.bins.clone()),
            Operation::GetBin(name) => {
                if let Some(value) = record.bins.get(name) {
                    result.bins.insert(name.clone(), value.clone());
                }
            }
            _ => {}
        }
    }
    result
}

fn emit_all<T: Send + 'static>(items: Vec<T>, mut listener: BoxSequenceListener<T>) {
    for item in items {
        if listener.on_next(item).is_err() {
            tracing::trace!("sequence consumer gone, stopping");
            return;
        }
    }
    listener.on_success();
}

impl CallbackClient for ScriptedClient {
    fn policies(&self) -> &ClientPolicies {
        &self.policies
    }

    fn get(&self, _: &Policy, key: &Key, bin_names: Option<&[String]>, listener: BoxListener<KeyRecord>) {
        if let Some(error) = self.begin("get") {
            return listener.on_failure(error);
        }
        let mut found = self.read(key, None);
        if let (Some(record), Some(bin_names)) = (found.record.as_mut(), bin_names) {
            *record = select_bins(record, bin_names);
        }
        listener.on_success(found);
    }

    fn get_header(&self, _: &Policy, key: &Key, listener: BoxListener<KeyRecord>) {
        if let Some(error) = self.begin("get_header") {
            return listener.on_failure(error);
        }
        listener.on_success(self.read(key, Some(HEADER_ONLY)));
    }

    fn get_batch(
        &self,
        _: &BatchPolicy,
        keys: &[Key],
        operations: Option<&[Operation]>,
        listener: BoxListener<KeysRecords>,
    ) {
        if let Some(error) = self.begin("get_batch") {
            return listener.on_failure(error);
        }
        listener.on_success(KeysRecords {
            keys: keys.to_vec(),
            records: keys.iter().map(|key| self.read(key, operations).record).collect(),
        });
    }

    fn get_headers(&self, _: &BatchPolicy, keys: &[Key], listener: BoxListener<KeysRecords>) {
        if let Some(error) = self.begin("get_headers") {
            return listener.on_failure(error);
        }
        listener.on_success(KeysRecords {
            keys: keys.to_vec(),
            records: keys
                .iter()
                .map(|key| self.read(key, Some(HEADER_ONLY)).record)
                .collect(),
        });
    }

    fn get_batch_reads(&self, _: &BatchPolicy, records: &[BatchRead], listener: BoxListener<Vec<BatchRead>>) {
        if let Some(error) = self.begin("get_batch_reads") {
            return listener.on_failure(error);
        }
        listener.on_success(records.iter().map(|read| self.fill(read)).collect());
    }

    fn get_sequence(
        &self,
        _: &BatchPolicy,
        keys: &[Key],
        operations: Option<&[Operation]>,
        listener: BoxSequenceListener<KeyRecord>,
    ) {
        if let Some(error) = self.begin("get_sequence") {
            return listener.on_failure(error);
        }
        emit_all(keys.iter().map(|key| self.read(key, operations)).collect(), listener);
    }

    fn get_batch_reads_sequence(
        &self,
        _: &BatchPolicy,
        records: &[BatchRead],
        listener: BoxSequenceListener<BatchRead>,
    ) {
        if let Some(error) = self.begin("get_batch_reads_sequence") {
            return listener.on_failure(error);
        }
        emit_all(records.iter().map(|read| self.fill(read)).collect(), listener);
    }

    fn exists(&self, _: &Policy, key: &Key, listener: BoxListener<KeyExists>) {
        if let Some(error) = self.begin("exists") {
            return listener.on_failure(error);
        }
        listener.on_success(KeyExists {
            key: key.clone(),
            exists: self.lookup(key).is_some(),
        });
    }

    fn exists_batch(&self, _: &BatchPolicy, keys: &[Key], listener: BoxListener<KeysExists>) {
        if let Some(error) = self.begin("exists_batch") {
            return listener.on_failure(error);
        }
        listener.on_success(KeysExists {
            keys: keys.to_vec(),
            exists: keys.iter().map(|key| self.lookup(key).is_some()).collect(),
        });
    }

    fn exists_sequence(&self, _: &BatchPolicy, keys: &[Key], listener: BoxSequenceListener<KeyExists>) {
        if let Some(error) = self.begin("exists_sequence") {
            return listener.on_failure(error);
        }
        let flags = keys
            .iter()
            .map(|key| KeyExists {
                key: key.clone(),
                exists: self.lookup(key).is_some(),
            })
            .collect();
        emit_all(flags, listener);
    }

    fn put(&self, _: &WritePolicy, key: &Key, bins: &[Bin], listener: BoxListener<Key>) {
        if let Some(error) = self.begin("put") {
            return listener.on_failure(error);
        }
        self.write_bins(key, bins, put_value);
        listener.on_success(key.clone());
    }

    fn append(&self, _: &WritePolicy, key: &Key, bins: &[Bin], listener: BoxListener<Key>) {
        if let Some(error) = self.begin("append") {
            return listener.on_failure(error);
        }
        self.write_bins(key, bins, append_value);
        listener.on_success(key.clone());
    }

    fn prepend(&self, _: &WritePolicy, key: &Key, bins: &[Bin], listener: BoxListener<Key>) {
        if let Some(error) = self.begin("prepend") {
            return listener.on_failure(error);
        }
        self.write_bins(key, bins, prepend_value);
        listener.on_success(key.clone());
    }

    fn add(&self, _: &WritePolicy, key: &Key, bins: &[Bin], listener: BoxListener<Key>) {
        if let Some(error) = self.begin("add") {
            return listener.on_failure(error);
        }
        self.write_bins(key, bins, add_value);
        listener.on_success(key.clone());
    }

    fn delete(&self, _: &WritePolicy, key: &Key, listener: BoxListener<KeyExists>) {
        if let Some(error) = self.begin("delete") {
            return listener.on_failure(error);
        }
        listener.on_success(KeyExists {
            key: key.clone(),
            exists: self.remove(key),
        });
    }

    fn delete_batch(&self, _: &BatchPolicy, keys: &[Key], listener: BoxListener<BatchResults>) {
        if let Some(error) = self.begin("delete_batch") {
            return listener.on_failure(error);
        }
        for key in keys {
            self.remove(key);
        }
        listener.on_success(BatchResults {
            records: keys
                .iter()
                .map(|key| KeyRecord {
                    key: key.clone(),
                    record: None,
                })
                .collect(),
            status: true,
        });
    }

    fn touch(&self, _: &WritePolicy, key: &Key, listener: BoxListener<Key>) {
        if let Some(error) = self.begin("touch") {
            return listener.on_failure(error);
        }
        if self.lookup(key).is_none() {
            return listener.on_failure(ClientError::new(ErrorKind::KeyNotFound, key.to_string()));
        }
        self.write_bins(key, &[], put_value);
        listener.on_success(key.clone());
    }

    fn operate(&self, _: &WritePolicy, key: &Key, operations: &[Operation], listener: BoxListener<KeyRecord>) {
        if let Some(error) = self.begin("operate") {
            return listener.on_failure(error);
        }
        for operation in operations {
            match operation {
                Operation::Put(bin) => self.write_bins(key, std::slice::from_ref(bin), put_value),
                Operation::Add(bin) => self.write_bins(key, std::slice::from_ref(bin), add_value),
                Operation::Append(bin) => self.write_bins(key, std::slice::from_ref(bin), append_value),
                Operation::Prepend(bin) => {
                    self.write_bins(key, std::slice::from_ref(bin), prepend_value)
                }
                Operation::Touch => self.write_bins(key, &[], put_value),
                Operation::Delete => {
                    self.remove(key);
                }
                Operation::Get | Operation::GetBin(_) | Operation::GetHeader => {}
            }
        }
        listener.on_success(self.read(key, Some(operations)));
    }

    fn commit(&self, _: &Txn, listener: BoxListener<CommitStatus>) {
        if let Some(error) = self.begin("commit") {
            return listener.on_failure(error);
        }
        listener.on_success(CommitStatus::Ok);
    }

    fn abort(&self, _: &Txn, listener: BoxListener<AbortStatus>) {
        if let Some(error) = self.begin("abort") {
            return listener.on_failure(error);
        }
        listener.on_success(AbortStatus::Ok);
    }

    fn query(&self, _: &QueryPolicy, statement: &Statement, listener: BoxSequenceListener<KeyRecord>) {
        if let Some(error) = self.begin("query") {
            return listener.on_failure(error);
        }
        emit_all(
            self.scan(&statement.namespace, &statement.set, &statement.bin_names),
            listener,
        );
    }

    fn scan_all(
        &self,
        _: &ScanPolicy,
        namespace: &str,
        set: &str,
        bin_names: &[String],
        listener: BoxSequenceListener<KeyRecord>,
    ) {
        if let Some(error) = self.begin("scan_all") {
            return listener.on_failure(error);
        }
        emit_all(self.scan(namespace, set, bin_names), listener);
    }

    fn execute(
        &self,
        _: &WritePolicy,
        key: &Key,
        _package: &str,
        _function: &str,
        args: &[Value],
        listener: BoxListener<KeyObject>,
    ) {
        if let Some(error) = self.begin("execute") {
            return listener.on_failure(error);
        }
        listener.on_success(KeyObject {
            key: key.clone(),
            object: Value::List(args.to_vec()),
        });
    }

    fn info(
        &self,
        _: &InfoPolicy,
        _: &Node,
        commands: &[String],
        listener: BoxListener<BTreeMap<String, String>>,
    ) {
        if let Some(error) = self.begin("info") {
            return listener.on_failure(error);
        }
        let answers = commands
            .iter()
            .filter_map(|command| {
                self.info
                    .get(command)
                    .map(|answer| (command.clone(), answer.clone()))
            })
            .collect();
        listener.on_success(answers);
    }

    fn create_index(&self, _: &Policy, index: &IndexSpec, listener: BoxListener<()>) {
        if let Some(error) = self.begin("create_index") {
            return listener.on_failure(error);
        }
        let mut indexes = self.indexes.lock().unwrap_or_else(PoisonError::into_inner);
        if !indexes.contains(&index.index_name) {
            indexes.push(index.index_name.clone());
        }
        drop(indexes);
        listener.on_success(());
    }

    fn drop_index(&self, _: &Policy, _: &str, _: &str, index_name: &str, listener: BoxListener<()>) {
        if let Some(error) = self.begin("drop_index") {
            return listener.on_failure(error);
        }
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|name| name != index_name);
        listener.on_success(());
    }
}

impl ScriptedClient {
    fn fill(&self, read: &BatchRead) -> BatchRead {
        let record = self
            .lookup(&read.key)
            .map(|record| select_bins(&record, read.bin_names.as_deref().unwrap_or(&[])));
        BatchRead {
            record,
            ..read.clone()
        }
    }
}

/// A [`Single`] whose n-th subscription resolves with `outcomes[n]`.
///
/// Subscriptions past the end repeat the last outcome; with no outcomes every
/// subscription succeeds empty. The counter reports how many subscriptions
/// ran.
///
/// ```rust
/// use eddy::testing::scripted_single;
///
/// # tokio_test::block_on(async {
/// let (single, runs) = scripted_single(vec![Err("busy"), Ok(Some(1))]);
/// assert_eq!(single.subscribe().await, Err("busy"));
/// assert_eq!(single.subscribe().await, Ok(Some(1)));
/// assert_eq!(single.subscribe().await, Ok(Some(1)));
/// assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 3);
/// # });
/// ```
pub fn scripted_single<T, E>(outcomes: Vec<Result<Option<T>, E>>) -> (Single<T, E>, Arc<AtomicUsize>)
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let single = Single::defer(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let outcome = outcomes
            .get(n)
            .or_else(|| outcomes.last())
            .cloned()
            .unwrap_or(Ok(None));
        async move { outcome }
    });
    (single, runs)
}

/// A [`Streaming`] whose n-th subscription replays `runs[n]` through a sink.
///
/// Subscriptions past the end repeat the last run; with no runs every
/// subscription completes empty.
pub fn scripted_stream<T, E>(runs: Vec<Vec<Signal<T, E>>>) -> (Streaming<T, E>, Arc<AtomicUsize>)
where
    T: Clone + Send + Sync + 'static,
    E: SinkFailure + Clone + Sync,
{
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let streaming = Streaming::create(move |sink| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let signals = runs
            .get(n)
            .or_else(|| runs.last())
            .cloned()
            .unwrap_or_else(|| vec![Signal::Complete]);
        for signal in signals {
            if sink.send(signal).is_err() {
                break;
            }
        }
    });
    (streaming, count)
}

/// Assert that a single-result outcome succeeded with a value.
///
/// # Example
///
/// ```rust
/// use eddy::assert_value;
///
/// let found: Result<Option<&str>, ()> = Ok(Some("X"));
/// assert_value!(found);
/// assert_value!(found, "X");
/// ```
#[macro_export]
macro_rules! assert_value {
    ($outcome:expr) => {
        match $outcome {
            Ok(Some(_)) => {}
            other => panic!("Expected value, got {:?}", other),
        }
    };
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            Ok(Some(value)) => assert_eq!(value, $expected),
            other => panic!("Expected value {:?}, got {:?}", $expected, other),
        }
    };
}

/// Assert that a single-result outcome succeeded without a value.
///
/// # Example
///
/// ```rust
/// use eddy::assert_empty;
///
/// let missing: Result<Option<i32>, ()> = Ok(None);
/// assert_empty!(missing);
/// ```
#[macro_export]
macro_rules! assert_empty {
    ($outcome:expr) => {
        match $outcome {
            Ok(None) => {}
            other => panic!("Expected empty success, got {:?}", other),
        }
    };
}

/// Assert that a single-result outcome failed, optionally matching a pattern.
///
/// # Example
///
/// ```rust
/// use eddy::assert_failed;
/// use eddy::client::{ClientError, ErrorKind};
///
/// let failed: Result<Option<i32>, ClientError> = Err(ClientError::timeout(false));
/// assert_failed!(failed.clone());
/// assert_failed!(failed, ClientError { kind: ErrorKind::Timeout, .. });
/// ```
#[macro_export]
macro_rules! assert_failed {
    ($outcome:expr) => {
        match $outcome {
            Err(_) => {}
            other => panic!("Expected failure, got {:?}", other),
        }
    };
    ($outcome:expr, $pattern:pat) => {
        match $outcome {
            Err($pattern) => {}
            other => panic!(
                "Expected failure matching {}, got {:?}",
                stringify!($pattern),
                other
            ),
        }
    };
}
