//! Entities exchanged with a data-service client.

use std::collections::BTreeMap;
use std::fmt;

/// A bin value or user key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value.
    #[default]
    Nil,
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Raw bytes.
    Blob(Vec<u8>),
    /// Ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns the integer, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Identifies a record: namespace, set and user key.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    /// Namespace the record lives in.
    pub namespace: String,
    /// Set within the namespace.
    pub set: String,
    /// User-supplied key.
    pub user_key: Value,
}

impl Key {
    /// Create a key.
    pub fn new(namespace: impl Into<String>, set: impl Into<String>, user_key: impl Into<Value>) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            user_key: user_key.into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.set, self.user_key)
    }
}

/// A named value within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    /// Bin name.
    pub name: String,
    /// Bin value.
    pub value: Value,
}

impl Bin {
    /// Create a bin.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Bins and metadata of a stored record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Bin values by name.
    pub bins: BTreeMap<String, Value>,
    /// Write generation.
    pub generation: u32,
    /// Expiration, in seconds since the service epoch.
    pub expiration: u32,
}

impl Record {
    /// Build a record from bins, generation 1.
    pub fn from_bins(bins: impl IntoIterator<Item = Bin>) -> Self {
        Self {
            bins: bins.into_iter().map(|bin| (bin.name, bin.value)).collect(),
            generation: 1,
            expiration: 0,
        }
    }

    /// Look up a bin value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bins.get(name)
    }

    /// Copy of this record with only its metadata.
    pub fn header(&self) -> Self {
        Self {
            bins: BTreeMap::new(),
            generation: self.generation,
            expiration: self.expiration,
        }
    }
}

/// A key with its record, if one was found.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    /// The requested key.
    pub key: Key,
    /// The record, `None` when the key does not exist.
    pub record: Option<Record>,
}

/// Results of a batch read, positionally aligned with the requested keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeysRecords {
    /// Requested keys.
    pub keys: Vec<Key>,
    /// One entry per key, `None` for missing records.
    pub records: Vec<Option<Record>>,
}

/// Existence of a single key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyExists {
    /// The requested key.
    pub key: Key,
    /// Whether a record exists for it.
    pub exists: bool,
}

/// Existence of a batch of keys, positionally aligned with the keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeysExists {
    /// Requested keys.
    pub keys: Vec<Key>,
    /// One flag per key.
    pub exists: Vec<bool>,
}

/// Result of a server-side function call.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyObject {
    /// Key the function ran against.
    pub key: Key,
    /// Value the function returned.
    pub object: Value,
}

/// One entry of a heterogeneous batch read.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRead {
    /// Key to read.
    pub key: Key,
    /// Bins to read; `None` reads all bins.
    pub bin_names: Option<Vec<String>>,
    /// Filled in by the read.
    pub record: Option<Record>,
}

impl BatchRead {
    /// Read the listed bins of `key`.
    pub fn new(key: Key, bin_names: &[&str]) -> Self {
        Self {
            key,
            bin_names: Some(bin_names.iter().map(|name| name.to_string()).collect()),
            record: None,
        }
    }

    /// Read every bin of `key`.
    pub fn all_bins(key: Key) -> Self {
        Self {
            key,
            bin_names: None,
            record: None,
        }
    }
}

/// Outcome of a batch write.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResults {
    /// Per-key outcomes.
    pub records: Vec<KeyRecord>,
    /// True when every key succeeded.
    pub status: bool,
}

/// A single read or write step of `operate`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Read all bins.
    Get,
    /// Read one bin.
    GetBin(String),
    /// Read metadata only.
    GetHeader,
    /// Write a bin.
    Put(Bin),
    /// Add an integer to a bin.
    Add(Bin),
    /// Append to a string bin.
    Append(Bin),
    /// Prepend to a string bin.
    Prepend(Bin),
    /// Reset the record's expiration.
    Touch,
    /// Delete the record.
    Delete,
}

impl Operation {
    /// Returns true for operations that modify the record.
    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::Get | Operation::GetBin(_) | Operation::GetHeader)
    }
}

/// A secondary-index query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    /// Namespace to query.
    pub namespace: String,
    /// Set to query.
    pub set: String,
    /// Bins to return; empty returns all bins.
    pub bin_names: Vec<String>,
    /// Index to use, if any.
    pub index_name: Option<String>,
}

/// Kind of data a secondary index covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// Integer values.
    Numeric,
    /// String values.
    String,
    /// Byte values.
    Blob,
    /// Geospatial values.
    Geo2dSphere,
}

/// How a secondary index treats collection bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexCollectionType {
    /// Index the bin value itself.
    #[default]
    Default,
    /// Index list elements.
    List,
    /// Index map keys.
    MapKeys,
    /// Index map values.
    MapValues,
}

/// Everything needed to create a secondary index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    /// Namespace of the index.
    pub namespace: String,
    /// Set of the index.
    pub set: String,
    /// Index name.
    pub index_name: String,
    /// Indexed bin.
    pub bin_name: String,
    /// Indexed data type.
    pub index_type: IndexType,
    /// Collection handling.
    pub collection_type: IndexCollectionType,
}

/// A multi-record transaction handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Txn {
    id: u64,
}

impl Txn {
    /// Start a transaction with a random id.
    pub fn new() -> Self {
        Self { id: rand::random() }
    }

    /// Transaction id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for Txn {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a transaction commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitStatus {
    /// Committed.
    Ok,
    /// Was already committed.
    AlreadyCommitted,
    /// Roll-forward was abandoned; the server will finish it.
    RollForwardAbandoned,
    /// Committed, but closing the transaction was abandoned.
    CloseAbandoned,
}

/// Outcome of a transaction abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortStatus {
    /// Aborted.
    Ok,
    /// Was already aborted.
    AlreadyAborted,
    /// Roll-back was abandoned; the server will finish it.
    RollBackAbandoned,
    /// Aborted, but closing the transaction was abandoned.
    CloseAbandoned,
}

/// A cluster node, target of info commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    /// Node name.
    pub name: String,
    /// Network address.
    pub address: String,
}

impl Node {
    /// Create a node handle.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}
