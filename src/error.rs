use std::fmt;

use thiserror::Error;

/// Failure reported by the key-value backend itself, independent of whether a key exists.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
    #[error("Store is read-only, refused write of {0}")]
    ReadOnly(String),
}

impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Which host entry point a function name was dispatched through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Invoke,
    Query,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Invoke => write!(f, "invocation"),
            EntryKind::Query => write!(f, "query"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Incorrect number of arguments for {function}: expecting {expected}, got {got}")]
    InvalidArgumentCount {
        function: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Entity not found: {0}")]
    EntityNotFound(String),
    #[error("Failed to get state for {key}: {source}")]
    StateFetch {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("Write failed: {0}")]
    Store(#[from] StoreError),
    #[error("Received unknown function {kind}: {name}")]
    UnknownFunction { kind: EntryKind, name: String },
    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),
    #[error("Query attempted to write key {0}")]
    ReadOnly(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Script line {line}: {reason}")]
    InvalidScript { line: usize, reason: String },
}
