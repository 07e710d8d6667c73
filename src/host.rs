//! Minimal stand-in for the runtime that hosts the chaincode.
//!
//! Each transaction runs against a write set layered over the store. Reads see
//! the transaction's own earlier writes; nothing reaches the store until the
//! chaincode returns successfully, and then every write lands through one
//! `put_batch` call.

use std::fmt;
use tracing::{debug, info, info_span, warn};

use crate::contract::Chaincode;
use crate::error::{LedgerError, StoreError};
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Init,
    Invoke,
    Query,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Init => write!(f, "init"),
            TxKind::Invoke => write!(f, "invoke"),
            TxKind::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub kind: TxKind,
    pub function: String,
    pub args: Vec<String>,
}

impl Transaction {
    pub fn new(kind: TxKind, function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind,
            function: function.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub tx_id: u64,
    pub payload: Option<Vec<u8>>,
    /// Number of keys committed by this transaction.
    pub writes: usize,
}

/// Pending writes of one transaction over a read-only view of the store.
struct WriteSet<'a> {
    base: &'a dyn StateStore,
    writes: Vec<(String, Vec<u8>)>,
    read_only: bool,
}

impl<'a> WriteSet<'a> {
    fn new(base: &'a dyn StateStore, read_only: bool) -> Self {
        Self {
            base,
            writes: Vec::new(),
            read_only,
        }
    }
}

impl StateStore for WriteSet<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.writes.iter().find(|(k, _)| k == key) {
            Some((_, value)) => Ok(Some(value.clone())),
            None => self.base.get(key),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly(key.to_string()));
        }
        match self.writes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_vec(),
            None => self.writes.push((key.to_string(), value.to_vec())),
        }
        Ok(())
    }
}

pub struct ChaincodeHost<C, S> {
    chaincode: C,
    store: S,
    next_tx: u64,
}

impl<C: Chaincode, S: StateStore> ChaincodeHost<C, S> {
    pub fn new(chaincode: C, store: S) -> Self {
        Self {
            chaincode,
            store,
            next_tx: 1,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one transaction to completion and commits its writes if it succeeded.
    ///
    /// The commit is as atomic as the store's `put_batch`.
    pub fn execute(&mut self, tx: &Transaction) -> Result<Response, LedgerError> {
        let tx_id = self.next_tx;
        self.next_tx += 1;
        let span = info_span!("tx", id = tx_id, kind = %tx.kind, function = %tx.function);
        let _enter = span.enter();

        let mut overlay = WriteSet::new(&self.store, tx.kind == TxKind::Query);
        let result = match tx.kind {
            TxKind::Init => self.chaincode.init(&mut overlay, &tx.function, &tx.args),
            TxKind::Invoke => self.chaincode.invoke(&mut overlay, &tx.function, &tx.args),
            TxKind::Query => self.chaincode.query(&mut overlay, &tx.function, &tx.args),
        };
        let writes = overlay.writes;

        let payload = match result {
            Ok(payload) => payload,
            Err(LedgerError::Store(StoreError::ReadOnly(key))) => {
                warn!("Query tried to write {}", key);
                return Err(LedgerError::ReadOnly(key));
            }
            Err(e) => {
                warn!("Transaction failed, discarding {} pending writes: {}", writes.len(), e);
                return Err(e);
            }
        };

        if !writes.is_empty() {
            self.store.put_batch(&writes)?;
            debug!("Committed {} keys", writes.len());
        }
        info!("Transaction complete");

        Ok(Response {
            tx_id,
            payload,
            writes: writes.len(),
        })
    }
}
