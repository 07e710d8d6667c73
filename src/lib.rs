pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod host;
pub mod store;

pub use contract::{AmountPolicy, Chaincode, LedgerContract, INITIAL_BALANCE};
pub use error::{LedgerError, StoreError};
pub use host::{ChaincodeHost, Response, Transaction, TxKind};
pub use store::{MemoryStore, RocksStore, StateStore};
