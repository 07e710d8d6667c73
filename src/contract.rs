//! Points ledger chaincode: seeds two balances, moves points between them, reads them back.

use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;
use tracing::{debug, info, warn};

use crate::error::{EntryKind, LedgerError};
use crate::store::StateStore;

/// Balance every account receives from `init`.
pub const INITIAL_BALANCE: i64 = 1000;

/// How amount text that is not a decimal integer is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountPolicy {
    /// Malformed text counts as zero; out-of-range text saturates at the i64 bounds.
    #[default]
    Lenient,
    /// Malformed text fails with `LedgerError::InvalidAmount`.
    Strict,
}

/// Entry points the host runtime calls into.
///
/// Each call returns an optional payload; an error is the sole result of a
/// failed call.
pub trait Chaincode {
    fn init(
        &self,
        store: &mut dyn StateStore,
        function: &str,
        args: &[String],
    ) -> Result<Option<Vec<u8>>, LedgerError>;

    fn invoke(
        &self,
        store: &mut dyn StateStore,
        function: &str,
        args: &[String],
    ) -> Result<Option<Vec<u8>>, LedgerError>;

    fn query(
        &self,
        store: &mut dyn StateStore,
        function: &str,
        args: &[String],
    ) -> Result<Option<Vec<u8>>, LedgerError>;
}

#[derive(Debug, Clone, Default)]
pub struct LedgerContract {
    amounts: AmountPolicy,
}

impl LedgerContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(amounts: AmountPolicy) -> Self {
        Self { amounts }
    }

    /// Sets both named accounts to `INITIAL_BALANCE`, overwriting any previous value.
    pub fn init_accounts(
        &self,
        store: &mut dyn StateStore,
        args: &[String],
    ) -> Result<(), LedgerError> {
        expect_args("init", args, 2)?;
        let seed = INITIAL_BALANCE.to_string();

        for account in args {
            store.put(account, seed.as_bytes())?;
        }
        info!("Seeded {} and {} with {}", args[0], args[1], seed);
        Ok(())
    }

    /// Moves `amount` points from `args[0]` to `args[1]`.
    ///
    /// Both accounts are read before anything is written. The arithmetic is
    /// unchecked: the source may go negative and values wrap at the i64 bounds.
    pub fn transfer(&self, store: &mut dyn StateStore, args: &[String]) -> Result<(), LedgerError> {
        debug!("transfer is running");
        expect_args("transfer", args, 3)?;
        let (from, to) = (&args[0], &args[1]);

        let from_points = self.balance_of(store, from)?;
        let to_points = self.balance_of(store, to)?;
        let amount = self.parse_amount(&args[2])?;

        let from_points = from_points.wrapping_sub(amount);
        let to_points = to_points.wrapping_add(amount);
        info!(%from, %to, amount, from_points, to_points, "Transfer computed");

        // Debit first, then credit. Atomicity is whatever the store's batch gives.
        store.put_batch(&[
            (from.clone(), from_points.to_string().into_bytes()),
            (to.clone(), to_points.to_string().into_bytes()),
        ])?;
        Ok(())
    }

    /// Returns the raw bytes stored under `args[0]`.
    pub fn read(&self, store: &dyn StateStore, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        expect_args("read", args, 1)?;
        let key = &args[0];

        match store.get(key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(LedgerError::EntityNotFound(key.clone())),
            Err(source) => Err(LedgerError::StateFetch {
                key: key.clone(),
                source,
            }),
        }
    }

    fn balance_of(&self, store: &dyn StateStore, account: &str) -> Result<i64, LedgerError> {
        let bytes = store
            .get(account)
            .map_err(|source| LedgerError::StateFetch {
                key: account.to_string(),
                source,
            })?
            .ok_or_else(|| LedgerError::EntityNotFound(account.to_string()))?;
        self.parse_amount(&String::from_utf8_lossy(&bytes))
    }

    fn parse_amount(&self, text: &str) -> Result<i64, LedgerError> {
        match text.parse::<i64>() {
            Ok(value) => Ok(value),
            // Out-of-range text saturates, as Atoi-style parsers report it.
            Err(e) if self.amounts == AmountPolicy::Lenient => match e.kind() {
                IntErrorKind::PosOverflow => Ok(i64::MAX),
                IntErrorKind::NegOverflow => Ok(i64::MIN),
                _ => {
                    warn!("Treating malformed amount {:?} as 0", text);
                    Ok(0)
                }
            },
            Err(_) => Err(LedgerError::InvalidAmount(text.to_string())),
        }
    }
}

impl Chaincode for LedgerContract {
    fn init(
        &self,
        store: &mut dyn StateStore,
        _function: &str,
        args: &[String],
    ) -> Result<Option<Vec<u8>>, LedgerError> {
        self.init_accounts(store, args)?;
        Ok(None)
    }

    fn invoke(
        &self,
        store: &mut dyn StateStore,
        function: &str,
        args: &[String],
    ) -> Result<Option<Vec<u8>>, LedgerError> {
        debug!("invoke is running {}", function);
        match function {
            "init" => self.init_accounts(store, args)?,
            "transfer" => self.transfer(store, args)?,
            _ => {
                warn!("invoke did not find func: {}", function);
                return Err(LedgerError::UnknownFunction {
                    kind: EntryKind::Invoke,
                    name: function.to_string(),
                });
            }
        }
        Ok(None)
    }

    fn query(
        &self,
        store: &mut dyn StateStore,
        function: &str,
        args: &[String],
    ) -> Result<Option<Vec<u8>>, LedgerError> {
        debug!("query is running {}", function);
        match function {
            "read" => Ok(Some(self.read(store, args)?)),
            _ => {
                warn!("query did not find func: {}", function);
                Err(LedgerError::UnknownFunction {
                    kind: EntryKind::Query,
                    name: function.to_string(),
                })
            }
        }
    }
}

fn expect_args(function: &'static str, args: &[String], expected: usize) -> Result<(), LedgerError> {
    if args.len() != expected {
        return Err(LedgerError::InvalidArgumentCount {
            function,
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{FailingStore, MemoryStore};

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        LedgerContract::new()
            .init_accounts(&mut store, &args(&["alice", "bob"]))
            .unwrap();
        store
    }

    fn balance(store: &MemoryStore, key: &str) -> String {
        String::from_utf8(store.get(key).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_init_sets_both_to_initial_balance() {
        let store = seeded();
        assert_eq!(balance(&store, "alice"), "1000");
        assert_eq!(balance(&store, "bob"), "1000");
    }

    #[test]
    fn test_init_again_resets_instead_of_accumulating() {
        let contract = LedgerContract::new();
        let mut store = seeded();
        contract.transfer(&mut store, &args(&["alice", "bob", "250"])).unwrap();

        contract.init_accounts(&mut store, &args(&["alice", "bob"])).unwrap();
        assert_eq!(balance(&store, "alice"), "1000");
        assert_eq!(balance(&store, "bob"), "1000");
    }

    #[test]
    fn test_transfer_then_read() {
        let contract = LedgerContract::new();
        let mut store = seeded();
        contract.transfer(&mut store, &args(&["alice", "bob", "300"])).unwrap();

        assert_eq!(contract.read(&store, &args(&["alice"])).unwrap(), b"700".to_vec());
        assert_eq!(contract.read(&store, &args(&["bob"])).unwrap(), b"1300".to_vec());
    }

    #[test]
    fn test_transfer_conserves_total_without_clamping() {
        let contract = LedgerContract::new();
        for (amount, from_after, to_after) in [("-250", 1250, 750), ("1500", -500, 2500)] {
            let mut store = seeded();
            contract
                .transfer(&mut store, &args(&["alice", "bob", amount]))
                .unwrap();
            let a: i64 = balance(&store, "alice").parse().unwrap();
            let b: i64 = balance(&store, "bob").parse().unwrap();
            assert_eq!((a, b), (from_after, to_after));
            assert_eq!(a + b, 2 * INITIAL_BALANCE);
        }
    }

    #[test]
    fn test_transfer_wraps_instead_of_panicking() {
        let contract = LedgerContract::new();
        let mut store = seeded();
        store.put("bob", i64::MAX.to_string().as_bytes()).unwrap();

        contract.transfer(&mut store, &args(&["alice", "bob", "1"])).unwrap();
        assert_eq!(balance(&store, "bob"), i64::MIN.to_string());
    }

    #[test]
    fn test_transfer_from_missing_account_writes_nothing() {
        let contract = LedgerContract::new();
        let mut store = FailingStore::default();
        store.inner.put("bob", b"1000").unwrap();

        let err = contract
            .transfer(&mut store, &args(&["ghost", "bob", "10"]))
            .unwrap_err();
        assert_eq!(err, LedgerError::EntityNotFound("ghost".to_string()));
        assert!(store.puts.is_empty());
        assert_eq!(store.inner.get("bob").unwrap(), Some(b"1000".to_vec()));
    }

    #[test]
    fn test_transfer_to_missing_account_fails() {
        let contract = LedgerContract::new();
        let mut store = seeded();
        let err = contract
            .transfer(&mut store, &args(&["alice", "ghost", "10"]))
            .unwrap_err();
        assert_eq!(err, LedgerError::EntityNotFound("ghost".to_string()));
        assert_eq!(balance(&store, "alice"), "1000");
    }

    #[test]
    fn test_argument_counts_are_enforced_without_writes() {
        let contract = LedgerContract::new();
        let mut store = FailingStore::default();

        for bad in [args(&["a"]), args(&["a", "b", "c"])] {
            assert!(matches!(
                contract.init_accounts(&mut store, &bad),
                Err(LedgerError::InvalidArgumentCount { function: "init", expected: 2, .. })
            ));
        }
        for bad in [args(&["a", "b"]), args(&["a", "b", "1", "2"])] {
            assert!(matches!(
                contract.transfer(&mut store, &bad),
                Err(LedgerError::InvalidArgumentCount { function: "transfer", expected: 3, .. })
            ));
        }
        for bad in [args(&[]), args(&["a", "b"])] {
            assert!(matches!(
                contract.read(&store, &bad),
                Err(LedgerError::InvalidArgumentCount { function: "read", expected: 1, .. })
            ));
        }
        assert!(store.puts.is_empty());
    }

    #[test]
    fn test_malformed_amount_lenient_and_strict() {
        let mut store = seeded();
        LedgerContract::new()
            .transfer(&mut store, &args(&["alice", "bob", "12abc"]))
            .unwrap();
        assert_eq!(balance(&store, "alice"), "1000");
        assert_eq!(balance(&store, "bob"), "1000");

        let strict = LedgerContract::with_policy(AmountPolicy::Strict);
        let err = strict
            .transfer(&mut store, &args(&["alice", "bob", "12abc"]))
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidAmount("12abc".to_string()));
    }

    #[test]
    fn test_out_of_range_amount_saturates_when_lenient() {
        let mut store = seeded();
        store.put("bob", b"0").unwrap();
        LedgerContract::new()
            .transfer(&mut store, &args(&["alice", "bob", "99999999999999999999"]))
            .unwrap();
        assert_eq!(balance(&store, "bob"), i64::MAX.to_string());
        assert_eq!(balance(&store, "alice"), (1000i64.wrapping_sub(i64::MAX)).to_string());

        let err = LedgerContract::with_policy(AmountPolicy::Strict)
            .transfer(&mut store, &args(&["alice", "bob", "-99999999999999999999"]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn test_transfer_store_read_failure_is_not_entity_not_found() {
        let contract = LedgerContract::new();
        for broken in ["alice", "bob"] {
            let mut store = FailingStore {
                fail_get_on: Some(broken.to_string()),
                ..Default::default()
            };
            store.inner.put("alice", b"1000").unwrap();
            store.inner.put("bob", b"1000").unwrap();

            let err = contract
                .transfer(&mut store, &args(&["alice", "bob", "1"]))
                .unwrap_err();
            assert!(matches!(
                err,
                LedgerError::StateFetch { ref key, source: StoreError::Backend(_) } if key == broken
            ));
            assert!(store.puts.is_empty());
        }
    }

    #[test]
    fn test_invoke_write_is_unknown() {
        let contract = LedgerContract::new();
        let mut store = seeded();
        let before = store.clone();

        let err = contract
            .invoke(&mut store, "write", &args(&["alice", "garbage"]))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnknownFunction {
                kind: EntryKind::Invoke,
                name: "write".to_string()
            }
        );
        assert_eq!(store, before);
    }

    #[test]
    fn test_read_distinguishes_missing_from_store_failure() {
        let contract = LedgerContract::new();
        let mut store = FailingStore {
            fail_get_on: Some("broken".to_string()),
            ..Default::default()
        };
        store.inner.put("broken", b"1").unwrap();

        assert_eq!(
            contract.read(&store, &args(&["ghost"])).unwrap_err(),
            LedgerError::EntityNotFound("ghost".to_string())
        );
        assert!(matches!(
            contract.read(&store, &args(&["broken"])),
            Err(LedgerError::StateFetch { ref key, .. }) if key == "broken"
        ));
    }

    #[test]
    fn test_second_write_failure_leaves_debit_in_place() {
        let contract = LedgerContract::new();
        let mut store = FailingStore {
            fail_put_on: Some("bob".to_string()),
            ..Default::default()
        };
        store.inner.put("alice", b"1000").unwrap();
        store.inner.put("bob", b"1000").unwrap();

        let err = contract
            .transfer(&mut store, &args(&["alice", "bob", "300"]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::Backend(_))));
        assert_eq!(store.inner.get("alice").unwrap(), Some(b"700".to_vec()));
        assert_eq!(store.inner.get("bob").unwrap(), Some(b"1000".to_vec()));
    }

    #[test]
    fn test_unknown_functions_do_not_mutate() {
        let contract = LedgerContract::new();
        let mut store = seeded();
        let before = store.clone();

        let err = contract.invoke(&mut store, "bogus", &args(&["alice"])).unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnknownFunction {
                kind: EntryKind::Invoke,
                name: "bogus".to_string()
            }
        );
        let err = contract.query(&mut store, "bogus", &[]).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownFunction { kind: EntryKind::Query, .. }));
        assert_eq!(store, before);
    }

    #[test]
    fn test_dispatch_routes_invoke_and_query() {
        let contract = LedgerContract::new();
        let mut store = MemoryStore::new();

        assert_eq!(contract.init(&mut store, "init", &args(&["a", "b"])).unwrap(), None);
        contract.invoke(&mut store, "transfer", &args(&["a", "b", "1"])).unwrap();
        contract.invoke(&mut store, "init", &args(&["c", "d"])).unwrap();

        let read = |store: &mut MemoryStore, key: &str| {
            contract.query(store, "read", &args(&[key])).unwrap()
        };
        assert_eq!(read(&mut store, "a"), Some(b"999".to_vec()));
        assert_eq!(read(&mut store, "d"), Some(b"1000".to_vec()));
    }
}
