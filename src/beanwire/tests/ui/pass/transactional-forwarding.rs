use std::fmt::Display;

use beanwire::prelude::*;
use beanwire::transaction::BoxError;

pub trait Ledger: Send + Sync {
    fn record(&self, amount: i64, memo: impl Display) -> Result<i64, BoxError>
    where
        Self: Sized;

    fn balance(&self) -> i64;

    fn describe(&self, route: (&str, &str)) -> String;

    fn version() -> u32
    where
        Self: Sized;
}

pub struct NoopManager;

#[component(dyn TransactionManager)]
impl NoopManager {
    #[inject]
    fn new() -> Self {
        Self
    }
}

impl TransactionManager for NoopManager {
    fn begin(&self) -> Result<(), BoxError> {
        Ok(())
    }

    fn commit(&self) -> Result<(), BoxError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

pub struct MemoryLedger;

#[component]
impl MemoryLedger {
    #[inject]
    fn new() -> Self {
        Self
    }
}

#[transactional]
impl Ledger for MemoryLedger {
    #[transactional]
    fn record(&self, amount: i64, memo: impl Display) -> Result<i64, BoxError> {
        let _ = memo.to_string();
        Ok(amount)
    }

    #[transactional]
    fn balance(&self) -> i64 {
        0
    }

    fn describe(&self, (from, to): (&str, &str)) -> String {
        format!("{from} -> {to}")
    }

    fn version() -> u32 {
        1
    }
}

fn main() {
    let registry = get_instance!().unwrap();
    let ledger = registry
        .provide_exact::<MemoryLedgerIntercepted>()
        .unwrap();
    assert_eq!(ledger.record(5, "deposit").unwrap(), 5);
    assert_eq!(ledger.describe(("a", "b")), "a -> b");
    assert_eq!(ledger.balance(), 0);
    assert_eq!(<MemoryLedgerIntercepted as Ledger>::version(), 1);
}
