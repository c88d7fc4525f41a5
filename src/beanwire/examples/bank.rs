use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{Arc, Mutex};

use beanwire::prelude::*;
use beanwire::transaction::BoxError;
use beanwire::web::Dispatcher;
use serde::{Deserialize, Serialize};

fn main() {
    let registry = get_instance!().unwrap();
    let dispatcher = Dispatcher::from_provider(&registry).unwrap();

    let requests = [
        Request::get("/balances"),
        Request::new(
            HttpMethod::Post,
            "/transfers",
            Some(r#"{"from":"alice","to":"bob","amount":30}"#.into()),
        ),
        Request::new(
            HttpMethod::Post,
            "/transfers",
            Some(r#"{"from":"bob","to":"carol","amount":500}"#.into()),
        ),
        Request::get("/balances"),
        Request::get("/audit"),
    ];

    for request in &requests {
        let response = dispatcher.dispatch(request);
        println!(
            "{} {} -> {} {}",
            request.method(),
            request.path(),
            response.status(),
            response.body().unwrap_or("")
        );
    }
}

trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

struct ConsoleLogger;

#[component(dyn Logger)]
impl ConsoleLogger {
    #[inject]
    fn new() -> Self {
        Self
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        eprintln!("[bank] {message}");
    }
}

struct LoggingTransactionManager {
    logger: Arc<dyn Logger>,
}

#[component(dyn TransactionManager)]
impl LoggingTransactionManager {
    #[inject]
    fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl TransactionManager for LoggingTransactionManager {
    fn begin(&self) -> Result<(), BoxError> {
        self.logger.log("begin");
        Ok(())
    }

    fn commit(&self) -> Result<(), BoxError> {
        self.logger.log("commit");
        Ok(())
    }

    fn rollback(&self) -> Result<(), BoxError> {
        self.logger.log("rollback");
        Ok(())
    }
}

#[derive(Debug)]
struct InsufficientFunds {
    account: String,
}

impl Display for InsufficientFunds {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "insufficient funds in account {}", self.account)
    }
}

impl Error for InsufficientFunds {}

trait Accounts: Send + Sync {
    fn balances(&self) -> HashMap<String, i64>;

    fn transfer(&self, from: &str, to: &str, amount: i64) -> Result<(), BoxError>;
}

struct MemoryAccounts {
    balances: Mutex<HashMap<String, i64>>,
}

#[component(dyn Accounts)]
impl MemoryAccounts {
    #[inject]
    fn new() -> Self {
        let balances = [("alice", 100), ("bob", 50), ("carol", 0)]
            .into_iter()
            .map(|(name, balance)| (name.to_owned(), balance))
            .collect();
        Self {
            balances: Mutex::new(balances),
        }
    }
}

#[transactional]
impl Accounts for MemoryAccounts {
    fn balances(&self) -> HashMap<String, i64> {
        self.balances.lock().unwrap().clone()
    }

    #[transactional]
    fn transfer(&self, from: &str, to: &str, amount: i64) -> Result<(), BoxError> {
        let mut balances = self.balances.lock().unwrap();
        let available = balances.get(from).copied().unwrap_or_default();
        if available < amount {
            return Err(InsufficientFunds {
                account: from.to_owned(),
            }
            .into());
        }
        *balances.entry(from.to_owned()).or_default() -= amount;
        *balances.entry(to.to_owned()).or_default() += amount;
        Ok(())
    }
}

#[derive(Deserialize)]
struct Transfer {
    from: String,
    to: String,
    amount: i64,
}

#[derive(Serialize)]
struct Audit {
    accounts: usize,
    total: i64,
}

struct BankController {
    accounts: Arc<dyn Accounts>,
}

#[component]
#[controller]
impl BankController {
    #[inject]
    fn new(accounts: Arc<dyn Accounts>) -> Self {
        Self { accounts }
    }

    #[request_handle(method = GET, path = "/balances")]
    fn balances(&self) -> HashMap<String, i64> {
        self.accounts.balances()
    }

    #[request_handle(method = POST, path = "/transfers")]
    fn transfer(&self, request: &Request) -> Result<(), BoxError> {
        let transfer: Transfer = request.json()?.ok_or("missing transfer")?;
        self.accounts
            .transfer(&transfer.from, &transfer.to, transfer.amount)
    }

    #[request_handle(method = GET, path = "/audit")]
    fn audit(&self) -> Audit {
        let balances = self.accounts.balances();
        Audit {
            accounts: balances.len(),
            total: balances.values().sum(),
        }
    }
}
