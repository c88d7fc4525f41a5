use std::convert::Infallible;
use std::io::{Error as IoError, ErrorKind};
use std::sync::Arc;

use beanwire::prelude::*;

pub struct Clock;

#[component]
impl Clock {
    #[inject]
    pub fn new() -> Self {
        Self
    }
}

pub struct Scheduler {
    _clock: Arc<Clock>,
}

#[component]
impl Scheduler {
    #[inject]
    pub fn with_clock(clock: Arc<Clock>) -> Scheduler {
        Scheduler { _clock: clock }
    }
}

pub struct Journal;

#[component]
impl Journal {
    #[inject]
    pub fn open() -> Result<Self, Infallible> {
        Ok(Self)
    }
}

pub struct Socket;

#[component]
impl Socket {
    #[inject]
    pub fn bind() -> Result<Socket, IoError> {
        Err(IoError::new(ErrorKind::AddrInUse, "port 8080 is taken"))
    }
}

pub struct Cache;

#[component]
impl Cache {
    #[inject]
    pub fn warm() -> std::result::Result<Cache, Box<dyn std::error::Error + Send + Sync>> {
        Err("cache backend is offline".into())
    }
}

fn main() {
    let registry = get_instance!().unwrap();

    assert!(registry.provide::<Scheduler>().is_ok());
    assert!(registry.provide::<Journal>().is_ok());

    let Some(LookupError::Instantiation { source, .. }) = registry.provide::<Socket>().err() else {
        panic!("binding the socket should fail");
    };
    assert_eq!(source.to_string(), "port 8080 is taken");
    assert!(registry.provide::<Cache>().is_err());
}
