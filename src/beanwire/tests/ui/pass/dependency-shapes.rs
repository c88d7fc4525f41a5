use std::collections::{LinkedList, VecDeque};
use std::sync::Arc;

use beanwire::prelude::*;

pub trait Listener: Send + Sync {}

pub trait Named: Send + Sync {}

pub struct Console;

#[component(dyn Listener, dyn Named)]
impl Console {
    #[inject]
    fn new() -> Self {
        Self
    }
}

impl Listener for Console {}

impl Named for Console {}

pub struct Bus {
    _console: Arc<Console>,
    _named: Arc<dyn Named>,
    _listeners: Vec<Arc<dyn Listener>>,
    _queue: VecDeque<Arc<dyn Listener>>,
    _chain: std::collections::LinkedList<Arc<Console>>,
}

#[component]
impl Bus {
    #[inject]
    fn new(
        console: Arc<Console>,
        named: std::sync::Arc<dyn Named>,
        listeners: Vec<Arc<dyn Listener>>,
        queue: VecDeque<Arc<dyn Listener>>,
        chain: LinkedList<Arc<Console>>,
    ) -> Self {
        Self {
            _console: console,
            _named: named,
            _listeners: listeners,
            _queue: queue,
            _chain: chain,
        }
    }
}

fn main() {
    let registry = get_instance!().unwrap();
    let bus = registry.provide::<Bus>().unwrap();
    assert_eq!(bus._listeners.len(), 1);
    assert_eq!(registry.provide_all::<dyn Named>().unwrap().len(), 1);
}
