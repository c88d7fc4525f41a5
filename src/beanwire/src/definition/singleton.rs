use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use crate::key::TypeKey;
use crate::provider::{Instance, LookupError};

enum Slot {
    Empty,
    Constructing,
    Ready(Instance),
}

/// A lazily filled, at-most-once cache for a singleton bean.
///
/// Concurrent first accesses are serialized: one caller runs the
/// initializer while the others wait and then observe its result. A failed
/// or panicking initializer leaves the cell empty, so the next access tries
/// again. Re-entering the cell from the thread that is currently filling it
/// reports [`LookupError::CyclicDependency`] instead of deadlocking.
///
/// Two threads building each other's dependencies at the same time will
/// still deadlock.
pub struct SingletonCell {
    slot: ReentrantMutex<RefCell<Slot>>,
}

impl SingletonCell {
    pub fn new() -> Self {
        Self {
            slot: ReentrantMutex::new(RefCell::new(Slot::Empty)),
        }
    }

    pub fn get(&self) -> Option<Instance> {
        match &*self.slot.lock().borrow() {
            Slot::Ready(instance) => Some(Arc::clone(instance)),
            _ => None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(&*self.slot.lock().borrow(), Slot::Ready(_))
    }

    pub fn get_or_try_init<F>(&self, key: TypeKey, init: F) -> Result<Instance, LookupError>
    where
        F: FnOnce() -> Result<Instance, LookupError>,
    {
        let guard = self.slot.lock();
        {
            let mut slot = guard.borrow_mut();
            match &*slot {
                Slot::Ready(instance) => return Ok(Arc::clone(instance)),
                Slot::Constructing => return Err(LookupError::CyclicDependency { key }),
                Slot::Empty => *slot = Slot::Constructing,
            }
        }

        let reset = ResetOnDrop { slot: &*guard };
        let instance = init()?;
        std::mem::forget(reset);

        *guard.borrow_mut() = Slot::Ready(Arc::clone(&instance));
        Ok(instance)
    }
}

impl std::fmt::Debug for SingletonCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonCell")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

struct ResetOnDrop<'a> {
    slot: &'a RefCell<Slot>,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        *self.slot.borrow_mut() = Slot::Empty;
    }
}
