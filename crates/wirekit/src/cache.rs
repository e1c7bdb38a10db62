//! Singleton cache
//!
//! One coarse re-entrant lock guards the whole cache and is held across
//! check, construct and store, so a slot is filled at most once even when many
//! threads race for it. Building a singleton that itself depends on singletons
//! re-enters the lock on the same thread.

use std::cell::RefCell;
use std::collections::HashMap;

use parking_lot::ReentrantMutex;
use tracing::trace;

use crate::descriptor::TypeDescriptor;
use crate::error::DIResult;
use crate::instance::Instance;
use crate::key::SelectorKey;

/// Cache slot: which dependency was requested, under which registered key,
/// built from which implementation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dependency: TypeDescriptor,
    pub key: SelectorKey,
    pub implementation: TypeDescriptor,
}

impl CacheKey {
    pub fn new(dependency: TypeDescriptor, key: SelectorKey, implementation: TypeDescriptor) -> Self {
        Self {
            dependency,
            key,
            implementation,
        }
    }
}

#[derive(Default)]
pub struct SingletonCache {
    slots: ReentrantMutex<RefCell<HashMap<CacheKey, Instance>>>,
}

impl SingletonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance for `key`, or the result of `create` stored under it.
    ///
    /// A failed `create` leaves the slot empty.
    pub fn get_or_create<F>(&self, key: CacheKey, create: F) -> DIResult<Instance>
    where
        F: FnOnce() -> DIResult<Instance>,
    {
        let guard = self.slots.lock();
        if let Some(instance) = guard.borrow().get(&key).cloned() {
            trace!("Singleton cache hit: {}", key.implementation);
            return Ok(instance);
        }

        // The RefCell is not borrowed while `create` runs, so nested singletons
        // can take their own slots.
        let instance = create()?;
        let stored = guard
            .borrow_mut()
            .entry(key)
            .or_insert(instance)
            .clone();
        Ok(stored)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
