//! Test isolation for shared process state.
//!
//! Registered modules are global, so tests that patch them must not run
//! concurrently with tests that read them. Both sides take the same named
//! lock for the duration of the test.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};

static LOCKS: Lazy<Mutex<HashMap<String, Arc<Resource>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Default)]
struct Resource {
    held: Mutex<bool>,
    freed: Condvar,
}

/// Exclusive hold on a named resource, released on drop.
pub struct ResourceLock {
    resource_name: String,
    resource: Arc<Resource>,
}

impl ResourceLock {
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }
}

impl Drop for ResourceLock {
    fn drop(&mut self) {
        *self.resource.held.lock() = false;
        self.resource.freed.notify_one();
        tracing::debug!("Released lock for resource: {}", self.resource_name);
    }
}

/// Block until the named resource is free, then hold it.
pub fn acquire_resource_lock(resource_name: &str) -> ResourceLock {
    tracing::debug!("Acquiring lock for resource: {}", resource_name);
    let resource = LOCKS
        .lock()
        .entry(resource_name.to_string())
        .or_default()
        .clone();
    {
        let mut held = resource.held.lock();
        while *held {
            resource.freed.wait(&mut held);
        }
        *held = true;
    }
    ResourceLock {
        resource_name: resource_name.to_string(),
        resource,
    }
}

/// Whether someone currently holds the named resource.
pub fn is_resource_locked(resource_name: &str) -> bool {
    LOCKS
        .lock()
        .get(resource_name)
        .map(|resource| *resource.held.lock())
        .unwrap_or(false)
}
