//! Process-wide session lock registry.
//!
//! Every [`Session`](crate::Session) handle for a given name shares one
//! [`SessionLock`]. Entries are created on first reference and never removed.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Mutual-exclusion lock shared by all handles for one session name.
pub type SessionLock = Arc<Mutex<()>>;

/// Concurrent map from session name to its lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    locks: DashMap<String, SessionLock>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> Arc<SessionRegistry> {
        static GLOBAL: OnceLock<Arc<SessionRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SessionRegistry::new())))
    }

    /// Returns the lock for `name`, installing a new one if none exists.
    ///
    /// The lookup and insert happen under the same shard guard, so concurrent
    /// callers for an unseen name always converge on one instance.
    pub fn acquire_lock(&self, name: &str) -> SessionLock {
        if let Some(lock) = self.locks.get(name) {
            return Arc::clone(lock.value());
        }
        Arc::clone(
            self.locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Number of names seen so far.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no name has been registered.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_lock() {
        let registry = SessionRegistry::new();
        let a = registry.acquire_lock("work");
        let b = registry.acquire_lock("work");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_names_distinct_locks() {
        let registry = SessionRegistry::new();
        let a = registry.acquire_lock("one");
        let b = registry.acquire_lock("two");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_global_is_shared() {
        let a = SessionRegistry::global().acquire_lock("registry-global-test");
        let b = SessionRegistry::global().acquire_lock("registry-global-test");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_concurrent_acquire_converges() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.acquire_lock("contended"))
            })
            .collect();

        let locks: Vec<SessionLock> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(locks.iter().all(|l| Arc::ptr_eq(l, &locks[0])));
        assert_eq!(registry.len(), 1);
    }
}
