use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Per content hash async locks.
///
/// Serializes lookup-then-act sequences on one hash while leaving other
/// hashes free. Entries are dropped once no task holds or awaits them.
#[derive(Debug, Clone, Default)]
pub struct HashLocks {
    registry: Registry,
}

impl HashLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, hash: &str) -> HashGuard {
        let mutex = {
            let mut registry = self.registry.lock();
            registry.entry(hash.to_string()).or_default().clone()
        };

        // Created before waiting so a cancelled wait still prunes.
        let entry = Entry {
            hash: hash.to_string(),
            registry: self.registry.clone(),
            mutex,
        };
        let guard = entry.mutex.clone().lock_owned().await;

        HashGuard {
            guard: Some(guard),
            _entry: entry,
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.registry.lock().len()
    }
}

/// One task's interest in a registry entry, held while waiting and while
/// locked.
struct Entry {
    hash: String,
    registry: Registry,
    mutex: Arc<AsyncMutex<()>>,
}

impl Drop for Entry {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();

        // Only the registry's handle and ours left: nobody else holds or waits.
        let idle = registry.get(&self.hash).is_some_and(|mutex| {
            Arc::ptr_eq(mutex, &self.mutex) && Arc::strong_count(mutex) == 2
        });
        if idle {
            registry.remove(&self.hash);
        }
    }
}

pub struct HashGuard {
    guard: Option<OwnedMutexGuard<()>>,
    _entry: Entry,
}

impl Drop for HashGuard {
    fn drop(&mut self) {
        // Unlock before the entry decides whether to prune.
        self.guard.take();
    }
}
