//! Lease-based lock substrate backing leader election for the watcher.
//!
//! Mirrors a Redis `SET key value NX PX ttl` CAS: `try_acquire` only
//! succeeds if the key is absent or already held by `holder`. Only an
//! in-process implementation ships here; a Redis-backed one is a drop-in
//! behind the same trait for multi-node deployment.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

pub trait LockStore: Send + Sync {
    /// Attempt to acquire `key` for `holder` with the given TTL. Succeeds if
    /// the key is unheld, expired, or already held by `holder` (crash
    /// recovery / lease renewal on the same node).
    fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> bool;
    /// Extend the TTL of a lease already held by `holder`. No-op (returns
    /// false) if `holder` does not currently hold `key`.
    fn refresh(&self, key: &str, holder: &str, ttl: Duration) -> bool;
    fn release(&self, key: &str, holder: &str);
}

struct Lease {
    holder: String,
    expires_at: Instant,
}

pub struct InProcessLockStore {
    leases: Mutex<HashMap<String, Lease>>,
}

impl InProcessLockStore {
    pub fn new() -> Self {
        Self {
            leases: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InProcessLockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStore for InProcessLockStore {
    fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> bool {
        let mut leases = self.leases.lock();
        let now = Instant::now();
        match leases.get(key) {
            Some(lease) if lease.expires_at > now && lease.holder != holder => false,
            _ => {
                leases.insert(
                    key.to_string(),
                    Lease {
                        holder: holder.to_string(),
                        expires_at: now + ttl,
                    },
                );
                true
            }
        }
    }

    fn refresh(&self, key: &str, holder: &str, ttl: Duration) -> bool {
        let mut leases = self.leases.lock();
        match leases.get_mut(key) {
            Some(lease) if lease.holder == holder => {
                lease.expires_at = Instant::now() + ttl;
                true
            }
            _ => false,
        }
    }

    fn release(&self, key: &str, holder: &str) {
        let mut leases = self.leases.lock();
        if let Some(lease) = leases.get(key) {
            if lease.holder == holder {
                leases.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_node_cannot_acquire_held_lease() {
        let store = InProcessLockStore::new();
        assert!(store.try_acquire("match:1", "node-a", Duration::from_secs(10)));
        assert!(!store.try_acquire("match:1", "node-b", Duration::from_secs(10)));
    }

    #[test]
    fn same_holder_can_reacquire() {
        let store = InProcessLockStore::new();
        assert!(store.try_acquire("match:1", "node-a", Duration::from_secs(10)));
        assert!(store.try_acquire("match:1", "node-a", Duration::from_secs(10)));
    }

    #[test]
    fn expired_lease_can_be_taken_over() {
        let store = InProcessLockStore::new();
        assert!(store.try_acquire("match:1", "node-a", Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(20));
        assert!(store.try_acquire("match:1", "node-b", Duration::from_secs(10)));
    }

    #[test]
    fn refresh_requires_current_holder() {
        let store = InProcessLockStore::new();
        store.try_acquire("match:1", "node-a", Duration::from_secs(10));
        assert!(!store.refresh("match:1", "node-b", Duration::from_secs(10)));
        assert!(store.refresh("match:1", "node-a", Duration::from_secs(10)));
    }

    #[test]
    fn release_only_by_holder() {
        let store = InProcessLockStore::new();
        store.try_acquire("match:1", "node-a", Duration::from_secs(10));
        store.release("match:1", "node-b");
        assert!(!store.try_acquire("match:1", "node-b", Duration::from_secs(10)));
        store.release("match:1", "node-a");
        assert!(store.try_acquire("match:1", "node-b", Duration::from_secs(10)));
    }
}
