use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::locks::{LockGate, LockLease};
use reposync_common::error::{ReposyncError, ReposyncResult};

/// In-process named locks. Serializes callers sharing one instance only.
#[derive(Default)]
pub struct MemoryLockGate {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MemoryLockGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> ReposyncResult<Arc<AsyncMutex<()>>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| ReposyncError::Internal("lock table poisoned".to_string()))?;
        Ok(slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }
}

struct MemoryLease {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LockLease for MemoryLease {
    fn key(&self) -> &str {
        &self.key
    }

    async fn release(self: Box<Self>) -> ReposyncResult<()> {
        drop(self);
        Ok(())
    }
}

#[async_trait]
impl LockGate for MemoryLockGate {
    async fn acquire(&self, key: &str) -> ReposyncResult<Box<dyn LockLease>> {
        let guard = self.slot(key)?.lock_owned().await;
        Ok(Box::new(MemoryLease {
            key: key.to_string(),
            _guard: guard,
        }))
    }

    async fn try_acquire(&self, key: &str) -> ReposyncResult<Option<Box<dyn LockLease>>> {
        let lease = self.slot(key)?.try_lock_owned().ok().map(|guard| {
            Box::new(MemoryLease {
                key: key.to_string(),
                _guard: guard,
            }) as Box<dyn LockLease>
        });
        Ok(lease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let gate = MemoryLockGate::new();
        let a = gate.acquire("ingest:r:issues").await.unwrap();
        let b = gate.try_acquire("ingest:r:prs").await.unwrap();
        assert!(b.is_some());
        assert_eq!(a.key(), "ingest:r:issues");
    }

    #[tokio::test]
    async fn same_key_waits_for_release() {
        let gate = Arc::new(MemoryLockGate::new());
        let first = gate.acquire("k").await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire("k").await.map(|lease| lease.key().to_string()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        first.release().await.unwrap();
        let key = waiter.await.unwrap().unwrap();
        assert_eq!(key, "k");
    }

    #[tokio::test]
    async fn dropped_lease_frees_the_key() {
        let gate = MemoryLockGate::new();
        {
            let _lease = gate.acquire("k").await.unwrap();
            assert!(gate.try_acquire("k").await.unwrap().is_none());
        }
        assert!(gate.try_acquire("k").await.unwrap().is_some());
    }
}
