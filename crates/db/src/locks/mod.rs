//! Named mutual exclusion around sync runs.
//!
//! A [`LockGate`] hands out [`LockLease`]s keyed by an application string.
//! At most one lease per key is live at a time across every process sharing
//! the gate's backend. [`with_lock`] scopes a future to a lease and releases it
//! on every exit path; a lease dropped without release (cancellation) is
//! cleaned up by the implementation's `Drop`.

pub mod memory;
pub mod pg_advisory;

use std::future::Future;

use async_trait::async_trait;

use crate::entity::EntityType;
use reposync_common::error::ReposyncResult;

pub use memory::MemoryLockGate;
pub use pg_advisory::{advisory_key, PgAdvisoryLockGate};

#[async_trait]
pub trait LockLease: Send {
    fn key(&self) -> &str;

    /// Release the lock. Consumes the lease.
    async fn release(self: Box<Self>) -> ReposyncResult<()>;
}

#[async_trait]
pub trait LockGate: Send + Sync {
    /// Wait until the named lock is free, then take it.
    async fn acquire(&self, key: &str) -> ReposyncResult<Box<dyn LockLease>>;

    /// Take the named lock only if nobody holds it.
    async fn try_acquire(&self, key: &str) -> ReposyncResult<Option<Box<dyn LockLease>>>;
}

/// Lock key for one `(repo_id, entity_type)` sync loop.
pub fn lock_key(repo_id: &str, entity_type: EntityType) -> String {
    format!("ingest:{repo_id}:{}", entity_type.slug())
}

/// Run `f` while holding the named lock.
pub async fn with_lock<G, F, Fut, T>(gate: &G, key: &str, f: F) -> ReposyncResult<T>
where
    G: LockGate + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ReposyncResult<T>>,
{
    let lease = gate.acquire(key).await?;
    tracing::debug!(key, "lock acquired");
    finish(lease, f().await).await
}

/// Run `f` only if the named lock is free; `Ok(None)` means someone else holds it.
pub async fn try_with_lock<G, F, Fut, T>(gate: &G, key: &str, f: F) -> ReposyncResult<Option<T>>
where
    G: LockGate + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ReposyncResult<T>>,
{
    let lease = match gate.try_acquire(key).await? {
        Some(lease) => lease,
        None => return Ok(None),
    };
    tracing::debug!(key, "lock acquired");
    finish(lease, f().await).await.map(Some)
}

async fn finish<T>(lease: Box<dyn LockLease>, result: ReposyncResult<T>) -> ReposyncResult<T> {
    let key = lease.key().to_string();
    match (result, lease.release().await) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(release_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            tracing::warn!(key = %key, error = %release_err, "lock release failed after error");
            Err(e)
        }
    }
}
