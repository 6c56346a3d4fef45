use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

use crate::locks::{LockGate, LockLease};
use reposync_common::error::{ReposyncError, ReposyncResult};

/// Map a lock name to a Postgres advisory lock id.
///
/// 31-multiplier rolling hash over UTF-16 code units, masked to 63 bits. The
/// mapping must stay stable across releases: every process contending for a key
/// has to land on the same id.
pub fn advisory_key(key: &str) -> i64 {
    const MASK: u64 = 0x7fff_ffff_ffff_ffff;
    let hash = key
        .encode_utf16()
        .fold(0u64, |acc, unit| (acc.wrapping_mul(31).wrapping_add(u64::from(unit))) & MASK);
    hash as i64
}

/// Session-scoped `pg_advisory_lock` gate.
///
/// Each lease pins one pooled connection for its lifetime, because advisory
/// locks belong to the session that took them.
#[derive(Clone)]
pub struct PgAdvisoryLockGate {
    pool: PgPool,
}

impl PgAdvisoryLockGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> ReposyncResult<PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| ReposyncError::Database(e.to_string()))
    }
}

struct PgAdvisoryLease {
    key: String,
    lock_id: i64,
    conn: Option<PoolConnection<Postgres>>,
}

impl PgAdvisoryLease {
    fn pending(key: &str, conn: PoolConnection<Postgres>) -> Self {
        Self {
            key: key.to_string(),
            lock_id: advisory_key(key),
            conn: Some(conn),
        }
    }
}

#[async_trait]
impl LockLease for PgAdvisoryLease {
    fn key(&self) -> &str {
        &self.key
    }

    async fn release(self: Box<Self>) -> ReposyncResult<()> {
        let mut lease = self;
        let Some(mut conn) = lease.conn.take() else {
            return Ok(());
        };

        let unlocked: Result<bool, sqlx::Error> = sqlx::query_scalar("select pg_advisory_unlock($1)")
            .bind(lease.lock_id)
            .fetch_one(&mut *conn)
            .await;

        match unlocked {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!(key = %lease.key, lock_id = lease.lock_id, "advisory lock was not held at release");
                Ok(())
            }
            Err(e) => {
                // Closing the session is the only other way to drop the lock.
                drop(conn.detach());
                Err(ReposyncError::Database(e.to_string()))
            }
        }
    }
}

impl Drop for PgAdvisoryLease {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!(
                key = %self.key,
                lock_id = self.lock_id,
                "advisory lock session abandoned, closing it"
            );
            drop(conn.detach());
        }
    }
}

#[async_trait]
impl LockGate for PgAdvisoryLockGate {
    async fn acquire(&self, key: &str) -> ReposyncResult<Box<dyn LockLease>> {
        // The lease owns the session before the lock is requested, so a caller
        // that stops waiting closes the session instead of pooling a queued lock.
        let mut lease = PgAdvisoryLease::pending(key, self.connection().await?);

        if let Some(conn) = lease.conn.as_mut() {
            sqlx::query("select pg_advisory_lock($1)")
                .bind(lease.lock_id)
                .execute(&mut **conn)
                .await
                .map_err(|e| ReposyncError::Database(e.to_string()))?;
        }

        Ok(Box::new(lease))
    }

    async fn try_acquire(&self, key: &str) -> ReposyncResult<Option<Box<dyn LockLease>>> {
        let mut lease = PgAdvisoryLease::pending(key, self.connection().await?);

        let mut acquired = false;
        if let Some(conn) = lease.conn.as_mut() {
            acquired = sqlx::query_scalar("select pg_try_advisory_lock($1)")
                .bind(lease.lock_id)
                .fetch_one(&mut **conn)
                .await
                .map_err(|e| ReposyncError::Database(e.to_string()))?;
        }

        if !acquired {
            // nothing held, the session can go back to the pool
            drop(lease.conn.take());
            return Ok(None);
        }

        Ok(Some(Box::new(lease)))
    }
}
