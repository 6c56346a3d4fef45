pub mod cursor;
pub mod entity;
pub mod github;
pub mod locks;
pub mod migrations;

pub use entity::EntityType;
pub use migrations::migrate;

use reposync_common::error::{ReposyncError, ReposyncResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create a Postgres connection pool from a database URL.
///
/// The pool is owned by the caller; close it with [`PgPool::close`] at shutdown.
pub async fn create_pool(database_url: &str, max_connections: u32) -> ReposyncResult<PgPool> {
    tracing::info!(max_connections, "connecting to database");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| ReposyncError::Database(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_pool_fails_with_invalid_url() {
        let result = create_pool("postgres://invalid:5432/nonexistent", 1).await;
        assert!(result.is_err());
    }
}
