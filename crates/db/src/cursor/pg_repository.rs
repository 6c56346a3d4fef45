use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::cursor::models::{CursorUpdate, SyncCursor};
use crate::cursor::repositories::CursorStore;
use reposync_common::error::{ReposyncError, ReposyncResult};

#[derive(Clone)]
pub struct PgCursorStore {
    pool: PgPool,
}

impl PgCursorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: sqlx::postgres::PgRow) -> ReposyncResult<SyncCursor> {
        Ok(SyncCursor {
            repo_id: row.get("repo_id"),
            entity_type: row.get("entity_type"),
            cursor: row.get("cursor"),
            watermark: row.get("watermark"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl CursorStore for PgCursorStore {
    async fn load(&self, repo_id: &str, entity_type: &str) -> ReposyncResult<Option<SyncCursor>> {
        let row = sqlx::query(
            "select repo_id, entity_type, cursor, watermark, updated_at
             from ingestion_cursors
             where repo_id = $1 and entity_type = $2",
        )
        .bind(repo_id)
        .bind(entity_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReposyncError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }

    async fn save(&self, update: &CursorUpdate) -> ReposyncResult<SyncCursor> {
        // greatest() ignores nulls, so a null incoming watermark keeps the stored one.
        let row = sqlx::query(
            "insert into ingestion_cursors (repo_id, entity_type, cursor, watermark)
             values ($1, $2, $3, $4)
             on conflict (repo_id, entity_type) do update set
               cursor = excluded.cursor,
               watermark = greatest(ingestion_cursors.watermark, excluded.watermark),
               updated_at = now()
             returning repo_id, entity_type, cursor, watermark, updated_at",
        )
        .bind(&update.repo_id)
        .bind(&update.entity_type)
        .bind(&update.cursor)
        .bind(update.watermark)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ReposyncError::Database(e.to_string()))?;

        Self::map_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, hour, 0, 0).unwrap()
    }

    fn update(repo_id: &str, cursor: Option<&str>, watermark: Option<DateTime<Utc>>) -> CursorUpdate {
        CursorUpdate {
            repo_id: repo_id.to_string(),
            entity_type: "ISSUE".to_string(),
            cursor: cursor.map(str::to_string),
            watermark,
        }
    }

    #[tokio::test]
    async fn load_returns_none_for_unknown_key() {
        let pool = match test_pool().await {
            Some(p) => p,
            None => return,
        };
        let store = PgCursorStore::new(pool);
        let repo = Uuid::new_v4().to_string();
        assert!(store.load(&repo, "ISSUE").await.expect("load").is_none());
    }

    #[tokio::test]
    async fn save_inserts_then_overwrites_cursor() {
        let pool = match test_pool().await {
            Some(p) => p,
            None => return,
        };
        let store = PgCursorStore::new(pool);
        let repo = Uuid::new_v4().to_string();

        let first = store
            .save(&update(&repo, Some("c1"), Some(ts(1))))
            .await
            .expect("first save");
        assert_eq!(first.cursor.as_deref(), Some("c1"));
        assert_eq!(first.watermark, Some(ts(1)));

        let second = store
            .save(&update(&repo, Some("c2"), Some(ts(3))))
            .await
            .expect("second save");
        assert_eq!(second.cursor.as_deref(), Some("c2"));
        assert_eq!(second.watermark, Some(ts(3)));

        let loaded = store.load(&repo, "ISSUE").await.expect("load").expect("row");
        assert_eq!(loaded, second);
    }

    #[tokio::test]
    async fn save_never_regresses_watermark() {
        let pool = match test_pool().await {
            Some(p) => p,
            None => return,
        };
        let store = PgCursorStore::new(pool);
        let repo = Uuid::new_v4().to_string();

        store
            .save(&update(&repo, Some("c1"), Some(ts(5))))
            .await
            .expect("save newer");

        let older = store
            .save(&update(&repo, Some("c2"), Some(ts(2))))
            .await
            .expect("save older");
        assert_eq!(older.watermark, Some(ts(5)));
        assert_eq!(older.cursor.as_deref(), Some("c2"));

        let null = store
            .save(&update(&repo, None, None))
            .await
            .expect("save null");
        assert_eq!(null.watermark, Some(ts(5)));
        assert!(null.cursor.is_none());
    }

    #[tokio::test]
    async fn keys_are_independent_per_entity_type() {
        let pool = match test_pool().await {
            Some(p) => p,
            None => return,
        };
        let store = PgCursorStore::new(pool);
        let repo = Uuid::new_v4().to_string();

        store
            .save(&update(&repo, Some("issues-c"), Some(ts(4))))
            .await
            .expect("save issue cursor");

        assert!(store.load(&repo, "PR").await.expect("load pr").is_none());
    }
}
