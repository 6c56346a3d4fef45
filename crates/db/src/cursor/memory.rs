use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::cursor::models::{merge_watermark, CursorUpdate, SyncCursor};
use crate::cursor::repositories::CursorStore;
use reposync_common::error::{ReposyncError, ReposyncResult};

/// Process-local [`CursorStore`] with the same merge rules as the Postgres store.
#[derive(Default)]
pub struct MemoryCursorStore {
    rows: Mutex<HashMap<(String, String), SyncCursor>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self, repo_id: &str, entity_type: &str) -> ReposyncResult<Option<SyncCursor>> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| ReposyncError::Internal("cursor store lock poisoned".to_string()))?;
        Ok(rows
            .get(&(repo_id.to_string(), entity_type.to_string()))
            .cloned())
    }

    async fn save(&self, update: &CursorUpdate) -> ReposyncResult<SyncCursor> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| ReposyncError::Internal("cursor store lock poisoned".to_string()))?;

        let key = (update.repo_id.clone(), update.entity_type.clone());
        let stored_watermark = rows.get(&key).and_then(|row| row.watermark);

        let row = SyncCursor {
            repo_id: update.repo_id.clone(),
            entity_type: update.entity_type.clone(),
            cursor: update.cursor.clone(),
            watermark: merge_watermark(stored_watermark, update.watermark),
            updated_at: Utc::now(),
        };
        rows.insert(key, row.clone());
        Ok(row)
    }
}
