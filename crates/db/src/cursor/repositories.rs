use async_trait::async_trait;

use crate::cursor::models::{CursorUpdate, SyncCursor};
use reposync_common::error::ReposyncResult;

/// Durable `(repo_id, entity_type) -> (cursor, watermark)` mapping.
///
/// Implementations do no locking of their own; callers serialize writers per
/// key through a [`crate::locks::LockGate`].
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Load the stored cursor, or `None` if this key has never been synced.
    async fn load(&self, repo_id: &str, entity_type: &str) -> ReposyncResult<Option<SyncCursor>>;

    /// Upsert the cursor after a page.
    ///
    /// `cursor` is always overwritten. `watermark` is merged with the stored
    /// value using max, and a `None` watermark leaves the stored one untouched.
    async fn save(&self, update: &CursorUpdate) -> ReposyncResult<SyncCursor>;
}
