use async_trait::async_trait;

use crate::entity::EntityType;
use crate::github::models::WorkItemRecord;
use reposync_common::error::ReposyncResult;

/// Batch sink for work items.
#[async_trait]
pub trait WorkItemSink: Send + Sync {
    /// Insert or update `records` atomically, keyed by `(repo_id, external_id)`.
    ///
    /// Every field takes the incoming value except `updated_at_gh`, which never
    /// moves backwards. An empty batch is a no-op.
    async fn upsert_items(
        &self,
        entity_type: EntityType,
        records: &[WorkItemRecord],
    ) -> ReposyncResult<()>;
}
