use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use reposync_common::error::ReposyncResult;
use reposync_db::EntityType;

pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Which repository a run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub repo_id: String,
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub owner: String,
    pub name: String,
    pub cursor: Option<String>,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Quota reported by the upstream alongside a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub remaining: i64,
    /// RFC 3339 instant the quota resets; kept raw so bad values can be reported.
    pub reset_at: String,
}

/// One page of nodes, ordered ascending by last-modified time.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub nodes: Vec<T>,
    pub page_info: PageInfo,
    pub rate_limit: Option<RateLimitSnapshot>,
}

#[async_trait]
pub trait PageFetcher<T: Send>: Send + Sync {
    /// Fetch the page after `request.cursor`.
    ///
    /// Must fail with `ReposyncError::NotFound` when the collection does not
    /// exist upstream; an existing but empty collection is an empty page.
    async fn fetch_page(&self, request: &PageRequest) -> ReposyncResult<Page<T>>;
}

#[async_trait]
pub trait PagePersister<T: Sync>: Send + Sync {
    /// Atomically upsert a batch. Must be idempotent: a retried run re-delivers pages.
    async fn persist(&self, nodes: &[T]) -> ReposyncResult<()>;
}

/// Everything the engine needs to sync one entity type.
pub struct EntitySyncConfig<T: Send + Sync> {
    pub entity_type: EntityType,
    pub page_size: u32,
    pub fetcher: Arc<dyn PageFetcher<T>>,
    pub persister: Arc<dyn PagePersister<T>>,
    pub extract_updated_at: fn(&T) -> DateTime<Utc>,
}

impl<T: Send + Sync> EntitySyncConfig<T> {
    pub fn new(
        entity_type: EntityType,
        fetcher: Arc<dyn PageFetcher<T>>,
        persister: Arc<dyn PagePersister<T>>,
        extract_updated_at: fn(&T) -> DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type,
            page_size: DEFAULT_PAGE_SIZE,
            fetcher,
            persister,
            extract_updated_at,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    PagesExhausted,
    WatermarkReached,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncRunReport {
    pub entity_type: EntityType,
    pub pages: usize,
    pub fetched: usize,
    pub persisted: usize,
    pub cursor: Option<String>,
    pub watermark: Option<DateTime<Utc>>,
    pub termination: Termination,
}
