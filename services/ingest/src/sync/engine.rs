use std::sync::Arc;

use chrono::{DateTime, Utc};

use reposync_common::error::ReposyncResult;
use reposync_db::cursor::{merge_watermark, CursorStore, CursorUpdate};

use super::rate_limit::RateLimitGovernor;
use super::types::{EntitySyncConfig, PageRequest, SyncRequest, SyncRunReport, Termination};

/// Page-fetch-filter-persist loop for one entity type of one repository.
///
/// Callers must hold the lock for `(repo_id, entity_type)` while a run is in
/// flight; the engine itself does no locking.
pub struct IncrementalSyncEngine<S: CursorStore + ?Sized> {
    cursor_store: Arc<S>,
    governor: RateLimitGovernor,
    watermark_overlap: chrono::Duration,
}

impl<S: CursorStore + ?Sized> IncrementalSyncEngine<S> {
    pub fn new(cursor_store: Arc<S>, governor: RateLimitGovernor) -> Self {
        Self {
            cursor_store,
            governor,
            watermark_overlap: chrono::Duration::zero(),
        }
    }

    /// Re-admit items modified up to `overlap` before the watermark.
    ///
    /// Trades a few idempotent re-upserts for tolerance of upstream clock skew.
    pub fn with_watermark_overlap(mut self, overlap: std::time::Duration) -> Self {
        self.watermark_overlap =
            chrono::Duration::from_std(overlap).unwrap_or_else(|_| chrono::Duration::zero());
        self
    }

    pub async fn run<T: Send + Sync>(
        &self,
        request: &SyncRequest,
        config: &EntitySyncConfig<T>,
    ) -> ReposyncResult<SyncRunReport> {
        let entity_type = config.entity_type.as_str();
        tracing::info!(
            repo_id = %request.repo_id,
            owner = %request.owner,
            name = %request.name,
            entity_type,
            page_size = config.page_size,
            "starting incremental sync"
        );

        let stored = self
            .cursor_store
            .load(&request.repo_id, entity_type)
            .await?;
        let (mut cursor, mut watermark) = match stored {
            Some(s) => (s.cursor, s.watermark),
            None => (None, None),
        };

        let mut report = SyncRunReport {
            entity_type: config.entity_type,
            pages: 0,
            fetched: 0,
            persisted: 0,
            cursor: cursor.clone(),
            watermark,
            termination: Termination::PagesExhausted,
        };

        loop {
            let page = config
                .fetcher
                .fetch_page(&PageRequest {
                    owner: request.owner.clone(),
                    name: request.name.clone(),
                    cursor: cursor.clone(),
                    page_size: config.page_size,
                })
                .await?;

            let filtered = filter_page(
                &page.nodes,
                self.boundary(watermark),
                config.extract_updated_at,
            );
            if filtered.ordering_violations > 0 {
                tracing::warn!(
                    entity_type,
                    violations = filtered.ordering_violations,
                    "page not ordered by updated time, early stop may skip items"
                );
            }

            if !filtered.kept.is_empty() {
                config.persister.persist(filtered.kept).await?;
            }

            // An empty tail page has no end cursor; keep the last good position.
            let next_cursor = page
                .page_info
                .next_cursor
                .clone()
                .or_else(|| cursor.clone());
            let saved = self
                .cursor_store
                .save(&CursorUpdate {
                    repo_id: request.repo_id.clone(),
                    entity_type: entity_type.to_string(),
                    cursor: next_cursor.clone(),
                    watermark: merge_watermark(watermark, filtered.max_updated_at),
                })
                .await?;
            watermark = saved.watermark;

            report.pages += 1;
            report.fetched += page.nodes.len();
            report.persisted += filtered.kept.len();
            tracing::info!(
                entity_type,
                page = report.pages,
                fetched = page.nodes.len(),
                persisted = filtered.kept.len(),
                has_more = page.page_info.has_more,
                "processed page"
            );

            cursor = next_cursor;

            if filtered.boundary_reached {
                tracing::info!(entity_type, "reached previously synced items, stopping");
                report.termination = Termination::WatermarkReached;
                break;
            }
            if !page.page_info.has_more {
                report.termination = Termination::PagesExhausted;
                break;
            }
            if page.page_info.next_cursor.is_none() {
                tracing::warn!(entity_type, "upstream reported more pages without a cursor, stopping");
                report.termination = Termination::PagesExhausted;
                break;
            }

            self.governor.wait(page.rate_limit.as_ref()).await;
        }

        report.cursor = cursor;
        report.watermark = watermark;
        tracing::info!(
            repo_id = %request.repo_id,
            entity_type,
            pages = report.pages,
            fetched = report.fetched,
            persisted = report.persisted,
            cursor = ?report.cursor,
            watermark = ?report.watermark,
            termination = ?report.termination,
            "incremental sync complete"
        );
        Ok(report)
    }

    fn boundary(&self, watermark: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        watermark.map(|w| w - self.watermark_overlap)
    }
}

#[derive(Debug)]
pub(crate) struct FilteredPage<'a, T> {
    /// Leading nodes strictly newer than the boundary.
    pub kept: &'a [T],
    pub boundary_reached: bool,
    pub max_updated_at: Option<DateTime<Utc>>,
    pub ordering_violations: usize,
}

/// Keep nodes while they are newer than `boundary`; the first one at or
/// before it ends the run. With no boundary every node is kept.
pub(crate) fn filter_page<T>(
    nodes: &[T],
    boundary: Option<DateTime<Utc>>,
    extract_updated_at: fn(&T) -> DateTime<Utc>,
) -> FilteredPage<'_, T> {
    let stop_at = boundary.and_then(|b| nodes.iter().position(|n| extract_updated_at(n) <= b));
    let kept = &nodes[..stop_at.unwrap_or(nodes.len())];

    let ordering_violations = nodes
        .windows(2)
        .filter(|w| extract_updated_at(&w[1]) < extract_updated_at(&w[0]))
        .count();

    FilteredPage {
        kept,
        boundary_reached: stop_at.is_some(),
        max_updated_at: kept.iter().map(extract_updated_at).max(),
        ordering_violations,
    }
}
