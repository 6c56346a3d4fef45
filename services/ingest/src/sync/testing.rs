//! In-memory fetchers and persisters for exercising the engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use reposync_common::error::{ReposyncError, ReposyncResult};

use super::types::{Page, PageFetcher, PageInfo, PagePersister, PageRequest, RateLimitSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

pub fn item(id: &str, updated_at: DateTime<Utc>) -> Item {
    Item {
        id: id.to_string(),
        updated_at,
    }
}

pub fn item_updated_at(item: &Item) -> DateTime<Utc> {
    item.updated_at
}

/// 2026-02-01 at the given hour, UTC.
pub fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, hour, 0, 0).unwrap()
}

pub fn page(nodes: Vec<Item>, next_cursor: Option<&str>, has_more: bool) -> Page<Item> {
    Page {
        nodes,
        page_info: PageInfo {
            next_cursor: next_cursor.map(str::to_string),
            has_more,
        },
        rate_limit: None,
    }
}

pub fn with_rate_limit(mut page: Page<Item>, remaining: i64, reset_at: DateTime<Utc>) -> Page<Item> {
    page.rate_limit = Some(RateLimitSnapshot {
        remaining,
        reset_at: reset_at.to_rfc3339(),
    });
    page
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Serves pre-built pages keyed by the requested cursor.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<Option<String>, Page<Item>>,
    calls: Mutex<Vec<Option<String>>>,
    events: Option<(String, EventLog)>,
    latency: Duration,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_at(mut self, cursor: Option<&str>, page: Page<Item>) -> Self {
        self.pages.insert(cursor.map(str::to_string), page);
        self
    }

    pub fn with_events(mut self, tag: &str, log: EventLog, latency: Duration) -> Self {
        self.events = Some((tag.to_string(), log));
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher<Item> for ScriptedFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> ReposyncResult<Page<Item>> {
        self.calls.lock().unwrap().push(request.cursor.clone());
        if let Some((tag, log)) = &self.events {
            log.lock().unwrap().push(format!("{tag}:fetch"));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.pages
            .get(&request.cursor)
            .cloned()
            .ok_or_else(|| ReposyncError::Upstream(format!("no page scripted at {:?}", request.cursor)))
    }
}

/// Records persisted ids; can be told to fail on the n-th call (1-based).
#[derive(Default)]
pub struct RecordingPersister {
    persisted: Mutex<Vec<String>>,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
    events: Option<(String, EventLog)>,
}

impl RecordingPersister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_call(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn with_events(mut self, tag: &str, log: EventLog) -> Self {
        self.events = Some((tag.to_string(), log));
        self
    }

    pub fn persisted(&self) -> Vec<String> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PagePersister<Item> for RecordingPersister {
    async fn persist(&self, nodes: &[Item]) -> ReposyncResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(ReposyncError::Database("simulated write failure".to_string()));
        }
        if let Some((tag, log)) = &self.events {
            log.lock().unwrap().push(format!("{tag}:persist"));
        }
        self.persisted
            .lock()
            .unwrap()
            .extend(nodes.iter().map(|n| n.id.clone()));
        Ok(())
    }
}
