use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One issue, pull request or discussion as stored locally.
///
/// Identity for upserts is `(repo_id, external_id)`; `id` is only used when the
/// row is first inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRecord {
    pub id: Uuid,
    pub repo_id: String,
    pub external_id: String,
    pub number: i64,
    pub title: String,
    pub state: String,
    pub url: String,
    pub author_login: Option<String>,
    pub body: Option<String>,
    pub labels: Vec<String>,
    pub comment_count: i32,
    pub created_at_gh: DateTime<Utc>,
    pub updated_at_gh: DateTime<Utc>,
    pub raw_payload: Option<serde_json::Value>,
}
