use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reposync_db::github::WorkItemRecord;
use reposync_db::EntityType;

use super::query;

// ── GraphQL envelope ──

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// `data` of every work item query: the connection is aliased to `items`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryItemsData<N> {
    pub rate_limit: Option<RateLimitNode>,
    pub repository: Option<RepositoryItems<N>>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryItems<N> {
    pub items: Option<Connection<N>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "N: Deserialize<'de>"))]
pub struct Connection<N> {
    #[serde(default)]
    pub nodes: Option<Vec<N>>,
    pub page_info: PageInfoNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfoNode {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitNode {
    pub remaining: i64,
    pub reset_at: String,
}

// ── Shared node fields ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConnection {
    #[serde(default)]
    pub nodes: Vec<LabelNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelNode {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountConnection {
    pub total_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionCategory {
    pub name: String,
}

// ── Work item nodes ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueNode {
    pub id: String,
    pub number: i64,
    pub title: String,
    pub state: String,
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Actor>,
    #[serde(default)]
    pub labels: Option<LabelConnection>,
    #[serde(default)]
    pub comments: Option<CountConnection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub id: String,
    pub number: i64,
    pub title: String,
    pub state: String,
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Actor>,
    #[serde(default)]
    pub labels: Option<LabelConnection>,
    #[serde(default)]
    pub comments: Option<CountConnection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionNode {
    pub id: String,
    pub number: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub category: Option<DiscussionCategory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Actor>,
    #[serde(default)]
    pub labels: Option<LabelConnection>,
    #[serde(default)]
    pub comments: Option<CountConnection>,
}

/// A node type served by one of the repository connection queries.
pub trait WorkItemNode: DeserializeOwned + Serialize + Send + Sync + 'static {
    const ENTITY_TYPE: EntityType;
    const QUERY: &'static str;

    fn updated_at(&self) -> DateTime<Utc>;

    fn to_record(&self, repo_id: &str) -> WorkItemRecord;
}

impl WorkItemNode for IssueNode {
    const ENTITY_TYPE: EntityType = EntityType::Issue;
    const QUERY: &'static str = query::ISSUES_QUERY;

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn to_record(&self, repo_id: &str) -> WorkItemRecord {
        WorkItemRecord {
            id: Uuid::new_v4(),
            repo_id: repo_id.to_string(),
            external_id: self.id.clone(),
            number: self.number,
            title: self.title.clone(),
            state: self.state.clone(),
            url: self.url.clone(),
            author_login: author_login(&self.author),
            body: self.body.clone(),
            labels: label_names(&self.labels),
            comment_count: comment_count(&self.comments),
            created_at_gh: self.created_at,
            updated_at_gh: self.updated_at,
            raw_payload: serde_json::to_value(self).ok(),
        }
    }
}

impl WorkItemNode for PullRequestNode {
    const ENTITY_TYPE: EntityType = EntityType::PullRequest;
    const QUERY: &'static str = query::PULL_REQUESTS_QUERY;

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn to_record(&self, repo_id: &str) -> WorkItemRecord {
        WorkItemRecord {
            id: Uuid::new_v4(),
            repo_id: repo_id.to_string(),
            external_id: self.id.clone(),
            number: self.number,
            title: self.title.clone(),
            state: self.state.clone(),
            url: self.url.clone(),
            author_login: author_login(&self.author),
            body: self.body.clone(),
            labels: label_names(&self.labels),
            comment_count: comment_count(&self.comments),
            created_at_gh: self.created_at,
            updated_at_gh: self.updated_at,
            raw_payload: serde_json::to_value(self).ok(),
        }
    }
}

impl WorkItemNode for DiscussionNode {
    const ENTITY_TYPE: EntityType = EntityType::Discussion;
    const QUERY: &'static str = query::DISCUSSIONS_QUERY;

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn to_record(&self, repo_id: &str) -> WorkItemRecord {
        let state = if self.closed { "CLOSED" } else { "OPEN" };
        WorkItemRecord {
            id: Uuid::new_v4(),
            repo_id: repo_id.to_string(),
            external_id: self.id.clone(),
            number: self.number,
            title: self.title.clone(),
            state: state.to_string(),
            url: self.url.clone(),
            author_login: author_login(&self.author),
            body: self.body.clone(),
            labels: label_names(&self.labels),
            comment_count: comment_count(&self.comments),
            created_at_gh: self.created_at,
            updated_at_gh: self.updated_at,
            raw_payload: serde_json::to_value(self).ok(),
        }
    }
}

fn author_login(author: &Option<Actor>) -> Option<String> {
    author.as_ref().map(|a| a.login.clone())
}

fn label_names(labels: &Option<LabelConnection>) -> Vec<String> {
    labels
        .as_ref()
        .map(|l| l.nodes.iter().map(|n| n.name.clone()).collect())
        .unwrap_or_default()
}

fn comment_count(comments: &Option<CountConnection>) -> i32 {
    comments
        .as_ref()
        .map(|c| i32::try_from(c.total_count).unwrap_or(i32::MAX))
        .unwrap_or(0)
}
