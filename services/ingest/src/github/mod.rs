pub mod client;
pub mod fetcher;
pub mod models;
pub mod persist;
pub mod query;

pub use client::{GitHubClient, GitHubClientConfig, GitHubClientError};
pub use fetcher::GitHubPageFetcher;
pub use models::{DiscussionNode, IssueNode, PullRequestNode, WorkItemNode};
pub use persist::WorkItemPersister;
