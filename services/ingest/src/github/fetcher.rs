use std::marker::PhantomData;

use async_trait::async_trait;

use reposync_common::error::{ReposyncError, ReposyncResult};

use super::client::{GitHubClient, GitHubClientError};
use super::models::{RepositoryItemsData, WorkItemNode};
use crate::sync::{Page, PageFetcher, PageInfo, PageRequest, RateLimitSnapshot};

/// Fetches one page of `N` from the repository's matching connection.
pub struct GitHubPageFetcher<N> {
    client: GitHubClient,
    _node: PhantomData<fn() -> N>,
}

impl<N: WorkItemNode> GitHubPageFetcher<N> {
    pub fn new(client: GitHubClient) -> Self {
        Self {
            client,
            _node: PhantomData,
        }
    }
}

impl From<GitHubClientError> for ReposyncError {
    fn from(err: GitHubClientError) -> Self {
        match err {
            GitHubClientError::NotFound(msg) => ReposyncError::NotFound(msg),
            other => ReposyncError::Upstream(other.to_string()),
        }
    }
}

#[async_trait]
impl<N: WorkItemNode> PageFetcher<N> for GitHubPageFetcher<N> {
    async fn fetch_page(&self, request: &PageRequest) -> ReposyncResult<Page<N>> {
        let variables = serde_json::json!({
            "owner": request.owner,
            "name": request.name,
            "pageSize": request.page_size,
            "cursor": request.cursor,
        });

        let data: RepositoryItemsData<N> = self.client.query(N::QUERY, variables).await?;

        let items = data
            .repository
            .and_then(|r| r.items)
            .ok_or_else(|| {
                ReposyncError::NotFound(format!(
                    "{} for repository {}/{}",
                    N::ENTITY_TYPE.slug(),
                    request.owner,
                    request.name
                ))
            })?;

        tracing::debug!(
            entity_type = N::ENTITY_TYPE.as_str(),
            nodes = items.nodes.as_ref().map_or(0, Vec::len),
            has_next_page = items.page_info.has_next_page,
            "fetched github page"
        );

        Ok(Page {
            nodes: items.nodes.unwrap_or_default(),
            page_info: PageInfo {
                next_cursor: items.page_info.end_cursor,
                has_more: items.page_info.has_next_page,
            },
            rate_limit: data.rate_limit.map(|r| RateLimitSnapshot {
                remaining: r.remaining,
                reset_at: r.reset_at,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::GitHubClientConfig;
    use crate::github::models::{DiscussionNode, IssueNode};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::new(GitHubClientConfig {
            graphql_url: "http://localhost/graphql".to_string(),
            token: "ghp-test-token".to_string(),
            max_retries: 0,
            timeout_secs: 5,
        })
        .unwrap()
        .with_graphql_url(&format!("{}/graphql", server.uri()))
    }

    fn request(cursor: Option<&str>) -> PageRequest {
        PageRequest {
            owner: "acme".to_string(),
            name: "widgets".to_string(),
            cursor: cursor.map(str::to_string),
            page_size: 50,
        }
    }

    #[tokio::test]
    async fn maps_connection_to_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(serde_json::json!({
                "variables": { "owner": "acme", "name": "widgets", "pageSize": 50, "cursor": "Y3Vyc29y" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "rateLimit": { "remaining": 12, "resetAt": "2026-02-01T04:00:00Z" },
                    "repository": {
                        "items": {
                            "nodes": [{
                                "id": "I_1",
                                "number": 1,
                                "title": "first",
                                "state": "OPEN",
                                "url": "https://github.com/acme/widgets/issues/1",
                                "createdAt": "2026-02-01T00:00:00Z",
                                "updatedAt": "2026-02-01T03:00:00Z"
                            }],
                            "pageInfo": { "endCursor": "bmV4dA", "hasNextPage": true }
                        }
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = GitHubPageFetcher::<IssueNode>::new(client_for(&server).await);
        let page = fetcher.fetch_page(&request(Some("Y3Vyc29y"))).await.unwrap();

        assert_eq!(page.nodes.len(), 1);
        assert_eq!(page.nodes[0].id, "I_1");
        assert_eq!(page.page_info.next_cursor.as_deref(), Some("bmV4dA"));
        assert!(page.page_info.has_more);
        let rate = page.rate_limit.unwrap();
        assert_eq!(rate.remaining, 12);
        assert_eq!(rate.reset_at, "2026-02-01T04:00:00Z");
    }

    #[tokio::test]
    async fn empty_collection_is_an_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "repository": {
                        "items": { "nodes": [], "pageInfo": { "endCursor": null, "hasNextPage": false } }
                    }
                }
            })))
            .mount(&server)
            .await;

        let fetcher = GitHubPageFetcher::<DiscussionNode>::new(client_for(&server).await);
        let page = fetcher.fetch_page(&request(None)).await.unwrap();

        assert!(page.nodes.is_empty());
        assert_eq!(page.page_info.next_cursor, None);
        assert!(!page.page_info.has_more);
        assert!(page.rate_limit.is_none());
    }

    #[tokio::test]
    async fn missing_repository_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "rateLimit": null, "repository": null }
            })))
            .mount(&server)
            .await;

        let fetcher = GitHubPageFetcher::<IssueNode>::new(client_for(&server).await);
        let err = fetcher.fetch_page(&request(None)).await.unwrap_err();
        match err {
            ReposyncError::NotFound(msg) => assert!(msg.contains("acme/widgets")),
            other => panic!("expected NotFound, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let fetcher = GitHubPageFetcher::<IssueNode>::new(client_for(&server).await);
        let err = fetcher.fetch_page(&request(None)).await.unwrap_err();
        assert!(matches!(err, ReposyncError::Upstream(_)));
    }
}
