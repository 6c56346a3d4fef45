use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use reposync_common::error::ReposyncResult;
use reposync_config::parse_var_or;

use super::models::GraphQlResponse;

pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    pub graphql_url: String,
    pub token: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl GitHubClientConfig {
    /// `Ok(None)` when `GITHUB_TOKEN` is unset or empty. Malformed numeric
    /// settings are configuration errors.
    pub fn from_env() -> ReposyncResult<Option<Self>> {
        let Some(token) = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let graphql_url = std::env::var("GITHUB_GRAPHQL_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_GRAPHQL_URL.to_string());

        Ok(Some(Self {
            graphql_url,
            token,
            max_retries: parse_var_or("GITHUB_MAX_RETRIES", 3)?,
            timeout_secs: parse_var_or("GITHUB_TIMEOUT_SECS", 30)?,
        }))
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubClientConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum GitHubClientError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    #[error("graphql error: {0}")]
    GraphQl(String),

    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a serde_json::Value,
}

impl GitHubClient {
    pub fn new(config: GitHubClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("reposync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// For testing: point the client at a mock server endpoint.
    #[cfg(test)]
    pub fn with_graphql_url(mut self, url: &str) -> Self {
        self.config.graphql_url = url.to_string();
        self
    }

    /// Execute a GraphQL query and decode its `data` field.
    ///
    /// GraphQL-level errors are reported even on HTTP 200; a `NOT_FOUND`
    /// error maps to [`GitHubClientError::NotFound`].
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, GitHubClientError> {
        let body = GraphQlRequest {
            query,
            variables: &variables,
        };
        let response: GraphQlResponse<T> = self.request_with_retry(&body).await?;

        if !response.errors.is_empty() {
            let message = response
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            if response
                .errors
                .iter()
                .any(|e| e.kind.as_deref() == Some("NOT_FOUND"))
            {
                return Err(GitHubClientError::NotFound(message));
            }
            return Err(GitHubClientError::GraphQl(message));
        }

        response
            .data
            .ok_or_else(|| GitHubClientError::GraphQl("response contained no data".to_string()))
    }

    async fn request_with_retry<T: DeserializeOwned>(
        &self,
        body: &GraphQlRequest<'_>,
    ) -> Result<GraphQlResponse<T>, GitHubClientError> {
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff_secs = std::cmp::min(1u64 << attempt, 30);
                tracing::warn!(attempt, backoff_secs, "retrying github request after backoff");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }

            let response = match self
                .client
                .post(&self.config.graphql_url)
                .bearer_auth(&self.config.token)
                .json(body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() || e.is_connect() {
                        continue;
                    }
                    return Err(GitHubClientError::RequestError(e));
                }
            };

            let status = response.status();

            if status.is_success() {
                return response
                    .json::<GraphQlResponse<T>>()
                    .await
                    .map_err(GitHubClientError::RequestError);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if let Some(retry_after) = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    let wait = std::cmp::min(retry_after, 60);
                    tracing::warn!(wait, "rate-limited, waiting Retry-After");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                last_error = "429 Too Many Requests".to_string();
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = format!("{status}: {body}");
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(GitHubClientError::HttpError { status, body });
        }

        Err(GitHubClientError::MaxRetriesExceeded {
            attempts: self.config.max_retries + 1,
            last_error,
        })
    }
}
