use std::env;
use std::str::FromStr;
use std::time::Duration;

use reposync_common::error::{ReposyncError, ReposyncResult};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> ReposyncResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            database_max_connections: parse_var_or("DATABASE_MAX_CONNECTIONS", 10)?,
            log_level: get_var_or("LOG_LEVEL", "info"),
        })
    }
}

/// Tunables for the incremental sync engine and the ingest runner.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    pub page_size: u32,
    pub rate_limit_threshold: i64,
    pub rate_limit_buffer_ms: u64,
    pub watermark_overlap_secs: u64,
    pub skip_if_locked: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            rate_limit_threshold: 50,
            rate_limit_buffer_ms: 1000,
            watermark_overlap_secs: 0,
            skip_if_locked: false,
        }
    }
}

impl SyncSettings {
    pub fn from_env() -> ReposyncResult<Self> {
        let defaults = Self::default();

        let page_size: u32 = parse_var_or("SYNC_PAGE_SIZE", defaults.page_size)?;
        if page_size == 0 || page_size > 100 {
            return Err(ReposyncError::Config(format!(
                "SYNC_PAGE_SIZE must be between 1 and 100, got {page_size}"
            )));
        }

        Ok(Self {
            page_size,
            rate_limit_threshold: parse_var_or(
                "RATE_LIMIT_THRESHOLD",
                defaults.rate_limit_threshold,
            )?,
            rate_limit_buffer_ms: parse_var_or(
                "RATE_LIMIT_BUFFER_MS",
                defaults.rate_limit_buffer_ms,
            )?,
            watermark_overlap_secs: parse_var_or(
                "SYNC_WATERMARK_OVERLAP_SECS",
                defaults.watermark_overlap_secs,
            )?,
            skip_if_locked: parse_var_or("INGEST_SKIP_IF_LOCKED", defaults.skip_if_locked)?,
        })
    }

    pub fn rate_limit_buffer(&self) -> Duration {
        Duration::from_millis(self.rate_limit_buffer_ms)
    }

    pub fn watermark_overlap(&self) -> Duration {
        Duration::from_secs(self.watermark_overlap_secs)
    }
}

/// The repository a single ingest invocation replicates.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoTarget {
    pub repo_id: String,
    pub owner: String,
    pub name: String,
}

impl RepoTarget {
    pub fn from_env() -> ReposyncResult<Self> {
        Ok(Self {
            repo_id: get_var("REPO_ID")?,
            owner: get_var("GITHUB_OWNER")?,
            name: get_var("GITHUB_REPO")?,
        })
    }
}

fn get_var(key: &str) -> ReposyncResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ReposyncError::Config(format!(
            "{key} is required but not set"
        ))),
    }
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse `key` if set, else `default`. A value that does not parse is a config error.
pub fn parse_var_or<T>(key: &str, default: T) -> ReposyncResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ReposyncError::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}
