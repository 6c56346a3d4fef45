mod github;
mod runner;
mod sync;

use std::process::ExitCode;
use std::sync::Arc;

use reposync_common::error::{ReposyncError, ReposyncResult};
use reposync_config::{init_tracing, AppConfig, RepoTarget, SyncSettings};
use reposync_db::cursor::PgCursorStore;
use reposync_db::github::PgWorkItemRepository;
use reposync_db::locks::PgAdvisoryLockGate;
use sqlx::PgPool;

use crate::github::{
    DiscussionNode, GitHubClient, GitHubClientConfig, GitHubPageFetcher, IssueNode,
    PullRequestNode, WorkItemNode, WorkItemPersister,
};
use crate::runner::{EntityOutcome, IngestRunner, IngestSummary, WorkItemSyncs};
use crate::sync::{EntitySyncConfig, IncrementalSyncEngine, RateLimitGovernor, SyncRequest};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing("info");

    tracing::info!(service = "reposync-ingest", "starting");

    match run().await {
        Ok(summary) => {
            for (entity_type, outcome) in &summary.outcomes {
                match outcome {
                    EntityOutcome::Completed(report) => tracing::info!(
                        entity_type = entity_type.as_str(),
                        pages = report.pages,
                        persisted = report.persisted,
                        termination = ?report.termination,
                        "entity sync completed"
                    ),
                    EntityOutcome::Skipped => tracing::info!(
                        entity_type = entity_type.as_str(),
                        "entity sync skipped"
                    ),
                    EntityOutcome::Failed(error) => tracing::error!(
                        entity_type = entity_type.as_str(),
                        error = %error,
                        "entity sync failed"
                    ),
                }
            }
            if summary.has_failures() {
                ExitCode::FAILURE
            } else {
                tracing::info!("ingest finished");
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "ingest aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ReposyncResult<IngestSummary> {
    let app = AppConfig::from_env()?;
    let settings = SyncSettings::from_env()?;
    let target = RepoTarget::from_env()?;
    let github_config = GitHubClientConfig::from_env()?
        .ok_or_else(|| ReposyncError::Config("GITHUB_TOKEN must be set".to_string()))?;
    let client = GitHubClient::new(github_config)
        .map_err(|e| ReposyncError::Config(format!("failed to build github client: {e}")))?;

    let pool = reposync_db::create_pool(&app.database_url, app.database_max_connections).await?;
    let result = ingest(&pool, client, &settings, &target).await;
    pool.close().await;
    result
}

async fn ingest(
    pool: &PgPool,
    client: GitHubClient,
    settings: &SyncSettings,
    target: &RepoTarget,
) -> ReposyncResult<IngestSummary> {
    let applied = reposync_db::migrate(pool).await?;
    tracing::info!(applied, "migrations up to date");

    let engine = IncrementalSyncEngine::new(
        Arc::new(PgCursorStore::new(pool.clone())),
        RateLimitGovernor::new(settings.rate_limit_threshold, settings.rate_limit_buffer()),
    )
    .with_watermark_overlap(settings.watermark_overlap());
    let gate = Arc::new(PgAdvisoryLockGate::new(pool.clone()));
    let runner = IngestRunner::new(engine, gate, settings.skip_if_locked);

    let sink = Arc::new(PgWorkItemRepository::new(pool.clone()));
    let syncs = WorkItemSyncs {
        issues: work_item_sync::<IssueNode>(&client, &sink, target, settings.page_size),
        pull_requests: work_item_sync::<PullRequestNode>(&client, &sink, target, settings.page_size),
        discussions: work_item_sync::<DiscussionNode>(&client, &sink, target, settings.page_size),
    };

    let request = SyncRequest {
        repo_id: target.repo_id.clone(),
        owner: target.owner.clone(),
        name: target.name.clone(),
    };
    tracing::info!(
        repo_id = %request.repo_id,
        owner = %request.owner,
        name = %request.name,
        "syncing repository"
    );
    Ok(runner.run_all(&request, &syncs).await)
}

fn work_item_sync<N: WorkItemNode>(
    client: &GitHubClient,
    sink: &Arc<PgWorkItemRepository>,
    target: &RepoTarget,
    page_size: u32,
) -> EntitySyncConfig<N> {
    EntitySyncConfig::new(
        N::ENTITY_TYPE,
        Arc::new(GitHubPageFetcher::<N>::new(client.clone())),
        Arc::new(WorkItemPersister::<N, _>::new(target.repo_id.clone(), sink.clone())),
        N::updated_at,
    )
    .with_page_size(page_size)
}
