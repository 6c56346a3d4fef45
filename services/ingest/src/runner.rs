use std::sync::Arc;

use reposync_db::cursor::CursorStore;
use reposync_db::locks::{lock_key, try_with_lock, with_lock, LockGate};
use reposync_db::EntityType;

use crate::github::{DiscussionNode, IssueNode, PullRequestNode};
use crate::sync::{EntitySyncConfig, IncrementalSyncEngine, SyncRequest, SyncRunReport};

#[derive(Debug)]
pub enum EntityOutcome {
    Completed(SyncRunReport),
    /// Another process held the lock and the runner was told not to wait.
    Skipped,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub outcomes: Vec<(EntityType, EntityOutcome)>,
}

impl IngestSummary {
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, o)| matches!(o, EntityOutcome::Failed(_)))
    }
}

/// Per-entity sync configurations for one repository.
pub struct WorkItemSyncs {
    pub issues: EntitySyncConfig<IssueNode>,
    pub pull_requests: EntitySyncConfig<PullRequestNode>,
    pub discussions: EntitySyncConfig<DiscussionNode>,
}

/// Runs each entity sync inside its own lock.
pub struct IngestRunner<S: CursorStore + ?Sized> {
    engine: IncrementalSyncEngine<S>,
    gate: Arc<dyn LockGate>,
    skip_if_locked: bool,
}

impl<S: CursorStore + ?Sized> IngestRunner<S> {
    pub fn new(engine: IncrementalSyncEngine<S>, gate: Arc<dyn LockGate>, skip_if_locked: bool) -> Self {
        Self {
            engine,
            gate,
            skip_if_locked,
        }
    }

    pub async fn run_entity<T: Send + Sync>(
        &self,
        request: &SyncRequest,
        config: &EntitySyncConfig<T>,
    ) -> EntityOutcome {
        let key = lock_key(&request.repo_id, config.entity_type);

        let result = if self.skip_if_locked {
            try_with_lock(self.gate.as_ref(), &key, || self.engine.run(request, config)).await
        } else {
            with_lock(self.gate.as_ref(), &key, || self.engine.run(request, config))
                .await
                .map(Some)
        };

        match result {
            Ok(Some(report)) => EntityOutcome::Completed(report),
            Ok(None) => {
                tracing::info!(key = %key, "sync already running elsewhere, skipping");
                EntityOutcome::Skipped
            }
            Err(e) => {
                tracing::error!(
                    key = %key,
                    entity_type = config.entity_type.as_str(),
                    error = %e,
                    "sync failed"
                );
                EntityOutcome::Failed(e.to_string())
            }
        }
    }

    /// Issues, then pull requests, then discussions. A failure in one does not
    /// stop the others.
    pub async fn run_all(&self, request: &SyncRequest, syncs: &WorkItemSyncs) -> IngestSummary {
        let mut summary = IngestSummary::default();
        summary.outcomes.push((
            EntityType::Issue,
            self.run_entity(request, &syncs.issues).await,
        ));
        summary.outcomes.push((
            EntityType::PullRequest,
            self.run_entity(request, &syncs.pull_requests).await,
        ));
        summary.outcomes.push((
            EntityType::Discussion,
            self.run_entity(request, &syncs.discussions).await,
        ));
        summary
    }
}
