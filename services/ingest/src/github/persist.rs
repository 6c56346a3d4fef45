use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use reposync_common::error::ReposyncResult;
use reposync_db::github::{WorkItemRecord, WorkItemSink};

use super::models::WorkItemNode;
use crate::sync::PagePersister;

/// Converts a page of nodes into records and writes them as one batch.
pub struct WorkItemPersister<N, S: ?Sized> {
    repo_id: String,
    sink: Arc<S>,
    _node: PhantomData<fn(&N)>,
}

impl<N: WorkItemNode, S: WorkItemSink + ?Sized> WorkItemPersister<N, S> {
    pub fn new(repo_id: impl Into<String>, sink: Arc<S>) -> Self {
        Self {
            repo_id: repo_id.into(),
            sink,
            _node: PhantomData,
        }
    }
}

#[async_trait]
impl<N: WorkItemNode, S: WorkItemSink + ?Sized> PagePersister<N> for WorkItemPersister<N, S> {
    async fn persist(&self, nodes: &[N]) -> ReposyncResult<()> {
        let records: Vec<WorkItemRecord> =
            nodes.iter().map(|n| n.to_record(&self.repo_id)).collect();
        self.sink.upsert_items(N::ENTITY_TYPE, &records).await
    }
}
