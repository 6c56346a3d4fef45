use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};

use crate::entity::EntityType;
use crate::github::models::WorkItemRecord;
use crate::github::repositories::WorkItemSink;
use crate::github::work_item_table;
use reposync_common::error::{ReposyncError, ReposyncResult};

const COLUMNS: &str = "id, repo_id, external_id, number, title, state, url, author_login, body, \
                       labels, comment_count, created_at_gh, updated_at_gh, raw_payload";

#[derive(Clone)]
pub struct PgWorkItemRepository {
    pool: PgPool,
}

impl PgWorkItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> ReposyncResult<WorkItemRecord> {
        Ok(WorkItemRecord {
            id: row.get("id"),
            repo_id: row.get("repo_id"),
            external_id: row.get("external_id"),
            number: row.get("number"),
            title: row.get("title"),
            state: row.get("state"),
            url: row.get("url"),
            author_login: row.get("author_login"),
            body: row.get("body"),
            labels: row.get("labels"),
            comment_count: row.get("comment_count"),
            created_at_gh: row.get("created_at_gh"),
            updated_at_gh: row.get("updated_at_gh"),
            raw_payload: row.get("raw_payload"),
        })
    }

    pub async fn get_item(
        &self,
        entity_type: EntityType,
        repo_id: &str,
        external_id: &str,
    ) -> ReposyncResult<Option<WorkItemRecord>> {
        let table = work_item_table(entity_type);
        let row = sqlx::query(&format!(
            "select {COLUMNS} from {table} where repo_id = $1 and external_id = $2"
        ))
        .bind(repo_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReposyncError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }

    pub async fn count_items(&self, entity_type: EntityType, repo_id: &str) -> ReposyncResult<i64> {
        let table = work_item_table(entity_type);
        let count: i64 = sqlx::query_scalar(&format!(
            "select count(*) from {table} where repo_id = $1"
        ))
        .bind(repo_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ReposyncError::Database(e.to_string()))?;
        Ok(count)
    }
}

/// Collapse repeated `(repo_id, external_id)` pairs, keeping the newest.
///
/// A single `insert .. on conflict` statement cannot touch the same row twice.
fn dedupe_latest(records: &[WorkItemRecord]) -> Vec<&WorkItemRecord> {
    let mut latest: HashMap<(&str, &str), usize> = HashMap::new();
    let mut order = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let key = (record.repo_id.as_str(), record.external_id.as_str());
        match latest.get(&key) {
            Some(&existing) if records[existing].updated_at_gh >= record.updated_at_gh => {}
            Some(_) => {
                latest.insert(key, idx);
            }
            None => {
                latest.insert(key, idx);
                order.push(key);
            }
        }
    }

    order.into_iter().map(|key| &records[latest[&key]]).collect()
}

#[async_trait]
impl WorkItemSink for PgWorkItemRepository {
    async fn upsert_items(
        &self,
        entity_type: EntityType,
        records: &[WorkItemRecord],
    ) -> ReposyncResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let table = work_item_table(entity_type);
        let rows = dedupe_latest(records);

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("insert into {table} ({COLUMNS}) "));
        qb.push_values(rows, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(&r.repo_id)
                .push_bind(&r.external_id)
                .push_bind(r.number)
                .push_bind(&r.title)
                .push_bind(&r.state)
                .push_bind(&r.url)
                .push_bind(&r.author_login)
                .push_bind(&r.body)
                .push_bind(&r.labels)
                .push_bind(r.comment_count)
                .push_bind(r.created_at_gh)
                .push_bind(r.updated_at_gh)
                .push_bind(&r.raw_payload);
        });
        qb.push(format!(
            " on conflict (repo_id, external_id) do update set
               number = excluded.number,
               title = excluded.title,
               state = excluded.state,
               url = excluded.url,
               author_login = excluded.author_login,
               body = excluded.body,
               labels = excluded.labels,
               comment_count = excluded.comment_count,
               created_at_gh = excluded.created_at_gh,
               updated_at_gh = greatest({table}.updated_at_gh, excluded.updated_at_gh),
               raw_payload = excluded.raw_payload,
               ingested_at = now()"
        ));

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ReposyncError::Database(e.to_string()))?;

        qb.build()
            .execute(&mut *tx)
            .await
            .map_err(|e| ReposyncError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| ReposyncError::Database(e.to_string()))?;

        tracing::debug!(table, count = records.len(), "upserted work items");
        Ok(())
    }
}
