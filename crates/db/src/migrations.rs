use reposync_common::error::{ReposyncError, ReposyncResult};
use sqlx::PgPool;

/// Embedded migrations, applied in order. Ids are recorded in `schema_migrations`.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init.sql",
    include_str!("../migrations/0001_init.sql"),
)];

/// Apply every pending migration. Returns how many were applied.
pub async fn migrate(pool: &PgPool) -> ReposyncResult<usize> {
    sqlx::raw_sql(
        "create table if not exists schema_migrations (
           id text primary key,
           applied_at timestamptz not null default now()
         )",
    )
    .execute(pool)
    .await
    .map_err(|e| ReposyncError::Database(e.to_string()))?;

    let applied: Vec<String> = sqlx::query_scalar("select id from schema_migrations")
        .fetch_all(pool)
        .await
        .map_err(|e| ReposyncError::Database(e.to_string()))?;

    let mut count = 0;
    for &(id, sql) in MIGRATIONS {
        if applied.iter().any(|a| a == id) {
            continue;
        }

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| ReposyncError::Database(e.to_string()))?;

        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| ReposyncError::Database(format!("migration {id}: {e}")))?;

        // A concurrent migrator may have won the race; the DDL above is idempotent.
        sqlx::query("insert into schema_migrations (id) values ($1) on conflict (id) do nothing")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ReposyncError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| ReposyncError::Database(e.to_string()))?;

        tracing::info!(migration = id, "applied migration");
        count += 1;
    }

    Ok(count)
}
