// Embedded schema migrations.

use sqlx::SqlitePool;
use tracing::info;

use judge_core::error::Result;

use crate::map_sqlx_error;

/// Ordered schema history. Each entry is one multi-statement SQL script;
/// it runs exactly once, inside a transaction that also records its
/// version, so a crash mid-migration leaves the version table untouched.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../migrations/001_initial_schema.sql"))];

/// Bring the schema up to the newest version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)")
        .execute(pool)
        .await
        .map_err(map_sqlx_error)?;

    let applied: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(map_sqlx_error)?;
    let applied = applied.unwrap_or(0);

    for &(version, sql) in MIGRATIONS {
        if version <= applied {
            continue;
        }
        info!(version, "Applying schema migration");

        let mut tx = pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
    }

    Ok(())
}
