// Judge Infrastructure - SQLite Adapter
// Implements: JobStore, SubmissionStore, ProblemStore, ApiKeyStore

mod api_key_store;
mod connection;
mod job_store;
mod migration;
mod problem_store;
mod submission_store;

pub use api_key_store::SqliteApiKeyStore;
pub use connection::{create_pool, PoolSettings};
pub use job_store::SqliteJobStore;
pub use migration::run_migrations;
pub use problem_store::SqliteProblemStore;
pub use submission_store::SqliteSubmissionStore;

use judge_core::error::AppError;

// sqlx::Error cannot implement From for AppError here (orphan rules), so
// every store maps through this helper. Constraint classification goes
// through sqlx's structured error kinds; a unique-key collision is a
// conflict the HTTP surface can report, everything else is a plain
// database failure.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.kind() {
            sqlx::error::ErrorKind::UniqueViolation => {
                AppError::Conflict(db_err.message().to_string())
            }
            _ => AppError::Database(db_err.message().to_string()),
        },
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::PoolSettings;

    static DB_SEQ: AtomicU64 = AtomicU64::new(0);

    /// Fresh shared-cache in-memory database, migrated and usable from
    /// every pool connection (a plain `:memory:` database is
    /// per-connection).
    pub async fn memory_pool() -> SqlitePool {
        let name = DB_SEQ.fetch_add(1, Ordering::SeqCst);
        let url = format!("sqlite:file:judge_test_{}?mode=memory&cache=shared", name);
        let pool = crate::create_pool(&url, &PoolSettings::default())
            .await
            .unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }
}
