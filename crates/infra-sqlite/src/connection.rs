// SQLite pool construction.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use judge_core::error::{AppError, Result};

/// Pool tuning, decided by the composition root. This crate never reads
/// the environment itself.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 20,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Open the database with WAL journaling, enforced foreign keys, and the
/// given pool bounds. The database file is created on first use.
pub async fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Config(format!("Bad database URL: {}", e)))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(settings.busy_timeout)
        .foreign_keys(true)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await
        .map_err(crate::map_sqlx_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pool_answers_queries() {
        let settings = PoolSettings {
            max_connections: 2,
            busy_timeout: Duration::from_millis(100),
        };
        let pool = create_pool("sqlite::memory:", &settings).await.unwrap();
        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn non_sqlite_url_is_a_config_error() {
        let err = create_pool("postgres://elsewhere/db", &PoolSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
