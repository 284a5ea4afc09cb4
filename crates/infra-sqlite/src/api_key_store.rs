// SQLite ApiKeyStore

use async_trait::async_trait;
use sqlx::SqlitePool;

use judge_core::domain::{ApiKey, NewApiKey};
use judge_core::error::Result;
use judge_core::port::ApiKeyStore;

use crate::map_sqlx_error;

pub struct SqliteApiKeyStore {
    pool: SqlitePool,
}

impl SqliteApiKeyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyStore for SqliteApiKeyStore {
    async fn insert(&self, new: NewApiKey) -> Result<ApiKey> {
        let row: ApiKeyRow = sqlx::query_as(
            r#"
            INSERT INTO apikeys (active, name, key, perm_jury, perm_reader, perm_master)
            VALUES (1, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.key)
        .bind(new.perm_jury)
        .bind(new.perm_reader)
        .bind(new.perm_master)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into_api_key())
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKey>> {
        let row: Option<ApiKeyRow> = sqlx::query_as("SELECT * FROM apikeys WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ApiKeyRow::into_api_key))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: i64,
    active: bool,
    name: Option<String>,
    key: String,
    perm_jury: bool,
    perm_reader: bool,
    perm_master: bool,
}

impl ApiKeyRow {
    fn into_api_key(self) -> ApiKey {
        ApiKey {
            id: self.id,
            active: self.active,
            name: self.name,
            key: self.key,
            perm_jury: self.perm_jury,
            perm_reader: self.perm_reader,
            perm_master: self.perm_master,
        }
    }
}
