use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use tracing::{debug, info};

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::store::{
    new_etag, Document, ResourceStore, StoreError, StoreResult, StoredResource,
};

/// PostgreSQL SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// One table of `(id text primary key, etag text, data jsonb)`
pub struct PgResourceStore {
    pool: PgPool,
    table: String,
    index: String,
}

impl PgResourceStore {
    pub fn new(pool: PgPool, table_name: &str) -> Result<Self, DatabaseError> {
        let table_name = DatabaseManager::checked_table_name(table_name)?;
        Ok(Self {
            pool,
            table: DatabaseManager::quote_identifier(&table_name),
            index: DatabaseManager::quote_identifier(&format!("{}_data_inx", table_name)),
        })
    }

    /// Returns the connection pool for testing or advanced usage.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_resource(id: &str, row: PgRow) -> StoreResult<StoredResource> {
        let etag: String = row.try_get("etag")?;
        let data: Value = row.try_get("data")?;
        match data {
            Value::Object(map) => Ok(StoredResource { data: map, etag }),
            other => Err(StoreError::InvalidDocument(format!(
                "row {} holds a non-object document ({})",
                id,
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl ResourceStore for PgResourceStore {
    async fn init(&self) -> StoreResult<()> {
        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {} (id text primary key, etag text not null, data jsonb not null)",
            self.table
        );
        sqlx::query(&create_table).execute(&self.pool).await?;

        // GIN index keeps containment lookups on document content viable
        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} USING gin (data)",
            self.index, self.table
        );
        sqlx::query(&create_index).execute(&self.pool).await?;

        info!("Resource table {} ready", self.table);
        Ok(())
    }

    async fn create(&self, id: &str, document: &Document) -> StoreResult<String> {
        let sql = format!(
            "INSERT INTO {} (id, etag, data) VALUES ($1, $2, $3) RETURNING etag",
            self.table
        );

        let result = sqlx::query_scalar::<_, String>(&sql)
            .bind(id)
            .bind(new_etag())
            .bind(Json(document))
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(etag) => {
                debug!("Inserted resource {} etag={}", id, etag);
                Ok(etag)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(StoreError::Duplicate(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, id: &str) -> StoreResult<StoredResource> {
        let sql = format!("SELECT etag, data FROM {} WHERE id = $1", self.table);

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        Self::row_to_resource(id, row)
    }

    async fn delete(&self, id: &str) -> StoreResult<StoredResource> {
        let sql = format!("DELETE FROM {} WHERE id = $1 RETURNING etag, data", self.table);

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        debug!("Deleted resource {}", id);
        Self::row_to_resource(id, row)
    }

    async fn update(
        &self,
        id: &str,
        document: &Document,
        expected_etag: Option<&str>,
    ) -> StoreResult<String> {
        let etag = new_etag();

        let row = match expected_etag {
            Some(expected) => {
                let sql = format!(
                    "UPDATE {} SET etag = $2, data = $3 WHERE id = $1 AND etag = $4 RETURNING etag",
                    self.table
                );
                sqlx::query_scalar::<_, String>(&sql)
                    .bind(id)
                    .bind(&etag)
                    .bind(Json(document))
                    .bind(expected)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "UPDATE {} SET etag = $2, data = $3 WHERE id = $1 RETURNING etag",
                    self.table
                );
                sqlx::query_scalar::<_, String>(&sql)
                    .bind(id)
                    .bind(&etag)
                    .bind(Json(document))
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        debug!(
            "Updated resource {} expected_etag={:?} matched={}",
            id,
            expected_etag,
            row.is_some()
        );
        row.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        DatabaseManager::health_check(&self.pool).await?;
        Ok(())
    }
}
