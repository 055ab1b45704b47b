//! Storage contract for the single resource table.
//!
//! Every row is `(id, etag, data)`. The etag is regenerated on every write and
//! is the only concurrency control: conditional updates compare it atomically
//! inside the store, never in the caller.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// A persisted document body. Always a JSON object.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No row for the id. Also returned by a conditional update whose etag
    /// no longer matches; the store cannot tell the two apart.
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    Duplicate(String),

    #[error("invalid stored document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(DatabaseError::Sqlx(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Document plus the etag of the revision it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResource {
    pub data: Document,
    pub etag: String,
}

#[async_trait]
pub trait ResourceStore: Send + Sync + 'static {
    /// Create the table and its content index. Safe to run on every start.
    async fn init(&self) -> StoreResult<()>;

    /// Insert a new row and return its first etag
    async fn create(&self, id: &str, document: &Document) -> StoreResult<String>;

    async fn read(&self, id: &str) -> StoreResult<StoredResource>;

    /// Remove the row and return its last state
    async fn delete(&self, id: &str) -> StoreResult<StoredResource>;

    /// Replace the document and return the new etag. With `expected_etag` the
    /// write only happens if the current etag still equals it.
    async fn update(
        &self,
        id: &str,
        document: &Document,
        expected_etag: Option<&str>,
    ) -> StoreResult<String>;

    async fn health_check(&self) -> StoreResult<()>;
}

/// Fresh, unpredictable revision token
pub fn new_etag() -> String {
    Uuid::new_v4().simple().to_string()
}
