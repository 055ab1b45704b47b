use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::store::{
    new_etag, Document, ResourceStore, StoreError, StoreResult, StoredResource,
};

/// Process-local store with the same contract as the PostgreSQL table.
/// Used for development (`STORAGE_BACKEND=memory`) and tests.
#[derive(Clone, Default)]
pub struct MemoryResourceStore {
    rows: Arc<RwLock<HashMap<String, StoredResource>>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.rows.read().await.contains_key(id)
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create(&self, id: &str, document: &Document) -> StoreResult<String> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(id) {
            return Err(StoreError::Duplicate(id.to_string()));
        }
        let etag = new_etag();
        rows.insert(
            id.to_string(),
            StoredResource { data: document.clone(), etag: etag.clone() },
        );
        Ok(etag)
    }

    async fn read(&self, id: &str) -> StoreResult<StoredResource> {
        self.rows
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> StoreResult<StoredResource> {
        self.rows
            .write()
            .await
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update(
        &self,
        id: &str,
        document: &Document,
        expected_etag: Option<&str>,
    ) -> StoreResult<String> {
        // Compare and swap under one write guard
        let mut rows = self.rows.write().await;
        let row = match rows.get_mut(id) {
            Some(row) if expected_etag.map_or(true, |expected| row.etag == expected) => row,
            _ => return Err(StoreError::NotFound(id.to_string())),
        };
        row.data = document.clone();
        row.etag = new_etag();
        Ok(row.etag.clone())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
