use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::{Document, ResourceStore, StoreError};
use crate::error::ApiError;
use crate::permissions::spec::{resolve_relative_urls, take_spec};
use crate::permissions::PermissionGate;
use crate::resource::calculated::{attach_calculated_properties, strip_calculated_properties, ResourceUrls};
use crate::resource::patch::{apply_patch, PatchFormat};
use crate::types::{Action, RequestContext};

/// Property name the permission service evaluates for whole-resource actions
pub const SELF_PERMISSION_PROPERTY: &str = "_self";

/// What every successful operation hands back to the HTTP layer
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    /// Stored document plus calculated properties
    pub body: Value,
    pub etag: String,
    pub self_url: String,
}

/// Orchestrates one resource type: permission calls around storage calls,
/// each operation an ordered pipeline that stops at the first failure.
#[derive(Clone)]
pub struct ResourceHandler {
    store: Arc<dyn ResourceStore>,
    permissions: Arc<dyn PermissionGate>,
    urls: ResourceUrls,
}

impl ResourceHandler {
    pub fn new(store: Arc<dyn ResourceStore>, permissions: Arc<dyn PermissionGate>, urls: ResourceUrls) -> Self {
        Self { store, permissions, urls }
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    pub fn urls(&self) -> &ResourceUrls {
        &self.urls
    }

    /// POST on the collection
    pub async fn create(&self, ctx: &RequestContext, body: Value) -> Result<Representation, ApiError> {
        let collection_url = self.urls.collection_url(&ctx.base_url);
        self.authorize(ctx, &collection_url, Action::Create).await?;

        let mut document = verify_resource(body)?;
        let spec = take_spec(&mut document).map_err(|e| ApiError::bad_request(e.to_string()))?;
        strip_calculated_properties(&mut document);

        let id = Uuid::new_v4().to_string();
        let self_url = self.urls.self_url(&ctx.base_url, &id);

        let spec = match spec {
            Some(mut spec) => {
                resolve_relative_urls(&mut spec, &self_url).map_err(|e| ApiError::bad_request(e.to_string()))?;
                Some(spec)
            }
            None => None,
        };

        // Permissions first: a stray permission record is harmless, a resource
        // nobody governs is not. If the insert below fails the record stays.
        if spec.is_some() || self.permissions.enforces() {
            let permissions_url = self.permissions.create_grant(ctx, &self_url, spec).await?;
            debug!("Permissions for {} created at {:?}", self_url, permissions_url);
        }

        let etag = self.store.create(&id, &document).await?;
        info!("Created resource {} etag={}", id, etag);

        Ok(self.represent(ctx, document, etag, self_url))
    }

    /// GET on an item
    pub async fn read(&self, ctx: &RequestContext, id: &str) -> Result<Representation, ApiError> {
        let self_url = self.urls.self_url(&ctx.base_url, id);
        self.authorize(ctx, &self_url, Action::Read).await?;

        let stored = self.store.read(id).await?;
        Ok(self.represent(ctx, stored.data, stored.etag, self_url))
    }

    /// DELETE on an item. Permission cleanup runs detached and is not part of
    /// this operation's outcome.
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<Representation, ApiError> {
        let self_url = self.urls.self_url(&ctx.base_url, id);
        self.authorize(ctx, &self_url, Action::Delete).await?;

        let stored = self.store.delete(id).await?;
        info!("Deleted resource {} etag={}", id, stored.etag);

        // Records only exist for every resource when checks are enforced
        if self.permissions.enforces() {
            self.spawn_permission_cleanup(ctx.clone(), self_url.clone());
        }
        Ok(self.represent(ctx, stored.data, stored.etag, self_url))
    }

    /// PATCH on an item. `if_match` is the etag the caller last observed.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        patch: Value,
        content_type: Option<&str>,
        if_match: Option<&str>,
    ) -> Result<Representation, ApiError> {
        let self_url = self.urls.self_url(&ctx.base_url, id);
        self.authorize(ctx, &self_url, Action::Update).await?;

        let if_match = if_match.ok_or_else(|| ApiError::bad_request("missing If-Match header"))?;
        let format = PatchFormat::detect(content_type, &patch)?;

        let current = self.store.read(id).await?;
        if !if_match_allows(if_match, &current.etag) {
            return Err(ApiError::precondition_failed(format!(
                "If-Match header {} does not match current etag",
                if_match.trim()
            )));
        }

        let mut patched = apply_patch(&current.data, &patch, format)?;
        strip_calculated_properties(&mut patched);

        // The store re-checks the etag atomically; losing that race is a conflict
        let etag = match self.store.update(id, &patched, Some(&current.etag)).await {
            Ok(etag) => etag,
            Err(StoreError::NotFound(_)) => {
                return Err(ApiError::conflict(format!(
                    "resource {} was modified concurrently; etag {} is no longer current",
                    id, current.etag
                )))
            }
            Err(e) => return Err(e.into()),
        };
        info!("Updated resource {} etag {} -> {}", id, current.etag, etag);

        Ok(self.represent(ctx, patched, etag, self_url))
    }

    /// PUT on an item: full replacement, last writer wins
    pub async fn put(&self, ctx: &RequestContext, id: &str, body: Value) -> Result<Representation, ApiError> {
        let self_url = self.urls.self_url(&ctx.base_url, id);
        self.authorize(ctx, &self_url, Action::Put).await?;

        let mut document = verify_resource(body)?;
        strip_calculated_properties(&mut document);

        let etag = self.store.update(id, &document, None).await?;
        info!("Replaced resource {} etag={}", id, etag);

        Ok(self.represent(ctx, document, etag, self_url))
    }

    async fn authorize(&self, ctx: &RequestContext, resource_url: &str, action: Action) -> Result<(), ApiError> {
        self.permissions
            .authorize(ctx, resource_url, SELF_PERMISSION_PROPERTY, action)
            .await
            .map_err(ApiError::from)
    }

    fn spawn_permission_cleanup(&self, ctx: RequestContext, self_url: String) {
        let permissions = Arc::clone(&self.permissions);
        tokio::spawn(async move {
            if let Err(e) = permissions.delete_grant(&ctx, &self_url).await {
                warn!("Unable to delete permissions for {}: {}", self_url, e);
            }
        });
    }

    fn represent(&self, ctx: &RequestContext, document: Document, etag: String, self_url: String) -> Representation {
        Representation {
            body: attach_calculated_properties(document, &self_url, &ctx.base_url),
            etag,
            self_url,
        }
    }
}

/// Accept the JSON object bodies this service stores, nothing else
pub fn verify_resource(body: Value) -> Result<Document, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("resource must be a JSON object")),
    }
}

/// `"abc"`, `W/"abc"` and `abc` all name the etag `abc`
pub fn normalize_entity_tag(raw: &str) -> &str {
    let tag = raw.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    tag.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(tag)
}

/// True when any entry of an If-Match list is `*` or names `etag`
pub fn if_match_allows(header_value: &str, etag: &str) -> bool {
    header_value
        .split(',')
        .map(normalize_entity_tag)
        .any(|tag| tag == "*" || tag == etag)
}
