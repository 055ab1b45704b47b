use async_trait::async_trait;

use super::{PermissionError, PermissionGate};
use crate::database::Document;
use crate::types::{Action, RequestContext};

/// Gate used when no permission service is configured: everything is allowed
/// and no permission records are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPermissions;

#[async_trait]
impl PermissionGate for NoopPermissions {
    fn enforces(&self) -> bool {
        false
    }

    async fn authorize(
        &self,
        _ctx: &RequestContext,
        _resource_url: &str,
        _property: &str,
        _action: Action,
    ) -> Result<(), PermissionError> {
        Ok(())
    }

    async fn create_grant(
        &self,
        _ctx: &RequestContext,
        resource_url: &str,
        spec: Option<Document>,
    ) -> Result<Option<String>, PermissionError> {
        if spec.is_some() {
            tracing::debug!("Discarding permissions spec for {}: no permission service", resource_url);
        }
        Ok(None)
    }

    async fn delete_grant(&self, _ctx: &RequestContext, _resource_url: &str) -> Result<(), PermissionError> {
        Ok(())
    }
}
