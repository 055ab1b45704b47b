//! Delegated authorization.
//!
//! Whether permissions are checked is decided once at startup by choosing a
//! [`PermissionGate`] implementation; request code never branches on it.

pub mod http;
pub mod noop;
pub mod spec;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::PermissionsConfig;
use crate::database::Document;
use crate::types::{Action, RequestContext};

pub use http::HttpPermissionService;
pub use noop::NoopPermissions;

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("{0}")]
    Denied(String),

    #[error("permission service returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("permission service request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for PermissionError {
    fn from(err: reqwest::Error) -> Self {
        PermissionError::Transport(err.to_string())
    }
}

/// Capability used by the resource pipeline for every permission concern
#[async_trait]
pub trait PermissionGate: Send + Sync + 'static {
    /// Whether authorization checks are enforced. When true a permission
    /// record is created for every new resource even without an explicit spec.
    fn enforces(&self) -> bool;

    /// Ok(()) when the subject in `ctx` may perform `action` on `property`
    /// of the resource at `resource_url`
    async fn authorize(
        &self,
        ctx: &RequestContext,
        resource_url: &str,
        property: &str,
        action: Action,
    ) -> Result<(), PermissionError>;

    /// Create the permission record governing `resource_url`.
    /// Returns the record's URL when the service reports one.
    async fn create_grant(
        &self,
        ctx: &RequestContext,
        resource_url: &str,
        spec: Option<Document>,
    ) -> Result<Option<String>, PermissionError>;

    async fn delete_grant(&self, ctx: &RequestContext, resource_url: &str) -> Result<(), PermissionError>;
}

/// Select the gate for this process
pub fn build_gate(config: &PermissionsConfig) -> Result<Arc<dyn PermissionGate>, PermissionError> {
    match &config.service_url {
        Some(url) => {
            let service = HttpPermissionService::new(
                url,
                Duration::from_secs(config.timeout_secs),
                config.check_permissions,
            )?;
            tracing::info!(
                "Permission service at {} (checking {})",
                url,
                if config.check_permissions { "on" } else { "off" }
            );
            Ok(Arc::new(service))
        }
        None => {
            tracing::info!("No permission service configured; permission checks disabled");
            Ok(Arc::new(NoopPermissions))
        }
    }
}
