//! Test doubles shared by unit tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::database::Document;
use crate::permissions::{PermissionError, PermissionGate};
use crate::types::{Action, RequestContext};

#[derive(Debug, Clone, PartialEq)]
pub enum GateCall {
    Authorize { resource_url: String, action: Action },
    CreateGrant { resource_url: String, spec: Option<Document> },
    DeleteGrant { resource_url: String },
}

/// In-process permission gate that records every call it receives
pub struct RecordingPermissions {
    enforce: bool,
    denied: Vec<Action>,
    fail_grants: bool,
    fail_deletes: bool,
    calls: Mutex<Vec<GateCall>>,
}

impl RecordingPermissions {
    pub fn allowing() -> Self {
        Self::denying(&[])
    }

    pub fn denying(actions: &[Action]) -> Self {
        Self {
            enforce: true,
            denied: actions.to_vec(),
            fail_grants: false,
            fail_deletes: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn not_enforcing(mut self) -> Self {
        self.enforce = false;
        self
    }

    pub fn failing_grants(mut self) -> Self {
        self.fail_grants = true;
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn calls(&self) -> Vec<GateCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Resource URL of the first delete_grant call, waiting up to `timeout`
    /// for the detached cleanup task to get there
    pub async fn wait_for_delete_grant(&self, timeout: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let found = self.calls().into_iter().find_map(|c| match c {
                GateCall::DeleteGrant { resource_url } => Some(resource_url),
                _ => None,
            });
            if found.is_some() || tokio::time::Instant::now() >= deadline {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn record(&self, call: GateCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PermissionGate for RecordingPermissions {
    fn enforces(&self) -> bool {
        self.enforce
    }

    async fn authorize(
        &self,
        _ctx: &RequestContext,
        resource_url: &str,
        _property: &str,
        action: Action,
    ) -> Result<(), PermissionError> {
        self.record(GateCall::Authorize { resource_url: resource_url.to_string(), action });
        if self.denied.contains(&action) {
            Err(PermissionError::Denied(format!("{} denied on {}", action, resource_url)))
        } else {
            Ok(())
        }
    }

    async fn create_grant(
        &self,
        _ctx: &RequestContext,
        resource_url: &str,
        spec: Option<Document>,
    ) -> Result<Option<String>, PermissionError> {
        self.record(GateCall::CreateGrant { resource_url: resource_url.to_string(), spec });
        if self.fail_grants {
            return Err(PermissionError::Transport("connection refused".to_string()));
        }
        Ok(Some(format!("http://permissions.test/permissions?{}", resource_url)))
    }

    async fn delete_grant(&self, _ctx: &RequestContext, resource_url: &str) -> Result<(), PermissionError> {
        self.record(GateCall::DeleteGrant { resource_url: resource_url.to_string() });
        if self.fail_deletes {
            return Err(PermissionError::Rejected { status: 503, message: "unavailable".to_string() });
        }
        Ok(())
    }
}
