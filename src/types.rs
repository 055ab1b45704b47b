/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Actions a caller can be authorized for on a resource.
/// The string forms are what the permission service expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Put,  // Full replacement, governed separately from partial update
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Put => "put",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request facts the resource pipeline needs from the HTTP layer
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Caller identity as a URL (`issuer#subject`), None for anonymous calls
    pub subject: Option<String>,
    /// Raw Authorization header, forwarded to the permission service
    pub authorization: Option<String>,
    /// Externally visible scheme+authority, without trailing slash
    pub base_url: String,
}

impl RequestContext {
    pub fn anonymous(base_url: impl Into<String>) -> Self {
        Self {
            subject: None,
            authorization: None,
            base_url: base_url.into(),
        }
    }
}
