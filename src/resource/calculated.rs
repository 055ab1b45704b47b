//! Calculated properties: derived at response time, never persisted.

use serde_json::Value;

use crate::database::Document;
use crate::permissions::spec::PERMISSIONS_PROPERTY;

pub const SELF_PROPERTY: &str = "self";
pub const PERMISSIONS_HEIRS_PROPERTY: &str = "_permissionsHeirs";

const CALCULATED_PROPERTIES: &[&str] = &[SELF_PROPERTY, PERMISSIONS_PROPERTY, PERMISSIONS_HEIRS_PROPERTY];

/// URL layout of the one collection this service owns
#[derive(Debug, Clone)]
pub struct ResourceUrls {
    collection_path: String,
}

impl ResourceUrls {
    pub fn new(collection_path: impl Into<String>) -> Self {
        Self { collection_path: collection_path.into() }
    }

    pub fn collection_path(&self) -> &str {
        &self.collection_path
    }

    pub fn item_route(&self) -> String {
        format!("{}/:id", self.collection_path)
    }

    pub fn collection_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.collection_path)
    }

    pub fn self_url(&self, base_url: &str, id: &str) -> String {
        format!("{}{}/{}", base_url, self.collection_path, id)
    }
}

pub fn permissions_url(base_url: &str, self_url: &str) -> String {
    format!("{}/permissions?{}", base_url, self_url)
}

pub fn permissions_heirs_url(base_url: &str, self_url: &str) -> String {
    format!("{}/permissions-heirs?{}", base_url, self_url)
}

/// Every representation leaving the service goes through here
pub fn attach_calculated_properties(mut document: Document, self_url: &str, base_url: &str) -> Value {
    document.insert(SELF_PROPERTY.to_string(), Value::String(self_url.to_string()));
    document.insert(
        PERMISSIONS_PROPERTY.to_string(),
        Value::String(permissions_url(base_url, self_url)),
    );
    document.insert(
        PERMISSIONS_HEIRS_PROPERTY.to_string(),
        Value::String(permissions_heirs_url(base_url, self_url)),
    );
    Value::Object(document)
}

/// Remove anything a client may have copied from an earlier representation
pub fn strip_calculated_properties(document: &mut Document) {
    for key in CALCULATED_PROPERTIES {
        document.remove(*key);
    }
}
