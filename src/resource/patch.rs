//! Patch application for partial updates.
//!
//! `application/json-patch+json` is RFC 6902, `application/merge-patch+json`
//! is RFC 7396. Plain `application/json` (or no content type) picks by shape:
//! an array is a JSON Patch, an object a merge patch.

use serde_json::Value;
use thiserror::Error;

use crate::database::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchFormat {
    JsonPatch,
    MergePatch,
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("unsupported patch content type: {0}")]
    UnsupportedContentType(String),

    #[error("invalid JSON Patch document: {0}")]
    InvalidPatch(String),

    #[error("failed to apply JSON Patch: {0}")]
    Failed(String),

    #[error("merge patch must be a JSON object")]
    MergePatchNotObject,

    #[error("patched resource must be a JSON object")]
    NotAnObject,
}

impl PatchFormat {
    pub fn detect(content_type: Option<&str>, patch: &Value) -> Result<Self, PatchError> {
        // Ignore parameters such as charset
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());

        match mime.as_deref() {
            Some("application/json-patch+json") => Ok(PatchFormat::JsonPatch),
            Some("application/merge-patch+json") => Ok(PatchFormat::MergePatch),
            None | Some("") | Some("application/json") => match patch {
                Value::Array(_) => Ok(PatchFormat::JsonPatch),
                _ => Ok(PatchFormat::MergePatch),
            },
            Some(other) => Err(PatchError::UnsupportedContentType(other.to_string())),
        }
    }
}

/// Apply `patch` to a copy of `document`; the original is left untouched
pub fn apply_patch(document: &Document, patch: &Value, format: PatchFormat) -> Result<Document, PatchError> {
    let mut patched = Value::Object(document.clone());

    match format {
        PatchFormat::JsonPatch => {
            let operations: json_patch::Patch = serde_json::from_value(patch.clone())
                .map_err(|e| PatchError::InvalidPatch(e.to_string()))?;
            json_patch::patch(&mut patched, &operations).map_err(|e| PatchError::Failed(e.to_string()))?;
        }
        PatchFormat::MergePatch => {
            if !patch.is_object() {
                return Err(PatchError::MergePatchNotObject);
            }
            json_patch::merge(&mut patched, patch);
        }
    }

    match patched {
        Value::Object(map) => Ok(map),
        _ => Err(PatchError::NotAnObject),
    }
}
