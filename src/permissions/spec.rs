//! Permissions specs embedded in create bodies under `_permissions`.

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::database::Document;

pub const PERMISSIONS_PROPERTY: &str = "_permissions";

#[derive(Debug, Error, PartialEq)]
pub enum SpecError {
    #[error("_permissions must be a JSON object")]
    NotAnObject,

    #[error("resource URL {0} is not absolute")]
    InvalidBase(String),
}

/// Remove `_permissions` from a create body.
///
/// An object is the spec for the new resource's permission record. A string is
/// the calculated URL a client echoed back from an earlier representation and
/// is dropped.
pub fn take_spec(document: &mut Document) -> Result<Option<Document>, SpecError> {
    match document.remove(PERMISSIONS_PROPERTY) {
        None | Some(Value::String(_)) => Ok(None),
        Some(Value::Object(spec)) => Ok(Some(spec)),
        Some(_) => Err(SpecError::NotAnObject),
    }
}

/// Rewrite relative references in `spec` into absolute URLs against the
/// resource's `self` URL, and default `_subject` to `self`.
pub fn resolve_relative_urls(spec: &mut Document, self_url: &str) -> Result<(), SpecError> {
    let base = Url::parse(self_url).map_err(|_| SpecError::InvalidBase(self_url.to_string()))?;

    match spec.get_mut("_subject") {
        Some(Value::String(subject)) => *subject = resolve(&base, subject, true),
        _ => {
            spec.insert("_subject".to_string(), Value::String(self_url.to_string()));
        }
    }

    for (key, value) in spec.iter_mut() {
        if key != "_subject" {
            resolve_value(&base, value);
        }
    }
    Ok(())
}

fn resolve_value(base: &Url, value: &mut Value) {
    match value {
        Value::String(s) => *s = resolve(base, s, false),
        Value::Array(items) => items.iter_mut().for_each(|v| resolve_value(base, v)),
        Value::Object(map) => map.values_mut().for_each(|v| resolve_value(base, v)),
        _ => {}
    }
}

fn resolve(base: &Url, reference: &str, allow_empty: bool) -> String {
    if !is_relative_reference(reference, allow_empty) {
        return reference.to_string();
    }
    base.join(reference)
        .map(String::from)
        .unwrap_or_else(|_| reference.to_string())
}

fn is_relative_reference(s: &str, allow_empty: bool) -> bool {
    if s.is_empty() {
        return allow_empty;
    }
    s.starts_with('/')
        || s.starts_with("./")
        || s.starts_with("../")
        || s.starts_with('?')
        || s.starts_with('#')
}
