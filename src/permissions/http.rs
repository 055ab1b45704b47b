use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{PermissionError, PermissionGate};
use crate::database::Document;
use crate::types::{Action, RequestContext};

/// Client for the external permission service.
///
/// Endpoints used:
/// - `GET  {base}/is-allowed?resource=..&user=..&action=..&property=..` -> `true`/`false`
/// - `POST {base}/permissions` -> 201 with `Location` of the new record
/// - `DELETE {base}/permissions?{resource_url}`
pub struct HttpPermissionService {
    client: Client,
    base_url: String,
    enforce: bool,
}

impl HttpPermissionService {
    pub fn new(base_url: &str, timeout: Duration, enforce: bool) -> Result<Self, PermissionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            enforce,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Forward the caller's credentials so the service evaluates them, not ours
    fn with_credentials(request: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
        match &ctx.authorization {
            Some(auth) => request.header(header::AUTHORIZATION, auth),
            None => request,
        }
    }

    async fn rejection(status: StatusCode, response: reqwest::Response) -> PermissionError {
        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PermissionError::Denied(if message.is_empty() {
                "forbidden".to_string()
            } else {
                message
            }),
            _ => PermissionError::Rejected { status: status.as_u16(), message },
        }
    }
}

#[async_trait]
impl PermissionGate for HttpPermissionService {
    fn enforces(&self) -> bool {
        self.enforce
    }

    async fn authorize(
        &self,
        ctx: &RequestContext,
        resource_url: &str,
        property: &str,
        action: Action,
    ) -> Result<(), PermissionError> {
        if !self.enforce {
            return Ok(());
        }

        let mut query = vec![
            ("resource", resource_url),
            ("action", action.as_str()),
            ("property", property),
        ];
        if let Some(subject) = ctx.subject.as_deref() {
            query.push(("user", subject));
        }

        let request = self.client.get(self.endpoint("is-allowed")).query(&query);
        let response = Self::with_credentials(request, ctx).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Self::rejection(status, response).await);
        }

        let answer: Value = response.json().await?;
        debug!(
            "is-allowed resource={} action={} subject={:?} -> {}",
            resource_url, action, ctx.subject, answer
        );
        if answer == Value::Bool(true) {
            Ok(())
        } else {
            Err(PermissionError::Denied(format!(
                "{} may not {} {}",
                ctx.subject.as_deref().unwrap_or("anonymous caller"),
                action,
                resource_url
            )))
        }
    }

    async fn create_grant(
        &self,
        ctx: &RequestContext,
        resource_url: &str,
        spec: Option<Document>,
    ) -> Result<Option<String>, PermissionError> {
        let mut body = spec.unwrap_or_default();
        body.entry("_subject")
            .or_insert_with(|| Value::String(resource_url.to_string()));

        let request = self.client.post(self.endpoint("permissions")).json(&body);
        let response = Self::with_credentials(request, ctx).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::rejection(status, response).await);
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!("Created permissions for {} at {:?}", resource_url, location);
        Ok(location)
    }

    async fn delete_grant(&self, ctx: &RequestContext, resource_url: &str) -> Result<(), PermissionError> {
        let mut url = reqwest::Url::parse(&self.endpoint("permissions"))
            .map_err(|e| PermissionError::Transport(e.to_string()))?;
        url.set_query(Some(resource_url));

        let request = self.client.delete(url);
        let response = Self::with_credentials(request, ctx).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::rejection(status, response).await);
        }
        Ok(())
    }
}
