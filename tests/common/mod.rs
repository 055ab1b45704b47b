#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tokio::task::JoinHandle;

use resource_api::config::{AppConfig, StorageBackend};
use resource_api::database::MemoryResourceStore;
use resource_api::permissions::build_gate;
use resource_api::server::{app, AppState};

/// Bind a free port and serve `router` on it until the handle is dropped
async fn serve_on_free_port(router: Router) -> Result<(String, JoinHandle<()>)> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((format!("http://{}", addr), handle))
}

/// The resource service running in-process against a memory store
pub struct TestServer {
    pub base_url: String,
    pub store: MemoryResourceStore,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Collection `/widgets`, no permission service
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(customize: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let mut config = AppConfig::development();
        config.service.component = "widgets".to_string();
        config.service.resources_property = "widgets".to_string();
        config.database.backend = StorageBackend::Memory;
        config.api.enable_request_logging = false;
        customize(&mut config);

        let store = MemoryResourceStore::new();
        let gate = build_gate(&config.permissions)?;
        let state = AppState::new(config, Arc::new(store.clone()), gate);
        let (base_url, handle) = serve_on_free_port(app(state)).await?;

        Ok(Self {
            base_url,
            store,
            client: reqwest::Client::new(),
            handle,
        })
    }

    /// Checks enforced through `mock`
    pub async fn start_with_permissions(mock: &MockPermissionService) -> Result<Self> {
        let url = mock.base_url.clone();
        Self::start_with(move |config| {
            config.permissions.service_url = Some(url);
            config.permissions.check_permissions = true;
        })
        .await
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn collection_url(&self) -> String {
        self.url("/widgets")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Strip the quotes from an ETag response header
pub fn etag_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_matches('"').to_string())
        .unwrap_or_default()
}

/// What the mock permission service was asked
#[derive(Debug, Default)]
pub struct PermissionCalls {
    pub checks: Vec<HashMap<String, String>>,
    pub created: Vec<Value>,
    pub deleted: Vec<String>,
    pub authorization: Vec<Option<String>>,
}

#[derive(Clone, Default)]
struct MockState {
    denied_actions: Arc<Vec<String>>,
    calls: Arc<Mutex<PermissionCalls>>,
}

/// Minimal stand-in for the external permission service
pub struct MockPermissionService {
    pub base_url: String,
    calls: Arc<Mutex<PermissionCalls>>,
    handle: JoinHandle<()>,
}

impl MockPermissionService {
    /// Allows every action except those named in `denied_actions`
    pub async fn start(denied_actions: &[&str]) -> Result<Self> {
        let state = MockState {
            denied_actions: Arc::new(denied_actions.iter().map(|a| a.to_string()).collect()),
            calls: Arc::new(Mutex::new(PermissionCalls::default())),
        };
        let calls = Arc::clone(&state.calls);

        let router = Router::new()
            .route("/is-allowed", get(is_allowed))
            .route("/permissions", axum::routing::post(create_permissions).delete(delete_permissions))
            .with_state(state);
        let (base_url, handle) = serve_on_free_port(router).await?;

        Ok(Self { base_url, calls, handle })
    }

    pub fn with_calls<T>(&self, f: impl FnOnce(&PermissionCalls) -> T) -> T {
        f(&self.calls.lock().unwrap())
    }

    /// Deletions run detached from the request, so poll for them
    pub async fn wait_for_deletion(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(url) = self.with_calls(|c| c.deleted.first().cloned()) {
                return Some(url);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for MockPermissionService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn is_allowed(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<bool> {
    let action = params.get("action").cloned().unwrap_or_default();
    let mut calls = state.calls.lock().unwrap();
    calls.authorization.push(authorization(&headers));
    calls.checks.push(params);
    Json(!state.denied_actions.contains(&action))
}

async fn create_permissions(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut calls = state.calls.lock().unwrap();
    calls.authorization.push(authorization(&headers));
    calls.created.push(body);
    let location = format!("/permissions/{}", calls.created.len());
    (StatusCode::CREATED, [(header::LOCATION, location)])
}

async fn delete_permissions(State(state): State<MockState>, RawQuery(query): RawQuery) -> StatusCode {
    state.calls.lock().unwrap().deleted.push(query.unwrap_or_default());
    StatusCode::OK
}
