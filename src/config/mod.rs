use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub permissions: PermissionsConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Component name, used as the default collection property and table name
    pub component: String,
    /// Path prefix of the collection, always ending in '/'
    pub base_resource: String,
    /// Collection name appended to `base_resource`
    pub resources_property: String,
    pub port: u16,
    /// Externally visible scheme+authority used for `self` URLs. When unset the
    /// request's Host header is used.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: Option<String>,
    pub table: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    pub check_permissions: bool,
    pub service_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    /// HS256 secret for bearer tokens. Without it tokens are decoded unverified
    /// and verification is left to the permission service.
    pub jwt_secret: Option<String>,
}

impl ServiceConfig {
    /// Collection path, e.g. `/widgets`
    pub fn collection_path(&self) -> String {
        format!("{}{}", self.base_resource, self.resources_property)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Service overrides
        if let Ok(v) = env::var("COMPONENT") {
            if !v.trim().is_empty() {
                self.service.component = v.trim().to_string();
                self.service.resources_property = self.service.component.clone();
                self.database.table = self.service.component.clone();
            }
        }
        if let Ok(v) = env::var("BASE_RESOURCE") {
            self.service.base_resource = normalize_base_resource(&v);
        }
        if let Ok(v) = env::var("RESOURCES_PROPERTY") {
            if !v.trim().is_empty() {
                self.service.resources_property = v.trim().trim_matches('/').to_string();
            }
        }
        if let Ok(v) = env::var("PORT") {
            self.service.port = v.parse().unwrap_or(self.service.port);
        }
        if let Ok(v) = env::var("PUBLIC_BASE_URL") {
            self.service.public_base_url = non_empty(v).map(|s| s.trim_end_matches('/').to_string());
        }

        // Database overrides
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            self.database.backend = match v.to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                _ => StorageBackend::Postgres,
            };
        }
        self.database.url = env::var("DATABASE_URL").ok().and_then(non_empty).or_else(pg_url_from_parts);
        if let Ok(v) = env::var("COMPONENT_RESOURCE_TABLE") {
            if !v.trim().is_empty() {
                self.database.table = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Permission overrides
        if let Ok(v) = env::var("CHECK_PERMISSIONS") {
            self.permissions.check_permissions = parse_flag(&v);
        }
        if let Ok(v) = env::var("PERMISSIONS_SERVICE_URL") {
            self.permissions.service_url = non_empty(v).map(|s| s.trim_end_matches('/').to_string());
        }
        if let Ok(v) = env::var("PERMISSIONS_TIMEOUT_SECS") {
            self.permissions.timeout_secs = v.parse().unwrap_or(self.permissions.timeout_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = non_empty(v);
        }

        self
    }

    /// Checks combinations that cannot work at runtime
    pub fn validate(&self) -> Result<(), String> {
        if self.service.resources_property.is_empty() {
            return Err("RESOURCES_PROPERTY (or COMPONENT) must name the collection".to_string());
        }
        if self.permissions.check_permissions && self.permissions.service_url.is_none() {
            return Err("CHECK_PERMISSIONS is on but PERMISSIONS_SERVICE_URL is not set".to_string());
        }
        if self.database.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err("DATABASE_URL or PG_HOST/PG_DATABASE must be set for the postgres backend".to_string());
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            service: ServiceConfig::default(),
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                table: "resources".to_string(),
                max_connections: 10,
                connection_timeout: 30,
            },
            permissions: PermissionsConfig {
                check_permissions: false,
                service_url: None,
                timeout_secs: 30,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: None,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            service: ServiceConfig::default(),
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                table: "resources".to_string(),
                max_connections: 20,
                connection_timeout: 10,
            },
            permissions: PermissionsConfig {
                check_permissions: true,
                service_url: None,
                timeout_secs: 10,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: None,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            service: ServiceConfig::default(),
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                table: "resources".to_string(),
                max_connections: 50,
                connection_timeout: 5,
            },
            permissions: PermissionsConfig {
                check_permissions: true,
                service_url: None,
                timeout_secs: 5,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: false,
                jwt_secret: None,
            },
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            component: "resources".to_string(),
            base_resource: "/".to_string(),
            resources_property: "resources".to_string(),
            port: 3000,
            public_base_url: None,
        }
    }
}

fn normalize_base_resource(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

fn non_empty(v: String) -> Option<String> {
    if v.trim().is_empty() { None } else { Some(v.trim().to_string()) }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Assemble a connection URL from the PG_* variables used by older deployments
fn pg_url_from_parts() -> Option<String> {
    let host = env::var("PG_HOST").ok().and_then(non_empty)?;
    let database = env::var("PG_DATABASE").ok().and_then(non_empty)?;

    let mut url = url::Url::parse(&format!("postgres://{}/{}", host, database)).ok()?;
    if let Some(user) = env::var("PG_USER").ok().and_then(non_empty) {
        url.set_username(&user).ok()?;
    }
    if let Some(password) = env::var("PG_PASSWORD").ok().and_then(non_empty) {
        url.set_password(Some(&password)).ok()?;
    }
    Some(url.into())
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
