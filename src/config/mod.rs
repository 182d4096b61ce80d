use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path every route is mounted under, e.g. `/api/erudite`
    pub api_prefix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub uri: String,
    pub database: String,
    /// Route everything to the scratch database used by test runs
    pub testing: bool,
}

impl StoreConfig {
    const TESTING_DB_NAME: &'static str = "testDb";

    pub fn database_name(&self) -> &str {
        if self.testing {
            Self::TESTING_DB_NAME
        } else {
            &self.database
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub enabled: bool,
    pub header: String,
    /// PostgreSQL database holding the `users` table with API keys
    #[serde(skip_serializing)]
    pub database_uri: Option<String>,
    #[serde(skip_serializing)]
    pub api_keys: Vec<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("ERUDITE_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("ERUDITE_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("API_PREFIX") {
            self.server.api_prefix = normalize_prefix(&v);
        }

        // Store overrides
        if let Ok(v) = env::var("STORE_BACKEND") {
            self.store.backend = match v.to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                _ => StoreBackend::Mongo,
            };
        }
        if let Ok(v) = env::var("MONGO_DATABASE_URI") {
            self.store.uri = v;
        }
        if let Ok(v) = env::var("MONGO_DB_NAME") {
            self.store.database = v;
        }
        if let Ok(v) = env::var("TESTING") {
            self.store.testing = parse_flag(&v).unwrap_or(self.store.testing);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_ENABLED") {
            self.auth.enabled = parse_flag(&v).unwrap_or(self.auth.enabled);
        }
        if let Ok(v) = env::var("AUTH_HEADER") {
            self.auth.header = v.trim().to_ascii_lowercase();
        }
        if let Ok(v) = env::var("AUTH_DATABASE_URI") {
            self.auth.database_uri = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("AUTH_API_KEYS") {
            self.auth.api_keys = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("AUTH_MAX_CONNECTIONS") {
            self.auth.max_connections = v.parse().unwrap_or(self.auth.max_connections);
        }

        // Logging overrides
        if let Ok(v) = env::var("LOG_LEVEL") {
            self.logging.level = v;
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 6000,
                api_prefix: None,
            },
            store: StoreConfig {
                backend: StoreBackend::Mongo,
                uri: "mongodb://localhost:27017".to_string(),
                database: "erudite".to_string(),
                testing: false,
            },
            auth: AuthConfig {
                enabled: true,
                header: "key".to_string(),
                database_uri: None,
                api_keys: Vec::new(),
                max_connections: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    fn development() -> Self {
        let mut config = Self::base(Environment::Development);
        // Local runs skip the gate entirely
        config.auth.enabled = false;
        config.logging.level = "debug".to_string();
        config
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.auth.max_connections = 10;
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.auth.max_connections = 20;
        config.logging.level = "info,tower_http=warn".to_string();
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// `api/erudite/` becomes `/api/erudite`; blank or `/` means no prefix
fn normalize_prefix(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
