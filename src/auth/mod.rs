//! API key authorization.
//!
//! [`authorize`] is the whole policy: it maps a caller-supplied key and a
//! [`KeyDirectory`] to an [`AuthDecision`]. [`AuthGate`] adds the
//! configured header name and the development-mode bypass.

mod postgres;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::AuthConfig;

pub use postgres::PgKeyDirectory;

/// Owner of an API key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUser {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("Key directory unavailable: {0}")]
    Unavailable(String),
}

/// Source of truth for API keys
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiUser>, DirectoryError>;

    async fn close(&self) {}
}

/// Fixed key set, one synthetic user per key
pub struct StaticKeyDirectory {
    users: HashMap<String, ApiUser>,
}

impl StaticKeyDirectory {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let users = keys
            .into_iter()
            .enumerate()
            .map(|(index, key)| {
                let user = ApiUser {
                    id: format!("static-{}", index),
                };
                (key.into(), user)
            })
            .collect();
        Self { users }
    }
}

#[async_trait]
impl KeyDirectory for StaticKeyDirectory {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiUser>, DirectoryError> {
        Ok(self.users.get(key).cloned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingKey,
    UnknownKey,
    LookupFailed,
}

impl RejectReason {
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::MissingKey => "unauthorized",
            RejectReason::UnknownKey => "user not found",
            RejectReason::LookupFailed => "invalid key",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// `None` when the gate is disabled and no key was checked
    Granted(Option<ApiUser>),
    Rejected(RejectReason),
}

/// Decide whether `key` may pass
pub async fn authorize(key: Option<&str>, directory: &dyn KeyDirectory) -> AuthDecision {
    let key = match key.map(str::trim) {
        Some(k) if !k.is_empty() => k,
        _ => return AuthDecision::Rejected(RejectReason::MissingKey),
    };

    match directory.find_by_key(key).await {
        Ok(Some(user)) => AuthDecision::Granted(Some(user)),
        Ok(None) => AuthDecision::Rejected(RejectReason::UnknownKey),
        Err(e) => {
            error!("API key lookup failed: {}", e);
            AuthDecision::Rejected(RejectReason::LookupFailed)
        }
    }
}

/// Authorization settings shared by every request
pub struct AuthGate {
    header: String,
    directory: Option<Arc<dyn KeyDirectory>>,
}

impl AuthGate {
    pub const DEFAULT_HEADER: &'static str = "key";

    /// Gate checking keys from `header` against `directory`
    pub fn new(header: impl Into<String>, directory: Arc<dyn KeyDirectory>) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
            directory: Some(directory),
        }
    }

    /// Gate granting every request
    pub fn disabled() -> Self {
        Self {
            header: Self::DEFAULT_HEADER.to_string(),
            directory: None,
        }
    }

    /// Build the gate described by `config`. A PostgreSQL directory wins over static keys.
    pub fn from_config(config: &AuthConfig) -> Result<Self, DirectoryError> {
        if !config.enabled {
            warn!("Authorization gate disabled, every request is granted");
            return Ok(Self::disabled());
        }

        let directory: Arc<dyn KeyDirectory> = match &config.database_uri {
            Some(uri) => {
                info!("Checking API keys against PostgreSQL users table");
                Arc::new(PgKeyDirectory::connect_lazy(uri, config.max_connections)?)
            }
            None => {
                if config.api_keys.is_empty() {
                    warn!("Authorization enabled with no keys configured, every request will be rejected");
                }
                Arc::new(StaticKeyDirectory::new(config.api_keys.iter().cloned()))
            }
        };
        Ok(Self::new(&config.header, directory))
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn is_enabled(&self) -> bool {
        self.directory.is_some()
    }

    pub async fn check(&self, key: Option<&str>) -> AuthDecision {
        match &self.directory {
            None => AuthDecision::Granted(None),
            Some(directory) => authorize(key, directory.as_ref()).await,
        }
    }

    pub async fn close(&self) {
        if let Some(directory) = &self.directory {
            directory.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BrokenDirectory;

    fn directory() -> StaticKeyDirectory {
        StaticKeyDirectory::new(["secret", "other"])
    }

    #[tokio::test]
    async fn missing_or_blank_key_is_rejected() {
        let dir = directory();
        assert_eq!(
            authorize(None, &dir).await,
            AuthDecision::Rejected(RejectReason::MissingKey)
        );
        assert_eq!(
            authorize(Some("  "), &dir).await,
            AuthDecision::Rejected(RejectReason::MissingKey)
        );
    }

    #[tokio::test]
    async fn unknown_key_is_rejected() {
        assert_eq!(
            authorize(Some("nope"), &directory()).await,
            AuthDecision::Rejected(RejectReason::UnknownKey)
        );
    }

    #[tokio::test]
    async fn lookup_failure_is_rejected() {
        assert_eq!(
            authorize(Some("secret"), &BrokenDirectory).await,
            AuthDecision::Rejected(RejectReason::LookupFailed)
        );
    }

    #[tokio::test]
    async fn known_key_is_granted() {
        match authorize(Some("other"), &directory()).await {
            AuthDecision::Granted(Some(user)) => assert_eq!(user.id, "static-1"),
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_gate_grants_everything() {
        let gate = AuthGate::disabled();
        assert!(!gate.is_enabled());
        assert_eq!(gate.check(None).await, AuthDecision::Granted(None));
    }

    #[test]
    fn gate_from_config_respects_enabled_flag() {
        let mut config = AuthConfig {
            enabled: false,
            header: "key".to_string(),
            database_uri: None,
            api_keys: vec!["secret".to_string()],
            max_connections: 1,
        };
        assert!(!AuthGate::from_config(&config).unwrap().is_enabled());

        config.enabled = true;
        config.header = "X-Api-Key".to_string();
        let gate = AuthGate::from_config(&config).unwrap();
        assert!(gate.is_enabled());
        assert_eq!(gate.header(), "x-api-key");
    }

    #[test]
    fn reject_messages() {
        assert_eq!(RejectReason::MissingKey.message(), "unauthorized");
        assert_eq!(RejectReason::UnknownKey.message(), "user not found");
        assert_eq!(RejectReason::LookupFailed.message(), "invalid key");
    }
}
