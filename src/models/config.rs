//! Application configuration structures.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Caller, Role};

/// Environment variable holding the identity provider secret key.
pub const IDENTITY_SECRET_ENV: &str = "EDU_ADMIN_IDENTITY_SECRET";

/// Environment variable overriding the college/exam backend URL.
pub const BACKEND_URL_ENV: &str = "EDU_ADMIN_BACKEND_URL";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// College and exam REST backends
    #[serde(default)]
    pub backend: BackendConfig,

    /// Identity provider settings
    #[serde(default)]
    pub identity: IdentityConfig,

    /// List view defaults
    #[serde(default)]
    pub view: ViewConfig,

    /// Who the console acts as
    #[serde(default)]
    pub session: Caller,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            let mut config = Self::default();
            config.apply_env();
            config
        })
    }

    /// Overlay secrets and endpoints from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(secret) = env::var(IDENTITY_SECRET_ENV) {
            self.identity.secret_key = Some(secret);
        }
        if let Ok(url) = env::var(BACKEND_URL_ENV) {
            self.backend.base_url = url;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("backend.base_url", &self.backend.base_url),
            ("backend.exams_url", &self.backend.exams_url),
            ("backend.generator_url", &self.backend.generator_url),
            ("backend.persistence_url", &self.backend.persistence_url),
            ("identity.api_url", &self.identity.api_url),
        ] {
            Url::parse(value)
                .map_err(|e| AppError::validation(format!("{name} is not a valid URL: {e}")))?;
        }
        if self.backend.user_agent.trim().is_empty() {
            return Err(AppError::validation("backend.user_agent is empty"));
        }
        if self.backend.timeout_secs == 0 {
            return Err(AppError::validation("backend.timeout_secs must be > 0"));
        }
        if self.backend.fetch_concurrency == 0 {
            return Err(AppError::validation("backend.fetch_concurrency must be > 0"));
        }
        if self.identity.list_limit == 0 {
            return Err(AppError::validation("identity.list_limit must be > 0"));
        }
        if self.view.page_size == 0 {
            return Err(AppError::validation("view.page_size must be > 0"));
        }
        Ok(())
    }
}

/// HTTP settings for the data backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL serving `/api/...` and `/college-exams`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Base URL serving the general `/exams` listing
    #[serde(default = "defaults::exams_url")]
    pub exams_url: String,

    /// Base URL of the JSON generation service
    #[serde(default = "defaults::generator_url")]
    pub generator_url: String,

    /// Base URL accepting new exams
    #[serde(default = "defaults::persistence_url")]
    pub persistence_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum per-type list requests in flight (1 = one at a time)
    #[serde(default = "defaults::fetch_concurrency")]
    pub fetch_concurrency: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            exams_url: defaults::exams_url(),
            generator_url: defaults::generator_url(),
            persistence_url: defaults::persistence_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            fetch_concurrency: defaults::fetch_concurrency(),
        }
    }
}

/// How callers are authorized before identity operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationPolicy {
    /// Caller must hold the admin role
    #[default]
    AdminRole,
    /// Any signed-in caller is trusted
    SignedIn,
}

/// Identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the provider's backend API
    #[serde(default = "defaults::identity_url")]
    pub api_url: String,

    /// Secret key; usually supplied through the environment
    #[serde(default, skip_serializing)]
    pub secret_key: Option<String>,

    /// Page size when listing accounts
    #[serde(default = "defaults::list_limit")]
    pub list_limit: usize,

    /// Role given to new accounts when none is chosen
    #[serde(default = "defaults::default_role")]
    pub default_role: Role,

    #[serde(default)]
    pub policy: AuthorizationPolicy,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::identity_url(),
            secret_key: None,
            list_limit: defaults::list_limit(),
            default_role: defaults::default_role(),
            policy: AuthorizationPolicy::default(),
        }
    }
}

/// List view defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use crate::models::Role;

    // Backend defaults
    pub fn base_url() -> String {
        "http://localhost:8000".into()
    }
    pub fn exams_url() -> String {
        "http://localhost:8000".into()
    }
    pub fn generator_url() -> String {
        "http://localhost:5005".into()
    }
    pub fn persistence_url() -> String {
        "http://localhost:8000".into()
    }
    pub fn user_agent() -> String {
        "edu-admin/0.1".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn fetch_concurrency() -> usize {
        1
    }

    // Identity defaults
    pub fn identity_url() -> String {
        "https://api.clerk.com/v1".into()
    }
    pub fn list_limit() -> usize {
        100
    }
    pub fn default_role() -> Role {
        Role::Admin
    }

    // View defaults
    pub fn page_size() -> usize {
        10
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.view.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = Config::default();
        config.backend.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_fills_missing_sections_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[backend]
base_url = "https://colleges.example.com"
fetch_concurrency = 4

[session]
user_id = "user_42"
role = "admin"

[identity]
policy = "signed_in"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.backend.fetch_concurrency, 4);
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.view.page_size, 10);
        assert_eq!(config.session.user_id.as_deref(), Some("user_42"));
        assert_eq!(config.session.role, Some(Role::Admin));
        assert_eq!(config.identity.policy, AuthorizationPolicy::SignedIn);
        assert_eq!(config.identity.default_role, Role::Admin);
    }

    #[test]
    fn load_or_default_survives_missing_file() {
        let config = Config::load_or_default("/nonexistent/edu-admin.toml");
        assert_eq!(config.view.page_size, 10);
    }
}
