use crate::backend::ConfigError;
use std::env;

pub const DEFAULT_UPLOAD_PREFIX: &str = "documents";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Firebase,
    /// In-process auth and storage, nothing leaves the machine.
    Memory,
}

/// Connection settings for the hosted backend, handed to both flows at
/// construction.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub app_id: String,
    pub initial_auth_token: Option<String>,
    pub upload_prefix: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
            api_key: String::new(),
            auth_domain: String::new(),
            project_id: String::new(),
            storage_bucket: String::new(),
            app_id: "default-app-id".to_string(),
            initial_auth_token: None,
            upload_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
        }
    }
}

impl BackendConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset. The firebase backend requires
    /// `FIREBASE_API_KEY` and `FIREBASE_STORAGE_BUCKET`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let kind = match get("AROGYA_BACKEND")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("firebase") => BackendKind::Firebase,
            Some("memory") | Some("local") => BackendKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "AROGYA_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let defaults = Self::default();
        let mut config = Self {
            kind,
            api_key: get("FIREBASE_API_KEY").unwrap_or_default(),
            auth_domain: get("FIREBASE_AUTH_DOMAIN").unwrap_or_default(),
            project_id: get("FIREBASE_PROJECT_ID").unwrap_or_default(),
            storage_bucket: get("FIREBASE_STORAGE_BUCKET").unwrap_or_default(),
            app_id: get("FIREBASE_APP_ID").unwrap_or(defaults.app_id),
            initial_auth_token: get("AROGYA_AUTH_TOKEN"),
            upload_prefix: defaults.upload_prefix,
        };

        // An explicitly empty prefix is meaningful, so read it raw.
        if let Some(prefix) = lookup("AROGYA_UPLOAD_PREFIX") {
            config.upload_prefix = prefix.trim().trim_matches('/').to_string();
        }

        if config.kind == BackendKind::Firebase {
            if config.api_key.is_empty() {
                return Err(ConfigError::Missing("FIREBASE_API_KEY"));
            }
            if config.storage_bucket.is_empty() {
                return Err(ConfigError::Missing("FIREBASE_STORAGE_BUCKET"));
            }
        }

        Ok(config)
    }
}
