use anyhow::Context;
use arogya::backend::{Backend, ConfigError};
use arogya::config::BackendConfig;
use std::collections::HashMap;

/// Bundled config for builds that ship without a .env file
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

/// Parse the bundled `KEY=VALUE` file, skipping lines that do not parse.
fn bundled_config() -> HashMap<String, String> {
    dotenvy::from_read_iter(BUNDLED_CONFIG.as_bytes())
        .filter_map(|item| match item {
            Ok(pair) => Some(pair),
            Err(err) => {
                tracing::warn!(error = %err, "skipping bundled config line");
                None
            }
        })
        .collect()
}

#[cfg(not(target_arch = "wasm32"))]
fn load_config() -> Result<BackendConfig, ConfigError> {
    // First try to load from .env file (desktop dev)
    if dotenvy::dotenv().is_err() {
        for (key, value) in bundled_config() {
            // Only set if not already set (allow env override)
            if std::env::var(&key).is_err() {
                // SAFETY: We're setting env vars at startup before any threads are spawned
                unsafe {
                    std::env::set_var(&key, value);
                }
            }
        }
    }
    BackendConfig::from_env()
}

/// The browser has no process environment; only the bundled file applies.
#[cfg(target_arch = "wasm32")]
fn load_config() -> Result<BackendConfig, ConfigError> {
    let bundled = bundled_config();
    BackendConfig::from_lookup(|key| bundled.get(key).cloned())
}

#[cfg(not(target_arch = "wasm32"))]
fn init_tracing() {
    tracing_subscriber::fmt().with_target(false).init();
}

// No system clock on wasm32-unknown-unknown.
#[cfg(target_arch = "wasm32")]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config().context("backend config is not defined")?;
    tracing::info!(backend = ?config.kind, app_id = %config.app_id, "starting arogya");

    let backend = Backend::from_config(config);
    dioxus::LaunchBuilder::new()
        .with_context(backend)
        .launch(arogya::ui::App);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arogya::config::BackendKind;

    #[test]
    fn test_bundled_config_parses_without_environment() {
        let bundled = bundled_config();
        assert_eq!(bundled.get("AROGYA_BACKEND").map(String::as_str), Some("memory"));
        assert!(!bundled.contains_key("FIREBASE_API_KEY"));

        let config = BackendConfig::from_lookup(|key| bundled.get(key).cloned()).unwrap();
        assert_eq!(config.kind, BackendKind::Memory);
        assert_eq!(config.upload_prefix, "documents");
    }
}
