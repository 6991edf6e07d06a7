//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::version::ReleaseVersion;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application identifier; every cache this worker owns is named `<app_name>-...`.
    ///
    /// Set via SHELLCACHE_APP_NAME environment variable.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Scope URL that app-relative precache entries resolve against.
    ///
    /// Set via SHELLCACHE_SCOPE_URL environment variable.
    #[serde(default = "default_scope_url")]
    pub scope_url: String,

    /// App-relative asset URLs precached on install.
    ///
    /// Set via SHELLCACHE_PRECACHE environment variable (array syntax).
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Hosts whose responses go through the font cache.
    ///
    /// Set via SHELLCACHE_FONT_HOSTS environment variable (array syntax).
    #[serde(default = "default_font_hosts")]
    pub font_hosts: Vec<String>,

    /// Changelog document; its newest entry is the running version.
    ///
    /// Set via SHELLCACHE_CHANGELOG_PATH environment variable.
    #[serde(default = "default_changelog_path")]
    pub changelog_path: PathBuf,

    /// Explicit version, overriding the changelog.
    ///
    /// Set via SHELLCACHE_VERSION environment variable.
    #[serde(default)]
    pub version: Option<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_app_name() -> String {
    "app".into()
}

fn default_scope_url() -> String {
    "http://localhost:8080/".into()
}

fn default_precache() -> Vec<String> {
    [
        "./",
        "imgs/icon.png",
        "css/all.css",
        "js/gzip-worker.js",
        "js/page.js",
        "js/svgo-worker.js",
        "changelog.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_font_hosts() -> Vec<String> {
    vec!["fonts.googleapis.com".into(), "fonts.gstatic.com".into()]
}

fn default_changelog_path() -> PathBuf {
    PathBuf::from("./changelog.json")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            scope_url: default_scope_url(),
            precache: default_precache(),
            font_hosts: default_font_hosts(),
            changelog_path: default_changelog_path(),
            version: None,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Resolve the running release version.
    ///
    /// The explicit `version` wins; otherwise the changelog is read.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if neither source yields a version.
    pub fn release_version(&self) -> Result<ReleaseVersion, ConfigError> {
        if let Some(version) = &self.version {
            return ReleaseVersion::parse(version)
                .map_err(|e| ConfigError::Invalid { field: "version".into(), reason: e.to_string() });
        }

        ReleaseVersion::from_changelog_file(&self.changelog_path).map_err(|e| ConfigError::Missing {
            field: "version".into(),
            hint: format!("Set SHELLCACHE_VERSION or provide a changelog ({e})"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.app_name, "app");
        assert_eq!(config.precache.len(), 7);
        assert_eq!(config.precache[0], "./");
        assert_eq!(config.font_hosts, vec!["fonts.googleapis.com", "fonts.gstatic.com"]);
        assert_eq!(config.db_path, PathBuf::from("./shellcache.sqlite"));
        assert_eq!(config.user_agent, "shellcache/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.version.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_release_version_override() {
        let config = AppConfig { version: Some("2.0.1".into()), ..Default::default() };
        let version = config.release_version().unwrap();
        assert_eq!(version.as_str(), "2.0.1");
        assert_eq!(version.major(), 2);
    }

    #[test]
    fn test_release_version_missing_changelog() {
        let config = AppConfig { changelog_path: PathBuf::from("/nonexistent/changelog.json"), ..Default::default() };
        let result = config.release_version();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_release_version_bad_override() {
        let config = AppConfig { version: Some("latest".into()), ..Default::default() };
        let result = config.release_version();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
    }
}
