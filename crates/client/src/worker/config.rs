//! Per-generation worker configuration and cache naming.

use shellcache_core::{AppConfig, Error, ReleaseVersion};
use url::Url;

/// Everything one worker generation needs to know about its application.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Cache name prefix; every owned cache is `<app_name>-...`.
    pub app_name: String,
    /// Base URL precache entries resolve against.
    pub scope: Url,
    /// App-relative asset URLs to precache on install.
    pub precache: Vec<String>,
    /// Hosts served through the font cache.
    pub font_hosts: Vec<String>,
    pub version: ReleaseVersion,
}

impl WorkerConfig {
    /// Build the worker configuration from loaded application config.
    pub fn from_app_config(config: &AppConfig, version: ReleaseVersion) -> Result<Self, Error> {
        let scope = Url::parse(&config.scope_url).map_err(|e| Error::InvalidUrl(format!("scope_url: {e}")))?;
        Ok(Self {
            app_name: config.app_name.clone(),
            scope,
            precache: config.precache.clone(),
            font_hosts: config.font_hosts.iter().map(|h| h.trim().to_ascii_lowercase()).collect(),
            version,
        })
    }

    /// Prefix shared by every cache this application owns.
    pub fn cache_prefix(&self) -> String {
        format!("{}-", self.app_name)
    }

    /// Static generation for the current major version, e.g. `app-static-2`.
    pub fn static_cache_name(&self) -> String {
        format!("{}-static-{}", self.app_name, self.version.major())
    }

    /// The unversioned font cache, e.g. `app-fonts`.
    pub fn font_cache_name(&self) -> String {
        format!("{}-fonts", self.app_name)
    }

    pub fn is_font_host(&self, host: &str) -> bool {
        self.font_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }
}
