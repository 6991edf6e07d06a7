//! Worker host state shared by all tools.
//!
//! Owns the cache database, the network fetcher and the registration, and
//! builds a fresh controller for every install attempt.

use std::sync::Arc;

use shellcache_client::{CacheController, FetchConfig, HttpFetcher, Registration, WorkerConfig};
use shellcache_core::{AppConfig, CacheDb, Error, ReleaseVersion};

pub struct WorkerHost {
    config: AppConfig,
    db: CacheDb,
    fetcher: Arc<HttpFetcher>,
    registration: Registration,
}

impl WorkerHost {
    pub fn new(config: AppConfig, db: CacheDb) -> Result<Self, Error> {
        let fetch_config =
            FetchConfig { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() };
        let fetcher = Arc::new(HttpFetcher::new(fetch_config)?);
        let registration = Registration::new(fetcher.clone());

        Ok(Self { config, db, fetcher, registration })
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Build a controller for `version`, or the configured release version.
    pub fn controller(&self, version: Option<&str>) -> Result<Arc<CacheController>, Error> {
        let version = match version {
            Some(v) => ReleaseVersion::parse(v)?,
            None => self
                .config
                .release_version()
                .map_err(|e| Error::InvalidVersion(e.to_string()))?,
        };
        let worker_config = WorkerConfig::from_app_config(&self.config, version)?;

        Ok(Arc::new(CacheController::new(
            worker_config,
            Arc::new(self.db.clone()),
            self.fetcher.clone(),
            Arc::new(self.db.clone()),
        )))
    }
}
