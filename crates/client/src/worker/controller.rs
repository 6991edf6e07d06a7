//! Cache lifecycle controller for one worker generation.
//!
//! Install precaches the shell into the generation for the current major
//! version. Activation sweeps every other cache carrying the app prefix and
//! only then records the version as active. Fetches are answered from the
//! caches first, with fonts written through to their own long-lived cache.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::join_all;
use shellcache_core::{
    CacheHandle, CacheStore, Error, Fetcher, InstallOutcome, KeyValueStore, ReleaseVersion, Request, Response,
    ResponseSource, WorkerState,
};

use super::config::WorkerConfig;
use crate::fetch::resolve;

/// Key of the persisted marker holding the last activated version.
pub const ACTIVE_VERSION_KEY: &str = "active-version";

/// A routed response and where it came from.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
}

/// Install/activate/fetch handling for one worker generation.
pub struct CacheController {
    config: WorkerConfig,
    static_cache: String,
    font_cache: String,
    prefix: String,
    expected_caches: Vec<String>,
    caches: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<WorkerState>,
}

impl CacheController {
    pub fn new(
        config: WorkerConfig, caches: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>, storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let static_cache = config.static_cache_name();
        let font_cache = config.font_cache_name();
        let prefix = config.cache_prefix();
        let expected_caches = vec![static_cache.clone(), font_cache.clone()];

        Self {
            config,
            static_cache,
            font_cache,
            prefix,
            expected_caches,
            caches,
            fetcher,
            storage,
            state: Mutex::new(WorkerState::Parsed),
        }
    }

    pub fn version(&self) -> &ReleaseVersion {
        &self.config.version
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn static_cache_name(&self) -> &str {
        &self.static_cache
    }

    /// Caches that survive activation; everything else with the app prefix is stale.
    pub fn expected_caches(&self) -> &[String] {
        &self.expected_caches
    }

    fn set_state(&self, next: WorkerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Move from `from` to `next`, or report the state actually found.
    fn transition(&self, from: WorkerState, next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != from {
            return Err(Error::InvalidState { expected: from, actual: *state });
        }
        *state = next;
        Ok(())
    }

    /// Mark this generation as superseded by a newer one.
    pub fn retire(&self) {
        self.set_state(WorkerState::Redundant);
    }

    /// Handle the install event.
    ///
    /// Precaches the shell, then activates immediately when no version was
    /// ever activated or the previously active version shares our major.
    /// On failure the generation is redundant; install a fresh controller to retry.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;
        tracing::info!(version = %self.config.version, cache = %self.static_cache, "installing worker");

        match self.run_install().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!(version = %self.config.version, error = %e, "install failed");
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn run_install(&self) -> Result<InstallOutcome, Error> {
        let marker = self.storage.get(ACTIVE_VERSION_KEY);
        let populate = async {
            let cache = CacheHandle::open(Arc::clone(&self.caches), &self.static_cache).await?;
            self.precache(&cache).await
        };

        // The marker is only needed once the shell is stored.
        let (marker, populated) = tokio::join!(marker, populate);
        let stored = populated?;
        let marker = marker?;
        tracing::debug!(entries = stored, cache = %self.static_cache, "precache complete");

        self.transition(WorkerState::Installing, WorkerState::Installed)?;

        let fast = match marker.as_deref() {
            None => true,
            Some(active) => self.config.version.same_major_as(active),
        };

        if !fast {
            tracing::info!(
                version = %self.config.version,
                active = marker.as_deref().unwrap_or_default(),
                "major version changed; waiting for host to activate"
            );
            return Ok(InstallOutcome::Waiting);
        }

        tracing::info!(version = %self.config.version, previous = ?marker, "fast activation");
        self.activate().await?;
        Ok(InstallOutcome::Activated)
    }

    /// Fetch every precache entry and store them in one atomic batch.
    ///
    /// All fetches run to completion; any failure fails the whole batch.
    async fn precache(&self, cache: &CacheHandle) -> Result<usize, Error> {
        let requests = self
            .config
            .precache
            .iter()
            .map(|entry| {
                resolve(&self.config.scope, entry)
                    .map(Request::get)
                    .map_err(|e| Error::Precache(format!("{entry}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let results = join_all(requests.iter().map(|request| self.fetcher.fetch(request))).await;

        let mut entries = Vec::with_capacity(requests.len());
        let mut failures = Vec::new();
        for (request, result) in requests.into_iter().zip(results) {
            match result {
                Ok(response) => entries.push((request, response)),
                Err(e) => failures.push(format!("{}: {e}", request.url)),
            }
        }

        if !failures.is_empty() {
            return Err(Error::Precache(failures.join("; ")));
        }

        let count = entries.len();
        cache
            .put_all(entries)
            .await
            .map_err(|e| Error::Precache(format!("storing {}: {e}", cache.name())))?;
        Ok(count)
    }

    /// Handle the activate event.
    ///
    /// Runs once per generation; calling it again after a successful
    /// activation does nothing.
    pub async fn activate(&self) -> Result<(), Error> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match *state {
                WorkerState::Activated => {
                    tracing::debug!(version = %self.config.version, "already activated");
                    return Ok(());
                }
                WorkerState::Installed => *state = WorkerState::Activating,
                other => return Err(Error::InvalidState { expected: WorkerState::Installed, actual: other }),
            }
        }

        match self.run_activation().await {
            Ok(deleted) => {
                self.set_state(WorkerState::Activated);
                tracing::info!(version = %self.config.version, deleted, "worker activated");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(version = %self.config.version, error = %e, "activation failed");
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn run_activation(&self) -> Result<usize, Error> {
        let names = self
            .caches
            .keys()
            .await
            .map_err(|e| Error::Activation(format!("listing caches: {e}")))?;

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| name.starts_with(&self.prefix) && !self.expected_caches.contains(name))
            .collect();

        let results = join_all(stale.iter().map(|name| self.caches.delete(name))).await;
        let failures: Vec<String> = stale
            .iter()
            .zip(results)
            .filter_map(|(name, result)| result.err().map(|e| format!("{name}: {e}")))
            .collect();

        if !failures.is_empty() {
            return Err(Error::Activation(format!("deleting stale caches: {}", failures.join("; "))));
        }

        for name in &stale {
            tracing::debug!(cache = %name, "deleted stale cache");
        }

        self.storage
            .set(ACTIVE_VERSION_KEY, self.config.version.as_str())
            .await
            .map_err(|e| Error::Activation(format!("writing {ACTIVE_VERSION_KEY}: {e}")))?;

        Ok(stale.len())
    }

    /// Handle an intercepted request.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let state = self.state();
        if !state.can_handle_fetch() {
            return Err(Error::InvalidState { expected: WorkerState::Activated, actual: state });
        }

        if request.host().is_some_and(|host| self.config.is_font_host(host)) {
            self.handle_font_request(request).await
        } else {
            self.handle_default_request(request).await
        }
    }

    async fn handle_default_request(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Some(response) = self.caches.match_any(request).await? {
            tracing::debug!("cache hit for {}", request.url);
            return Ok(FetchOutcome { response, source: ResponseSource::Cache });
        }

        tracing::debug!("cache miss for {}", request.url);
        let response = self.fetcher.fetch(request).await?;
        Ok(FetchOutcome { response, source: ResponseSource::Network })
    }

    async fn handle_font_request(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Some(response) = self.caches.match_in(&self.font_cache, request).await? {
            tracing::debug!("font cache hit for {}", request.url);
            return Ok(FetchOutcome { response, source: ResponseSource::Cache });
        }

        let response = self.fetcher.fetch(request).await?;
        self.store_font(request.clone(), response.clone());
        Ok(FetchOutcome { response, source: ResponseSource::Network })
    }

    /// Write a font response into the font cache on a detached task.
    ///
    /// The caller already has its response; a failed write is only logged.
    fn store_font(&self, request: Request, response: Response) {
        let caches = Arc::clone(&self.caches);
        let name = self.font_cache.clone();

        tokio::spawn(async move {
            let stored = async {
                let cache = CacheHandle::open(caches, &name).await?;
                cache.put(&request, &response).await
            }
            .await;

            if let Err(e) = stored {
                tracing::warn!(url = %request.url, cache = %name, error = %e, "failed to store font response");
            }
        });
    }
}
