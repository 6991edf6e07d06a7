//! Fakes for worker tests: a scripted fetcher and a store with injectable faults.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use shellcache_core::{
    AppConfig, CacheDb, CacheStore, Error, Fetcher, KeyValueStore, ReleaseVersion, Request, Response,
};
use tokio::sync::oneshot;
use url::Url;

use super::config::WorkerConfig;
use super::controller::{ACTIVE_VERSION_KEY, CacheController};

pub(crate) fn request(url: &str) -> Request {
    Request::get(Url::parse(url).unwrap())
}

/// Answers every request with its URL path as the body, unless told to fail.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn response_for(&self, url: &str) -> Response {
        let url = Url::parse(url).unwrap();
        Response {
            body: Bytes::from(url.path().to_string()),
            url,
            status: 200,
            content_type: Some("text/plain".to_string()),
            headers: Vec::new(),
        }
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(request.url.as_str()) {
            return Err(Error::HttpError(format!("{} returned status 404", request.url)));
        }
        Ok(self.response_for(request.url.as_str()))
    }
}

type DeleteGate = (oneshot::Sender<()>, oneshot::Receiver<()>);

/// Delegates to a real in-memory database, with failures and delays on demand.
pub(crate) struct FaultyStore {
    inner: CacheDb,
    fail_puts: AtomicBool,
    failing_deletes: Mutex<HashSet<String>>,
    delete_gate: Mutex<Option<DeleteGate>>,
}

impl FaultyStore {
    fn new(inner: CacheDb) -> Self {
        Self {
            inner,
            fail_puts: AtomicBool::new(false),
            failing_deletes: Mutex::new(HashSet::new()),
            delete_gate: Mutex::new(None),
        }
    }

    pub(crate) fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_delete(&self, name: &str) {
        self.failing_deletes.lock().unwrap().insert(name.to_string());
    }

    /// Hold the next delete until released.
    ///
    /// Returns a receiver that fires once the delete has started and a
    /// sender that lets it proceed.
    pub(crate) fn delay_next_delete(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.delete_gate.lock().unwrap() = Some((started_tx, release_rx));
        (started_rx, release_tx)
    }
}

#[async_trait]
impl CacheStore for FaultyStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let gate = self.delete_gate.lock().unwrap().take();
        if let Some((started, release)) = gate {
            let _ = started.send(());
            let _ = release.await;
        }
        if self.failing_deletes.lock().unwrap().contains(name) {
            return Err(Error::InvalidInput(format!("cannot delete {name}")));
        }
        CacheStore::delete(&self.inner, name).await
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_in(name, request).await
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_any(request).await
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::InvalidInput("disk full".into()));
        }
        self.inner.put(name, request, response).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        self.inner.put_all(name, entries).await
    }
}

/// One database shared by the store, the marker storage and assertions.
pub(crate) struct Harness {
    pub(crate) db: CacheDb,
    pub(crate) store: Arc<FaultyStore>,
    pub(crate) fetcher: Arc<FakeFetcher>,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = Arc::new(FaultyStore::new(db.clone()));
        Self { db, store, fetcher: Arc::new(FakeFetcher::default()) }
    }

    pub(crate) fn app_config() -> AppConfig {
        AppConfig { app_name: "app".into(), scope_url: "https://app.example.com/".into(), ..Default::default() }
    }

    pub(crate) fn controller(&self, version: &str) -> Arc<CacheController> {
        self.build(version, Self::app_config())
    }

    pub(crate) fn controller_with_precache(&self, version: &str, precache: &[&str]) -> Arc<CacheController> {
        let app = AppConfig { precache: precache.iter().map(|s| s.to_string()).collect(), ..Self::app_config() };
        self.build(version, app)
    }

    fn build(&self, version: &str, app: AppConfig) -> Arc<CacheController> {
        let config = WorkerConfig::from_app_config(&app, ReleaseVersion::parse(version).unwrap()).unwrap();
        Arc::new(CacheController::new(
            config,
            self.store.clone(),
            self.fetcher.clone(),
            Arc::new(self.db.clone()),
        ))
    }

    pub(crate) async fn marker(&self) -> Option<String> {
        self.db.get(ACTIVE_VERSION_KEY).await.unwrap()
    }

    pub(crate) async fn set_marker(&self, version: &str) {
        self.db.set(ACTIVE_VERSION_KEY, version).await.unwrap();
    }

    pub(crate) async fn entry_count(&self, name: &str) -> u64 {
        self.db
            .cache_summaries()
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.entries)
            .unwrap_or(0)
    }
}
