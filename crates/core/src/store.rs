//! Capability traits the worker is built against.
//!
//! The controller never touches SQLite or reqwest directly; it receives
//! these as trait objects so tests can substitute fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Named cache storage (one SQLite database, many named caches).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the named cache if absent. Opening an existing name reuses it.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Cache names in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a cache and its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Match a request against one cache.
    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Match a request against every cache, oldest first.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// Store one entry, creating the cache if needed.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Store a batch of entries atomically: all are written or none are.
    async fn put_all(&self, name: &str, entries: Vec<(Request, Response)>) -> Result<(), Error>;
}

/// Durable key-value storage for small markers.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;
    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;
    async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// Network access.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request. Network failures and non-success statuses are errors.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Handle to one opened cache.
///
/// Two handles opened with the same name address the same entries.
#[derive(Clone)]
pub struct CacheHandle {
    store: Arc<dyn CacheStore>,
    name: String,
}

impl CacheHandle {
    /// Open (create-if-absent) a cache and return a handle to it.
    pub async fn open(store: Arc<dyn CacheStore>, name: &str) -> Result<Self, Error> {
        store.open(name).await?;
        Ok(Self { store, name: name.to_string() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.store.match_in(&self.name, request).await
    }

    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        self.store.put(&self.name, request, response).await
    }

    pub async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        self.store.put_all(&self.name, entries).await
    }
}

impl std::fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle").field("name", &self.name).finish()
    }
}
