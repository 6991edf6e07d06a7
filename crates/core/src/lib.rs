//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Capability traits the offline worker is written against
//! - Cache and key-value storage with a SQLite backend
//! - Unified error types
//! - Configuration and release version handling

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod store;
pub mod version;

pub use cache::{CacheDb, CacheSummary};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, Response};
pub use lifecycle::{InstallOutcome, ResponseSource, WorkerState};
pub use store::{CacheHandle, CacheStore, Fetcher, KeyValueStore};
pub use version::ReleaseVersion;
