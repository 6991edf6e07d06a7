//! SQLite-backed cache storage.
//!
//! One database holds every named cache (static generations and the font
//! cache) plus the durable key-value markers. It supports:
//!
//! - Named caches keyed by request method and URL
//! - Atomic batch writes for precaching
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod keyval;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheSummary;
