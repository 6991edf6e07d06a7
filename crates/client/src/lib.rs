//! Client code for shellcache.
//!
//! This crate provides the offline-cache worker (install, activation and
//! fetch routing), the host registration that sequences worker
//! generations, and the HTTP fetcher used for network access.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchConfig, HttpFetcher, UrlError, canonicalize, resolve};
pub use worker::{
    ACTIVE_VERSION_KEY, CacheController, FetchOutcome, GenerationStatus, Registration, RegistrationStatus,
    WorkerConfig,
};
