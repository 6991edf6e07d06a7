//! Offline-cache worker.
//!
//! ### Lifecycle
//! - `install`: precache the shell into `<app>-static-<major>`, all or nothing.
//!   Activates on the spot when the last active version shares the major
//!   version (or nothing was ever activated).
//! - `activate`: delete every `<app>-` cache except the current static
//!   generation and the font cache, then record the version as active.
//!
//! ### Fetch routing
//! - Font hosts: font cache first, otherwise network with a detached write-through.
//! - Everything else: any cache first, otherwise network. Nothing is written back.

pub mod config;
pub mod controller;
pub mod registration;

#[cfg(test)]
pub(crate) mod testing;

pub use config::WorkerConfig;
pub use controller::{ACTIVE_VERSION_KEY, CacheController, FetchOutcome};
pub use registration::{GenerationStatus, Registration, RegistrationStatus};
