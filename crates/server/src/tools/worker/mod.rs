//! Worker lifecycle and routing tools.

pub mod fetch;
pub mod lifecycle;
pub mod status;

pub use fetch::{WorkerFetchParams, fetch_impl};
pub use lifecycle::{WorkerClientsParams, WorkerInstallParams, activate_impl, clients_impl, install_impl};
pub use status::status_impl;
