//! Host-side sequencing of worker generations.
//!
//! A registration owns at most one active and one waiting generation. A
//! waiting generation is activated only when no clients are controlled or
//! nothing is active yet; fast-activated installs take over immediately.
//! Installs and activations are serialized so only one generation of the
//! scope is ever activating.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use shellcache_core::{Error, Fetcher, InstallOutcome, Request, ResponseSource, WorkerState};
use tokio::sync::Mutex as AsyncMutex;

use super::controller::{CacheController, FetchOutcome};

#[derive(Default)]
struct Slots {
    active: Option<Arc<CacheController>>,
    waiting: Option<Arc<CacheController>>,
    clients: usize,
}

/// Snapshot of one generation for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationStatus {
    pub version: String,
    pub state: WorkerState,
    pub cache: String,
}

impl GenerationStatus {
    fn of(controller: &CacheController) -> Self {
        Self {
            version: controller.version().to_string(),
            state: controller.state(),
            cache: controller.static_cache_name().to_string(),
        }
    }
}

/// Snapshot of the registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStatus {
    pub active: Option<GenerationStatus>,
    pub waiting: Option<GenerationStatus>,
    pub clients: usize,
}

/// Worker registration for one scope.
pub struct Registration {
    slots: Mutex<Slots>,
    /// Held across install and activation awaits.
    lifecycle: AsyncMutex<()>,
    network: Arc<dyn Fetcher>,
}

impl Registration {
    /// `network` serves requests while no generation is active.
    pub fn new(network: Arc<dyn Fetcher>) -> Self {
        Self { slots: Mutex::new(Slots::default()), lifecycle: AsyncMutex::new(()), network }
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a new generation and place it according to the outcome.
    ///
    /// A failed install leaves the registration untouched; register a fresh
    /// controller to retry.
    pub async fn register(&self, controller: Arc<CacheController>) -> Result<InstallOutcome, Error> {
        let _lifecycle = self.lifecycle.lock().await;
        let outcome = controller.install().await?;

        match outcome {
            InstallOutcome::Activated => {
                let mut slots = self.slots();
                if let Some(previous) = slots.active.replace(Arc::clone(&controller)) {
                    previous.retire();
                }
                if let Some(waiting) = slots.waiting.take() {
                    waiting.retire();
                }
                tracing::info!(version = %controller.version(), "new generation took control");
            }
            InstallOutcome::Waiting => {
                {
                    let mut slots = self.slots();
                    if let Some(previous) = slots.waiting.replace(Arc::clone(&controller)) {
                        previous.retire();
                    }
                }
                self.activate_waiting().await?;
            }
        }

        Ok(outcome)
    }

    /// Activate the waiting generation if it is safe to do so.
    ///
    /// Returns whether a generation was promoted. If activation fails the
    /// previously active generation keeps serving.
    pub async fn try_activate_waiting(&self) -> Result<bool, Error> {
        let _lifecycle = self.lifecycle.lock().await;
        self.activate_waiting().await
    }

    /// Callers hold the lifecycle lock.
    async fn activate_waiting(&self) -> Result<bool, Error> {
        let candidate = {
            let mut slots = self.slots();
            if slots.active.is_some() && slots.clients > 0 {
                if let Some(waiting) = &slots.waiting {
                    tracing::debug!(version = %waiting.version(), clients = slots.clients, "activation deferred");
                }
                return Ok(false);
            }
            match slots.waiting.take() {
                Some(waiting) => waiting,
                None => return Ok(false),
            }
        };

        candidate.activate().await?;

        let mut slots = self.slots();
        if let Some(previous) = slots.active.replace(Arc::clone(&candidate)) {
            previous.retire();
        }
        tracing::info!(version = %candidate.version(), "waiting generation activated");
        Ok(true)
    }

    /// A client came under control of the active generation.
    pub fn claim_client(&self) -> usize {
        let mut slots = self.slots();
        slots.clients += 1;
        slots.clients
    }

    /// A client went away; the last one leaving lets a waiting generation activate.
    pub async fn release_client(&self) -> Result<bool, Error> {
        let remaining = {
            let mut slots = self.slots();
            slots.clients = slots.clients.saturating_sub(1);
            slots.clients
        };

        if remaining > 0 {
            return Ok(false);
        }
        self.try_activate_waiting().await
    }

    /// Route a request through the active generation, or the network if none.
    pub async fn fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let active = self.slots().active.clone();
        match active {
            Some(controller) => controller.handle_fetch(request).await,
            None => {
                let response = self.network.fetch(request).await?;
                Ok(FetchOutcome { response, source: ResponseSource::Network })
            }
        }
    }

    pub fn status(&self) -> RegistrationStatus {
        let slots = self.slots();
        RegistrationStatus {
            active: slots.active.as_deref().map(GenerationStatus::of),
            waiting: slots.waiting.as_deref().map(GenerationStatus::of),
            clients: slots.clients,
        }
    }
}
