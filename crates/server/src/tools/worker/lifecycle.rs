//! worker_install, worker_activate and worker_clients tools.
//!
//! Installs always build a fresh controller, so retrying after a failed
//! install is just calling worker_install again.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, InstallOutcome};

use super::status::{WorkerStatusOutput, to_result};
use crate::host::WorkerHost;

/// Parameters for the worker_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallParams {
    /// Release version to install. Defaults to the configured changelog version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    pub version: String,
    /// "activated" when the generation took control, "waiting" otherwise.
    pub outcome: InstallOutcome,
    pub status: WorkerStatusOutput,
}

pub async fn install_impl(host: &WorkerHost, params: WorkerInstallParams) -> Result<CallToolResult, McpError> {
    let controller = host.controller(params.version.as_deref())?;
    let version = controller.version().to_string();

    tracing::info!(%version, "installing worker generation");
    let outcome = host.registration().register(controller).await?;

    to_result(&WorkerInstallOutput { version, outcome, status: host.registration().status().into() })
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerActivateOutput {
    /// Whether a waiting generation was promoted.
    pub activated: bool,
    pub status: WorkerStatusOutput,
}

pub async fn activate_impl(host: &WorkerHost) -> Result<CallToolResult, McpError> {
    let activated = host.registration().try_activate_waiting().await?;
    to_result(&WorkerActivateOutput { activated, status: host.registration().status().into() })
}

/// Parameters for the worker_clients tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerClientsParams {
    /// "claim" when a client page opens, "release" when it closes.
    pub action: String,
}

pub async fn clients_impl(host: &WorkerHost, params: WorkerClientsParams) -> Result<CallToolResult, McpError> {
    let registration = host.registration();
    match params.action.as_str() {
        "claim" => {
            registration.claim_client();
        }
        "release" => {
            registration.release_client().await?;
        }
        other => {
            return Err(Error::InvalidInput(format!("action must be \"claim\" or \"release\", got {other:?}")).into());
        }
    }

    to_result(&WorkerStatusOutput::from(registration.status()))
}
