//! worker_status tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{GenerationStatus, Registration, RegistrationStatus};
use shellcache_core::{Error, WorkerState};

/// One worker generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationOutput {
    /// Release version, e.g. "1.1.7".
    pub version: String,
    pub state: WorkerState,
    /// Name of the generation's static cache.
    pub cache: String,
}

impl From<GenerationStatus> for GenerationOutput {
    fn from(status: GenerationStatus) -> Self {
        Self { version: status.version, state: status.state, cache: status.cache }
    }
}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    /// Generation currently serving fetches.
    pub active: Option<GenerationOutput>,
    /// Installed generation waiting for clients to go away.
    pub waiting: Option<GenerationOutput>,
    /// Clients controlled by the active generation.
    pub clients: usize,
}

impl From<RegistrationStatus> for WorkerStatusOutput {
    fn from(status: RegistrationStatus) -> Self {
        Self {
            active: status.active.map(Into::into),
            waiting: status.waiting.map(Into::into),
            clients: status.clients,
        }
    }
}

pub(crate) fn to_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub fn status_impl(registration: &Registration) -> Result<CallToolResult, McpError> {
    to_result(&WorkerStatusOutput::from(registration.status()))
}
