//! worker_fetch tool implementation.
//!
//! Routes one request through the registration the way a page load would,
//! and reports where the response came from.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::canonicalize;
use shellcache_core::{Request, ResponseSource};

use super::status::to_result;
use crate::host::WorkerHost;

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute http(s) URL to request.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are served from cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Maximum body characters to return (default: 20000).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_method() -> String {
    "GET".into()
}

fn default_max_chars() -> usize {
    20_000
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// "cache" or "network".
    pub source: ResponseSource,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
    pub truncated: bool,
    pub served_at: String,
}

pub async fn fetch_impl(host: &WorkerHost, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(shellcache_core::Error::from)?;
    let request = Request::new(&params.method, url);

    let outcome = host.registration().fetch(&request).await?;
    let response = outcome.response;

    let text = String::from_utf8_lossy(&response.body);
    let truncated = text.chars().count() > params.max_chars;
    let body = if truncated { text.chars().take(params.max_chars).collect() } else { text.into_owned() };

    tracing::debug!(url = %response.url, source = ?outcome.source, "worker_fetch served");

    to_result(&WorkerFetchOutput {
        url: response.url.to_string(),
        status: response.status,
        content_type: response.content_type,
        source: outcome.source,
        body,
        body_bytes: response.body.len(),
        truncated,
        served_at: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellcache_core::{AppConfig, CacheDb};

    async fn host() -> WorkerHost {
        WorkerHost::new(AppConfig::default(), CacheDb::open_in_memory().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_url() {
        let host = host().await;
        let params = WorkerFetchParams { url: "  ".into(), method: default_method(), max_chars: 10 };

        assert!(fetch_impl(&host, params).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_unsupported_scheme() {
        let host = host().await;
        let params = WorkerFetchParams { url: "ftp://example.com/a".into(), method: default_method(), max_chars: 10 };

        let err = fetch_impl(&host, params).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }

    #[test]
    fn test_params_defaults() {
        let params: WorkerFetchParams = serde_json::from_str(r#"{"url": "https://example.com/"}"#).unwrap();
        assert_eq!(params.method, "GET");
        assert_eq!(params.max_chars, 20_000);
    }
}
