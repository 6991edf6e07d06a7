//! cache_list tool implementation.
//!
//! Lists every named cache in creation order with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheDb, CacheSummary};

use crate::tools::worker::status::to_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub caches: Vec<CacheSummary>,
}

pub async fn list_impl(cache: &CacheDb) -> Result<CallToolResult, McpError> {
    let caches = cache.cache_summaries().await?;
    to_result(&CacheListOutput { caches })
}
