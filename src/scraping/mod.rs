pub mod firecrawl;
pub mod schema;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::RawEvent;

pub use firecrawl::{FirecrawlClient, FirecrawlError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchHit {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

pub struct ExtractRequest<'a> {
    pub urls: &'a [String],
    pub instruction: &'a str,
    pub schema: &'a Value,
    pub wait_ms: Option<u64>,
}

#[async_trait]
pub trait Discovery: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>, FirecrawlError>;
}

/// Turns page content into candidate records. Zero records is a success.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, request: ExtractRequest<'_>) -> Result<Vec<RawEvent>, FirecrawlError>;
}
