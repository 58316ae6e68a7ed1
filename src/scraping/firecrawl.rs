use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::sleep;

use super::{Discovery, ExtractRequest, Extractor, SearchHit};
use crate::models::RawEvent;

#[derive(Debug, Error)]
pub enum FirecrawlError {
    #[error("http error: {0}")]
    Http(String),
    #[error("firecrawl api error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("extract job {0} did not finish after {1} polls")]
    Pending(String, u32),
}

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
const DEFAULT_MAX_POLLS: u32 = 60;

pub struct FirecrawlClient {
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<SearchHit>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    success: bool,
    id: Option<String>,
    status: Option<String>,
    data: Option<Value>,
    error: Option<String>,
}

impl FirecrawlClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            client: Client::new(),
        }
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls.max(1);
        self
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<String, FirecrawlError> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.post(url).bearer_auth(&self.api_key).json(payload);
        self.read_body(request).await
    }

    async fn read_body(&self, request: reqwest::RequestBuilder) -> Result<String, FirecrawlError> {
        let response = request
            .send()
            .await
            .map_err(|err| FirecrawlError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| FirecrawlError::Http(err.to_string()))?;
        if !status.is_success() {
            return Err(FirecrawlError::Api(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    async fn poll_extract(&self, id: &str) -> Result<Value, FirecrawlError> {
        let url = format!("{}/v1/extract/{}", self.base_url, id);
        for attempt in 1..=self.max_polls {
            sleep(self.poll_interval).await;
            let request = self.client.get(&url).bearer_auth(&self.api_key);
            let body = self.read_body(request).await?;
            let job: ExtractResponse =
                serde_json::from_str(&body).map_err(|err| FirecrawlError::Parse(err.to_string()))?;
            match settled(job)? {
                Some(data) => return Ok(data),
                None => tracing::debug!(job = id, attempt, "extract job still running"),
            }
        }
        Err(FirecrawlError::Pending(id.to_string(), self.max_polls))
    }
}

fn settled(job: ExtractResponse) -> Result<Option<Value>, FirecrawlError> {
    if !job.success {
        return Err(FirecrawlError::Api(
            job.error.unwrap_or_else(|| "extraction failed".to_string()),
        ));
    }
    let status = job.status.unwrap_or_default();
    match (status.as_str(), job.data) {
        ("failed" | "cancelled", _) => Err(FirecrawlError::Api(
            job.error
                .unwrap_or_else(|| format!("extract job {status}")),
        )),
        ("completed" | "", Some(data)) => Ok(Some(data)),
        ("completed", None) => Ok(Some(Value::Null)),
        _ => Ok(None),
    }
}

pub fn records_from_payload(data: Value) -> Vec<RawEvent> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("events") {
            Some(Value::Array(items)) => items,
            Some(_) => Vec::new(),
            None if map.is_empty() => Vec::new(),
            None => vec![Value::Object(map)],
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(_) => serde_json::from_value(item)
                .map_err(|err| tracing::warn!("skipping unreadable extracted record: {err}"))
                .ok(),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl Discovery for FirecrawlClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>, FirecrawlError> {
        let body = self
            .post_json("/v1/search", &json!({ "query": query, "limit": limit }))
            .await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|err| FirecrawlError::Parse(err.to_string()))?;
        if !parsed.success {
            return Err(FirecrawlError::Api(
                parsed.error.unwrap_or_else(|| "search failed".to_string()),
            ));
        }
        Ok(parsed.data)
    }
}

#[async_trait]
impl Extractor for FirecrawlClient {
    async fn extract(&self, request: ExtractRequest<'_>) -> Result<Vec<RawEvent>, FirecrawlError> {
        let mut payload = json!({
            "urls": request.urls,
            "prompt": request.instruction,
            "schema": request.schema,
        });
        if let Some(wait_ms) = request.wait_ms {
            payload["scrapeOptions"] = json!({ "waitFor": wait_ms });
        }

        let body = self.post_json("/v1/extract", &payload).await?;
        let started: ExtractResponse =
            serde_json::from_str(&body).map_err(|err| FirecrawlError::Parse(err.to_string()))?;

        let job_id = started.id.clone();
        let data = match (settled(started)?, job_id) {
            (Some(data), _) => data,
            (None, Some(id)) => self.poll_extract(&id).await?,
            (None, None) => {
                return Err(FirecrawlError::Parse(
                    "extract response carried neither data nor job id".to_string(),
                ))
            }
        };

        Ok(records_from_payload(data))
    }
}
