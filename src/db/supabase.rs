use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use super::{EventStore, StoreError};
use crate::models::{EventRecord, StoredEvent};

pub struct SupabaseStore {
    rest_url: String,
    api_key: String,
    client: Client,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Self {
        Self::with_client(base_url, api_key, table, Client::new())
    }

    pub fn with_client(base_url: &str, api_key: &str, table: &str, client: Client) -> Self {
        Self {
            rest_url: table_url(base_url, table),
            api_key: api_key.to_string(),
            client,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, StoreError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|err| StoreError::Http(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| StoreError::Http(err.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Api(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table)
}

fn parse_rows(body: &str) -> Result<Vec<StoredEvent>, StoreError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|err| StoreError::Decode(err.to_string()))
}

#[async_trait]
impl EventStore for SupabaseStore {
    async fn list_all(&self) -> Result<Vec<StoredEvent>, StoreError> {
        let request = self
            .client
            .get(&self.rest_url)
            .query(&[("select", "*")]);
        let body = self.send(request).await?;
        parse_rows(&body)
    }

    async fn insert_one(&self, record: &EventRecord) -> Result<StoredEvent, StoreError> {
        let request = self
            .client
            .post(&self.rest_url)
            .header("Prefer", "return=representation")
            .json(record);
        let body = self.send(request).await?;
        parse_rows(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))
    }

    async fn delete_by_id(&self, id: i64) -> Result<Vec<StoredEvent>, StoreError> {
        let filter = format!("eq.{id}");
        let request = self
            .client
            .delete(&self.rest_url)
            .header("Prefer", "return=representation")
            .query(&[("id", filter.as_str())]);
        let body = self.send(request).await?;
        parse_rows(&body)
    }
}
