use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{AppConfig, ConfigError};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generative search unavailable: {0}")]
    Unavailable(String),
    #[error("generative search returned no text")]
    Empty,
}

#[async_trait]
pub trait GenerativeSearch: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

pub struct GeminiClient {
    model: String,
    base_url: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl GeminiClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            model: config.gemini_model.clone(),
            base_url: config.gemini_endpoint.clone(),
            api_key: config.gemini_key()?.to_string(),
            temperature: config.gemini_temperature,
            max_tokens: config.gemini_max_tokens,
            client: Client::new(),
        })
    }

    fn payload(&self, prompt: &str) -> Value {
        json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ],
            "tools": [ { "google_search": {} } ],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            },
        })
    }
}

#[async_trait]
impl GenerativeSearch for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let base = self.base_url.trim_end_matches('/');
        let url = format!("{}/models/{}:generateContent", base, self.model);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.payload(prompt))
            .send()
            .await
            .map_err(|err| GenerateError::Unavailable(err.to_string()))?;

        let status = response.status();
        let text_body = response
            .text()
            .await
            .map_err(|err| GenerateError::Unavailable(err.to_string()))?;

        if !status.is_success() {
            return Err(GenerateError::Unavailable(format!(
                "HTTP {}: {}",
                status, text_body
            )));
        }

        let value: Value = serde_json::from_str(&text_body)
            .map_err(|err| GenerateError::Unavailable(err.to_string()))?;

        candidate_text(&value).ok_or(GenerateError::Empty)
    }
}

fn candidate_text(value: &Value) -> Option<String> {
    let parts = value
        .get("candidates")
        .and_then(|candidates| candidates.as_array())
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array())?;

    let text = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let endpoint = server.uri();
        let config = AppConfig::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("gm-key".to_string()),
            "GEMINI_ENDPOINT" => Some(endpoint.clone()),
            _ => None,
        })
        .expect("config");
        GeminiClient::from_config(&config).expect("client")
    }

    #[tokio::test]
    async fn generate_posts_grounded_prompt_to_the_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "gm-key"))
            .and(body_partial_json(json!({
                "contents": [ { "parts": [ { "text": "find fests" } ] } ],
                "tools": [ { "google_search": {} } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [ { "content": { "parts": [ { "text": "[]" } ] } } ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).generate("find fests").await.expect("generate");
        assert_eq!(text, "[]");
    }

    #[tokio::test]
    async fn error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("find fests").await.unwrap_err();
        assert!(
            matches!(err, GenerateError::Unavailable(msg) if msg.contains("404") && msg.contains("model not found"))
        );
    }

    #[tokio::test]
    async fn reply_without_text_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("find fests").await.unwrap_err();
        assert!(matches!(err, GenerateError::Empty));
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "[{\"title\":" }, { "text": "\"Ignite\"}]\n" } ] } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        });
        assert_eq!(
            candidate_text(&body).as_deref(),
            Some("[{\"title\":\"Ignite\"}]")
        );
    }

    #[test]
    fn missing_candidates_yield_none() {
        assert_eq!(candidate_text(&json!({})), None);
        assert_eq!(candidate_text(&json!({ "candidates": [] })), None);
        assert_eq!(
            candidate_text(&json!({ "candidates": [ { "content": { "parts": [ { "text": "  " } ] } } ] })),
            None
        );
    }

    #[test]
    fn payload_enables_search_grounding() {
        let config = AppConfig::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("test-key".to_string()),
            _ => None,
        })
        .expect("config");
        let client = GeminiClient::from_config(&config).expect("client");
        let payload = client.payload("find fests");
        assert_eq!(payload["contents"][0]["parts"][0]["text"], "find fests");
        assert!(payload["tools"][0].get("google_search").is_some());
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 2048);
    }
}
