use std::sync::Mutex;

use async_trait::async_trait;

use crate::db::{EventStore, StoreError};
use crate::llm::{GenerateError, GenerativeSearch};
use crate::models::{EventRecord, RawEvent, StoredEvent};
use crate::scraping::{Discovery, ExtractRequest, Extractor, FirecrawlError, SearchHit};

pub struct FakeDiscovery {
    hits: Result<Vec<SearchHit>, String>,
    queries: Mutex<Vec<String>>,
}

impl FakeDiscovery {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits: Ok(hits),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_urls(urls: &[&str]) -> Self {
        Self::with_hits(
            urls.iter()
                .map(|url| SearchHit {
                    url: Some(url.to_string()),
                    ..SearchHit::default()
                })
                .collect(),
        )
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            hits: Err(reason.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Discovery for FakeDiscovery {
    async fn search(&self, query: &str, _limit: u32) -> Result<Vec<SearchHit>, FirecrawlError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.hits.clone().map_err(FirecrawlError::Http)
    }
}

pub struct FakeExtractor {
    records: Result<Vec<RawEvent>, String>,
    calls: Mutex<Vec<(Vec<String>, Option<u64>)>>,
}

impl FakeExtractor {
    pub fn returning(records: Vec<RawEvent>) -> Self {
        Self {
            records: Ok(records),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            records: Err(reason.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_urls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().iter().map(|(urls, _)| urls.clone()).collect()
    }

    pub fn seen_wait_ms(&self) -> Vec<Option<u64>> {
        self.calls.lock().unwrap().iter().map(|(_, wait)| *wait).collect()
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, request: ExtractRequest<'_>) -> Result<Vec<RawEvent>, FirecrawlError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.urls.to_vec(), request.wait_ms));
        self.records.clone().map_err(FirecrawlError::Api)
    }
}

#[derive(Default)]
pub struct FakeStore {
    rows: Mutex<Vec<StoredEvent>>,
    failing_titles: Vec<String>,
    insert_calls: Mutex<usize>,
    unavailable: bool,
}

impl FakeStore {
    pub fn failing_titles(titles: &[&str]) -> Self {
        Self {
            failing_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<StoredEvent> {
        self.rows.lock().unwrap().clone()
    }

    pub fn insert_calls(&self) -> usize {
        *self.insert_calls.lock().unwrap()
    }
}

#[async_trait]
impl EventStore for FakeStore {
    async fn list_all(&self) -> Result<Vec<StoredEvent>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Http("connection refused".to_string()));
        }
        Ok(self.rows())
    }

    async fn insert_one(&self, record: &EventRecord) -> Result<StoredEvent, StoreError> {
        *self.insert_calls.lock().unwrap() += 1;
        if self.unavailable || self.failing_titles.contains(&record.title) {
            return Err(StoreError::Api(format!("rejected {}", record.title)));
        }
        let mut rows = self.rows.lock().unwrap();
        let stored = StoredEvent {
            id: rows.len() as i64 + 1,
            record: record.clone(),
        };
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn delete_by_id(&self, id: i64) -> Result<Vec<StoredEvent>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Http("connection refused".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let (removed, kept): (Vec<_>, Vec<_>) = rows.drain(..).partition(|row| row.id == id);
        *rows = kept;
        Ok(removed)
    }
}

pub struct FakeModel {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeSearch for FakeModel {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(GenerateError::Unavailable)
    }
}
