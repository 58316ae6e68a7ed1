use std::{fmt, sync::Arc};

use serde::Serialize;

use crate::db::EventStore;
use crate::error::IngestError;
use crate::models::{EventRecord, RawEvent, StoredEvent};
use crate::normalize::{normalize, title_case};
use crate::scraping::{schema, Discovery, ExtractRequest, Extractor, SearchHit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Idle,
    Searching,
    Extracting,
    Inserting,
    Done,
    Failed,
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Searching => "searching",
            Self::Extracting => "extracting",
            Self::Inserting => "inserting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InsertFailure {
    pub title: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub inserted: Vec<StoredEvent>,
    pub failures: Vec<InsertFailure>,
}

impl BatchOutcome {
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub message: String,
    pub inserted_count: usize,
    pub source_url: String,
    pub records: Vec<EventRecord>,
    pub failures: Vec<InsertFailure>,
}

/// Write each record on its own. A failed write is logged and recorded but
/// never stops the rest of the batch.
pub async fn insert_all(store: &dyn EventStore, records: &[EventRecord]) -> BatchOutcome {
    let mut results = Vec::with_capacity(records.len());
    for record in records {
        let result = store.insert_one(record).await.map_err(|err| InsertFailure {
            title: record.title.clone(),
            error: IngestError::StorageWriteFailed(err.to_string()).to_string(),
        });
        match &result {
            Ok(stored) => tracing::info!(id = stored.id, title = %record.title, "inserted event"),
            Err(failure) => {
                tracing::warn!(title = %failure.title, "failed to insert event: {}", failure.error)
            }
        }
        results.push(result);
    }

    results
        .into_iter()
        .fold(BatchOutcome::default(), |mut outcome, result| {
            match result {
                Ok(stored) => outcome.inserted.push(stored),
                Err(failure) => outcome.failures.push(failure),
            }
            outcome
        })
}

pub struct Pipeline {
    discovery: Arc<dyn Discovery>,
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn EventStore>,
    search_limit: u32,
    wait_ms: Option<u64>,
}

struct Run<'a> {
    college: &'a str,
    state: IngestState,
}

impl Run<'_> {
    fn advance(&mut self, next: IngestState) {
        tracing::debug!(college = self.college, from = %self.state, to = %next, "ingest transition");
        self.state = next;
    }

    fn fail(&mut self, err: IngestError) -> IngestError {
        self.advance(IngestState::Failed);
        tracing::warn!(college = self.college, kind = err.kind(), "ingest failed: {err}");
        err
    }
}

impl Pipeline {
    pub fn new(
        discovery: Arc<dyn Discovery>,
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            discovery,
            extractor,
            store,
            search_limit: 3,
            wait_ms: None,
        }
    }

    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn with_wait_ms(mut self, wait_ms: Option<u64>) -> Self {
        self.wait_ms = wait_ms;
        self
    }

    /// Run the whole pipeline for `college`. When `target_url` is given the
    /// search step is skipped and that page is extracted directly.
    pub async fn ingest(
        &self,
        college: &str,
        target_url: Option<&str>,
    ) -> Result<IngestReport, IngestError> {
        let college = college.trim();
        if college.is_empty() {
            return Err(IngestError::InvalidInput(
                "College name cannot be empty".to_string(),
            ));
        }

        let mut run = Run {
            college,
            state: IngestState::Idle,
        };
        tracing::info!(college, "ingest requested");

        let source_url = match target_url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => url.to_string(),
            None => {
                run.advance(IngestState::Searching);
                let query = schema::search_query(college);
                let hits = self
                    .discovery
                    .search(&query, self.search_limit)
                    .await
                    .map_err(|err| run.fail(IngestError::UpstreamUnavailable(err.to_string())))?;
                pick_target(college, &hits).map_err(|err| run.fail(err))?
            }
        };
        tracing::info!(college, url = %source_url, "extracting events page");

        run.advance(IngestState::Extracting);
        let urls = [source_url.clone()];
        let raw = self
            .extractor
            .extract(ExtractRequest {
                urls: &urls,
                instruction: schema::EXTRACT_INSTRUCTION,
                schema: &schema::EVENT_SCHEMA,
                wait_ms: self.wait_ms,
            })
            .await
            .map_err(|err| run.fail(IngestError::ExtractionFailed(err.to_string())))?;

        if raw.is_empty() {
            run.advance(IngestState::Done);
            return Ok(IngestReport {
                message: format!("No events found on the discovered page for {college}"),
                inserted_count: 0,
                source_url,
                records: Vec::new(),
                failures: Vec::new(),
            });
        }

        run.advance(IngestState::Inserting);
        let records = normalize_all(raw, college);
        let outcome = insert_all(self.store.as_ref(), &records).await;
        run.advance(IngestState::Done);

        let inserted_count = outcome.inserted_count();
        Ok(IngestReport {
            message: format!(
                "Successfully scraped and inserted {inserted_count} events from {}",
                title_case(college)
            ),
            inserted_count,
            source_url,
            records,
            failures: outcome.failures,
        })
    }
}

pub fn normalize_all(raw: Vec<RawEvent>, fallback_college: &str) -> Vec<EventRecord> {
    raw.into_iter()
        .map(|event| normalize(event, fallback_college))
        .collect()
}

// Top-ranked hit only; lower-ranked results are never tried.
fn pick_target(college: &str, hits: &[SearchHit]) -> Result<String, IngestError> {
    let top = hits
        .first()
        .ok_or_else(|| IngestError::NotFound(format!("No events page found for '{college}'")))?;
    top.url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            IngestError::NotFound(format!("No valid URL found for '{college}' events page"))
        })
}
