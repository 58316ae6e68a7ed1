use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::db::EventStore;
use crate::error::IngestError;
use crate::llm::GenerativeSearch;
use crate::models::RawEvent;
use crate::pipeline::{insert_all, normalize_all, InsertFailure};

pub const UNKNOWN_COLLEGE: &str = "unknown college";

static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\s*```\s*$").expect("valid fence regex")
});

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub region: String,
    pub colleges: Vec<String>,
    pub window_days: u32,
    pub timezone: Tz,
}

impl AggregatorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            region: config.region.clone(),
            colleges: config.colleges.clone(),
            window_days: config.window_days,
            timezone: config.timezone,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub message: String,
    pub attempted: usize,
    pub inserted_count: usize,
    pub failures: Vec<InsertFailure>,
}

pub struct Aggregator {
    model: Arc<dyn GenerativeSearch>,
    store: Arc<dyn EventStore>,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(
        model: Arc<dyn GenerativeSearch>,
        store: Arc<dyn EventStore>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            model,
            store,
            settings,
        }
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.settings.timezone).date_naive()
    }

    pub async fn discover_region_events(
        &self,
        region: &str,
        window_days: u32,
    ) -> Result<String, IngestError> {
        self.discover_from(region, window_days, self.today()).await
    }

    async fn discover_from(
        &self,
        region: &str,
        window_days: u32,
        today: NaiveDate,
    ) -> Result<String, IngestError> {
        let prompt = build_prompt(region, &self.settings.colleges, window_days, today)?;
        tracing::info!(region, window_days, "searching for regional college events");
        self.model
            .generate(&prompt)
            .await
            .map_err(|err| IngestError::UpstreamUnavailable(err.to_string()))
    }

    pub async fn run(&self) -> Result<AggregateReport, IngestError> {
        self.run_for(self.today()).await
    }

    pub async fn run_for(&self, today: NaiveDate) -> Result<AggregateReport, IngestError> {
        let text = self
            .discover_from(&self.settings.region, self.settings.window_days, today)
            .await?;
        let raw = parse_events(&text).map_err(|err| {
            tracing::error!("failed to parse events JSON: {err}");
            err
        })?;

        let attempted = raw.len();
        let records = normalize_all(raw, UNKNOWN_COLLEGE);
        let outcome = insert_all(self.store.as_ref(), &records).await;
        let inserted_count = outcome.inserted_count();

        let message = if inserted_count > 0 {
            format!("Weekly update completed successfully! Inserted {inserted_count} events.")
        } else {
            "Weekly update completed but no events were inserted.".to_string()
        };
        tracing::info!(attempted, inserted_count, "weekly update finished");

        Ok(AggregateReport {
            message,
            attempted,
            inserted_count,
            failures: outcome.failures,
        })
    }
}

pub fn build_prompt(
    region: &str,
    colleges: &[String],
    window_days: u32,
    today: NaiveDate,
) -> Result<String, IngestError> {
    let end = today
        .checked_add_days(Days::new(u64::from(window_days)))
        .ok_or_else(|| {
            IngestError::InvalidInput(format!(
                "a {window_days}-day window from {today} is out of range"
            ))
        })?;
    let date_range = format!("{} to {}", today.format("%B %d"), end.format("%B %d, %Y"));
    Ok(format!(
        r#"You are a search assistant. Find all college events, fests, and workshops happening in {region} from {date_range}.
Search for events at colleges like {colleges}, etc.

Return results as JSON with this format:
[
    {{
        "title": "Event Name",
        "college_name": "College Name",
        "category": "Technical" or "Cultural" or "Workshop",
        "date": "YYYY-MM-DD",
        "description": "Brief description",
        "link": "URL if available"
    }}
]
"#,
        region = region,
        date_range = date_range,
        colleges = colleges.join(", "),
    ))
}

/// Parse the model's text as a JSON array of records. Anything other than an
/// array aborts the whole batch; non-object elements are dropped.
pub fn parse_events(text: &str) -> Result<Vec<RawEvent>, IngestError> {
    let body = strip_fence(text);
    let value: Value = serde_json::from_str(body)
        .map_err(|err| IngestError::MalformedUpstreamResponse(err.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(IngestError::MalformedUpstreamResponse(format!(
                "expected a JSON array, got {}",
                kind_of(&other)
            )))
        }
    };

    let mut events = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            tracing::warn!("skipping non-object entry: {item}");
            continue;
        }
        match serde_json::from_value::<RawEvent>(item) {
            Ok(event) => events.push(event),
            Err(err) => tracing::warn!("skipping unreadable entry: {err}"),
        }
    }
    Ok(events)
}

fn strip_fence(text: &str) -> &str {
    FENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
