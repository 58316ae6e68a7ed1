use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::aggregator::{Aggregator, UNKNOWN_COLLEGE};
use crate::db::EventStore;
use crate::error::IngestError;
use crate::models::{EventRecord, RawEvent, StoredEvent};
use crate::normalize::normalize;
use crate::pipeline::{InsertFailure, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<dyn EventStore>,
    pub aggregator: Option<Arc<Aggregator>>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    college: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    message: String,
    count: usize,
    events: Vec<EventRecord>,
    discovered_url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<InsertFailure>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyUpdateResponse {
    message: String,
    inserted_count: usize,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<StoredEvent>>, IngestError> {
    let events = state.store.list_all().await.map_err(|err| {
        tracing::error!("failed to list events: {err}");
        IngestError::StorageReadFailed(err.to_string())
    })?;
    Ok(Json(events))
}

async fn scrape_events(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Result<Json<ScrapeResponse>, IngestError> {
    let college = params.college.unwrap_or_default();
    let report = state
        .pipeline
        .ingest(&college, params.url.as_deref())
        .await?;
    Ok(Json(ScrapeResponse {
        message: report.message,
        count: report.inserted_count,
        events: report.records,
        discovered_url: report.source_url,
        failures: report.failures,
    }))
}

async fn create_event(
    State(state): State<AppState>,
    Json(raw): Json<RawEvent>,
) -> Result<Json<StoredEvent>, IngestError> {
    let record = normalize(raw, UNKNOWN_COLLEGE);
    let stored = state.store.insert_one(&record).await.map_err(|err| {
        tracing::error!(title = %record.title, "failed to insert event: {err}");
        IngestError::StorageWriteFailed(err.to_string())
    })?;
    Ok(Json(stored))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<StoredEvent>>, IngestError> {
    let deleted = state.store.delete_by_id(id).await.map_err(|err| {
        tracing::error!(id, "failed to delete event: {err}");
        IngestError::StorageWriteFailed(err.to_string())
    })?;
    Ok(Json(deleted))
}

async fn weekly_update(
    State(state): State<AppState>,
) -> Result<Json<WeeklyUpdateResponse>, IngestError> {
    let aggregator = state.aggregator.as_ref().ok_or_else(|| {
        IngestError::UpstreamUnavailable(
            "generative search is not configured (missing GEMINI_API_KEY)".to_string(),
        )
    })?;
    let report = aggregator.run().await?;
    Ok(Json(WeeklyUpdateResponse {
        message: report.message,
        inserted_count: report.inserted_count,
    }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", delete(delete_event))
        .route("/scrape-events", get(scrape_events))
        .route("/weekly-update", post(weekly_update))
        .with_state(state)
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let app = routes(state);
    let app = if origins.is_empty() {
        app
    } else {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                ])
                .allow_credentials(true),
        )
    };
    app.layer(TraceLayer::new_for_http())
}
