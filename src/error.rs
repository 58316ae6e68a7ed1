use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("storage read failed: {0}")]
    StorageReadFailed(String),
    #[error("storage write failed: {0}")]
    StorageWriteFailed(String),
    #[error("malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::ExtractionFailed(_) => "extraction_failed",
            Self::StorageReadFailed(_) => "storage_read_failed",
            Self::StorageWriteFailed(_) => "storage_write_failed",
            Self::MalformedUpstreamResponse(_) => "malformed_upstream_response",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_kind: &'static str,
    pub error_detail: String,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_kind: self.kind(),
            error_detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
