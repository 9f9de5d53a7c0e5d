//! API-scoped errors. Each variant carries enough to pick both an HTTP
//! status and a JSON body; translation into an `axum::response::Response`
//! lives on `ApiError` itself rather than in a shared middleware.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("run {0:?} is not a well-formed run id (expected YYYYMMDD_HHz)")]
    MalformedRunId(String),

    #[error("run {run} not found for model {model}")]
    RunNotFound { model: String, run: String },

    #[error("no published runs are available for model {0}")]
    NoLatestRun(String),

    #[error("variable {var} not found for model {model}")]
    UnknownVariable { model: String, var: String },

    #[error("forecast hour {fh} not available for {model}/{run}/{var}")]
    FrameNotFound { model: String, run: String, var: String, fh: u32 },

    #[error("contour key {key:?} not found for {model}/{run}/{var}/{fh}")]
    ContourNotFound { model: String, run: String, var: String, fh: u32, key: String },

    #[error("rate limit exceeded, retry after {retry_after_sec}s")]
    RateLimited { retry_after_sec: u64 },

    #[error(transparent)]
    Capabilities(#[from] capabilities::CapabilitiesError),

    #[error(transparent)]
    RasterIo(#[from] raster_io::RasterIoError),

    #[error("io error at {path}: {detail}")]
    Io { path: String, detail: String },
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownModel(_)
            | ApiError::RunNotFound { .. }
            | ApiError::NoLatestRun(_)
            | ApiError::UnknownVariable { .. }
            | ApiError::FrameNotFound { .. }
            | ApiError::ContourNotFound { .. }
            | ApiError::Capabilities(capabilities::CapabilitiesError::UnknownModel(_))
            | ApiError::Capabilities(capabilities::CapabilitiesError::UnknownVariable { .. }) => StatusCode::NOT_FOUND,
            ApiError::MalformedRunId(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::RateLimited { retry_after_sec } = &self {
            let body = Json(json!({ "error": self.to_string(), "retryAfterSec": retry_after_sec }));
            return (status, [("Retry-After", retry_after_sec.to_string())], body).into_response();
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
