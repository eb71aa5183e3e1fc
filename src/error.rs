//! Error types shared by the adapters, the pipeline and the HTTP layer.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::generative::Task;
use crate::models::FabricAnalysisResult;

/// Malformed user input. Caught at the boundary, never reaches a model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid URL")]
    InvalidUrl { field: &'static str },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    /// The body was not JSON or did not match the expected shape.
    #[error("Invalid request body: {message}")]
    Body { message: String },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidUrl { field } | Self::Empty { field } => field,
            Self::Body { .. } => "body",
        }
    }
}

impl From<JsonRejection> for ValidationError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body { message: rejection.body_text() }
    }
}

/// The generative service failed or returned something unusable.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("could not fetch fabric image: {0}")]
    ImageFetch(String),
    #[error("prompt was blocked: {0}")]
    Blocked(String),
    #[error("model returned no output")]
    EmptyOutput,
    #[error("malformed model output: {0}")]
    Malformed(String),
    #[error("No designs were generated")]
    NoDesigns,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("design generation timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("design generation was cancelled")]
    Cancelled,
}

/// A failed pipeline run: the stage that failed and what was learned before it.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct PipelineError {
    pub stage: Task,
    pub analysis: Option<FabricAnalysisResult>,
    pub source: FlowError,
}

/// JSON API error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("{0}")]
    TimedOut(String),
    #[error("{0}")]
    Cancelled(String),
}

impl From<FlowError> for ApiError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::Validation(v) => Self::Validation(v),
            FlowError::Generation(g) => Self::Generation(g),
            e @ FlowError::TimedOut(_) => Self::TimedOut(e.to_string()),
            e @ FlowError::Cancelled => Self::Cancelled(e.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        e.source.into()
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Generation(_) => StatusCode::BAD_GATEWAY,
            Self::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Generation(_) => "GENERATION_ERROR",
            Self::TimedOut(_) => "TIMEOUT",
            Self::Cancelled(_) => "CANCELLED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Validation(e) => tracing::warn!(field = e.field(), error = %e, "Rejected input"),
            _ => tracing::error!(error = %self, "Generation failed"),
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
