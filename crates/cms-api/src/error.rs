//! API error type and its HTTP mapping
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cms_core::FetchError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown mapping: {0}")]
    UnknownMapping(String),

    #[error("fetch failed: {0}")]
    Fetch(FetchError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownMapping(_) => StatusCode::NOT_FOUND,
            ApiError::Fetch(FetchError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Fetch(_) => StatusCode::BAD_GATEWAY,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        ApiError::Fetch(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = match &self {
            ApiError::Fetch(err) => json!({ "error": self.to_string(), "fetch": err }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
