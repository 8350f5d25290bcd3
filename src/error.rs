use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or missing credentials or spreadsheet binding.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network, auth or HTTP failure reported by the spreadsheet provider.
    #[error("spreadsheet provider error: {0}")]
    Remote(String),

    /// Provider is rate limiting, overloaded, or did not answer in time.
    #[error("spreadsheet provider unavailable: {0}")]
    Unavailable(String),

    #[error("user {0} not found")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Config(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Remote(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ApiError::Unavailable(e.to_string());
        }
        match e.status() {
            Some(StatusCode::TOO_MANY_REQUESTS) | Some(StatusCode::SERVICE_UNAVAILABLE) => {
                ApiError::Unavailable(e.to_string())
            }
            _ => ApiError::Remote(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(%status, error = %message, "request failed");
        } else {
            warn!(%status, error = %message, "request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
