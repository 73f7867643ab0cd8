//! REST API module for HTTP endpoints
//!
//! - `GET /api/messages` - Paginated, filterable message listing
//! - `POST /api/messages` - Post a message
//! - `GET /api/channels` - Channels present in the buffer
//! - `GET /api/announcement` - Current announcement
//! - `GET /api/stats` - Store and durable log counters
//! - `PUT /api/admin/announcement` - Replace the announcement (admin)
//! - `DELETE /api/admin/messages/:index` - Delete a buffered message (admin)

pub mod admin;
pub mod board;
pub mod messages;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;

use crate::error::RelayError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiError {
    fn new(message: impl Into<String>, code: &str) -> Self {
        Self {
            error: message.into(),
            code: code.to_string(),
            retry_after: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, "NOT_FOUND")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, "BAD_REQUEST")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(message, "FORBIDDEN")
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self {
            retry_after: Some(retry_after_secs),
            ..Self::new(message, "RATE_LIMITED")
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, "INTERNAL_ERROR")
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::Validation(e) => {
                (StatusCode::BAD_REQUEST, Json(ApiError::bad_request(e.to_string()))).into_response()
            }
            RelayError::Malformed(reason) => {
                (StatusCode::BAD_REQUEST, Json(ApiError::bad_request(reason))).into_response()
            }
            RelayError::RateLimited { retry_after_secs } => {
                let body = ApiError::rate_limited(self.to_string(), retry_after_secs);
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            RelayError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, Json(ApiError::not_found(self.to_string()))).into_response()
            }
            RelayError::Log(_) | RelayError::Config(_) => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiError::internal("internal error")),
                )
                    .into_response()
            }
        }
    }
}
