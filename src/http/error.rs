//! Standard error body for non-protocol failures.
//!
//! Everything that is not a Matrix push gateway answer (oversized bodies,
//! malformed JSON, throttling, upstream failures) uses this shape:
//! `{"code":40019,"http":400,"error":"..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::matrix::MatrixError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpError {
    pub code: u32,
    pub http: u16,
    pub error: String,
}

impl HttpError {
    fn new(code: u32, http: StatusCode, error: &str) -> Self {
        Self {
            code,
            http: http.as_u16(),
            error: error.to_string(),
        }
    }

    pub fn too_many_requests() -> Self {
        Self::new(42901, StatusCode::TOO_MANY_REQUESTS, "limit reached: too many requests")
    }

    pub fn bad_gateway() -> Self {
        Self::new(50201, StatusCode::BAD_GATEWAY, "upstream push endpoint unavailable")
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.http).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<&MatrixError> for HttpError {
    fn from(err: &MatrixError) -> Self {
        match err {
            MatrixError::RequestTooLarge => {
                Self::new(41302, StatusCode::PAYLOAD_TOO_LARGE, &err.to_string())
            }
            MatrixError::MessageInvalid => Self::new(40019, StatusCode::BAD_REQUEST, &err.to_string()),
            MatrixError::PushkeyBaseUrlMismatch { .. } => Self::new(
                40020,
                StatusCode::BAD_REQUEST,
                "invalid request: push key must be prefixed with base URL",
            ),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
