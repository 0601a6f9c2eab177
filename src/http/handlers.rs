//! Route handlers.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::http::error::HttpError;
use crate::http::request::RequestIdExt;
use crate::http::server::AppState;
use crate::matrix::{self, translate};
use crate::observability::metrics;

/// `GET /_matrix/push/v1/notify`
pub async fn discovery_handler() -> Response {
    matrix::discovery_response()
}

/// `POST /_matrix/push/v1/notify`
///
/// Translates the push, forwards it, and answers with the Matrix result body.
pub async fn notify_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let request_id = request.request_id().to_string();

    // One snapshot per call; a reload mid-request does not affect it.
    let settings = state.matrix.load_full();

    let outgoing = match translate(request, &settings.base_url, settings.max_length).await {
        Ok(outgoing) => outgoing,
        Err(err) => {
            if let Some(pushkey) = err.rejected_pushkey() {
                tracing::info!(
                    request_id = %request_id,
                    visitor = %addr.ip(),
                    pushkey = %pushkey,
                    base_url = %settings.base_url,
                    "Pushkey outside base URL"
                );
                let rejected = vec![pushkey.to_string()];
                metrics::record_request(&method, 200, "rejected", start);
                return matrix::rejection_response(state.visitors.as_ref(), addr.ip(), &rejected);
            }

            tracing::debug!(request_id = %request_id, error = %err, "Invalid Matrix request");
            let body = HttpError::from(&err);
            metrics::record_request(&method, body.http, err.kind(), start);
            return body.into_response();
        }
    };

    let target = outgoing.target().to_string();
    match state.forwarder.forward(outgoing).await {
        Ok(()) => {
            tracing::debug!(request_id = %request_id, target = %target, "Matrix push forwarded");
            metrics::record_request(&method, 200, "forwarded", start);
            matrix::success_response()
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, target = %target, error = %e, "Forwarding Matrix push failed");
            metrics::record_forward_failure();
            let body = HttpError::bad_gateway();
            metrics::record_request(&method, body.http, "forward_failed", start);
            body.into_response()
        }
    }
}

/// `GET /health`
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "healthy": true }))
}
