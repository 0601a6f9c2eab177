//! Matrix push gateway responses.
//!
//! The push gateway API signals everything through the body: each writer
//! answers 200 with a single JSON line.

use std::net::IpAddr;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::security::visitor::AbuseTracker;

#[derive(Serialize)]
struct Discovery {
    unifiedpush: UnifiedPush,
}

#[derive(Serialize)]
struct UnifiedPush {
    gateway: &'static str,
}

#[derive(Serialize)]
struct Rejected<'a> {
    rejected: &'a [String],
}

/// `{"unifiedpush":{"gateway":"matrix"}}`
pub fn discovery_response() -> Response {
    json_line(&Discovery {
        unifiedpush: UnifiedPush { gateway: "matrix" },
    })
}

/// `{"rejected":[]}`
pub fn success_response() -> Response {
    json_line(&Rejected { rejected: &[] })
}

/// `{"rejected":[<pushkey>, ...]}`
///
/// Every rejected pushkey is reported to `tracker` for `visitor` before the
/// body is built, so refused attempts still count against the caller.
pub fn rejection_response(tracker: &dyn AbuseTracker, visitor: IpAddr, pushkeys: &[String]) -> Response {
    for pushkey in pushkeys {
        tracker.record_rejection(visitor, pushkey);
    }
    json_line(&Rejected { rejected: pushkeys })
}

fn json_line<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(mut body) => {
            body.push(b'\n');
            let mut response = Response::new(Body::from(body));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode Matrix response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
