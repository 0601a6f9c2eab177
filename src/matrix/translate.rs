//! Inbound Matrix push → outgoing request.
//!
//! # Responsibilities
//! - Read the body with a hard size cap before any parsing
//! - Check the payload has the Matrix notification shape
//! - Authorize the pushkey against the configured base URL
//! - Build the outgoing request from the original bytes
//!
//! # Design Decisions
//! - The body is never re-serialized; senders may have signed the exact bytes
//! - Prefix match is case-sensitive and must end on a URL boundary
//! - A pushkey pointing back at the notify route is refused

use axum::{
    body::{Body, Bytes},
    http::{header::HeaderValue, HeaderMap, Method, Request},
};
use futures_util::StreamExt;
use url::Url;

use crate::matrix::error::MatrixError;
use crate::matrix::types::MatrixPushNotification;
use crate::matrix::NOTIFY_PATH;

/// Header carrying the pushkey on the forwarded request.
pub const X_MATRIX_PUSHKEY: &str = "x-matrix-pushkey";

/// A validated request ready to be handed to the forwarder.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Bytes,
}

impl OutgoingRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Destination URL; always equal to the authorized pushkey.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The inbound body, byte for byte.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_parts(self) -> (Method, String, HeaderMap, Bytes) {
        (self.method, self.target, self.headers, self.body)
    }
}

/// Translate an inbound Matrix push request into the request to forward.
///
/// Checks run in order and stop at the first failure: size, shape, pushkey.
pub async fn translate(
    request: Request<Body>,
    base_url: &str,
    max_length: usize,
) -> Result<OutgoingRequest, MatrixError> {
    let (parts, body) = request.into_parts();
    let bytes = read_limited(body, max_length).await?;
    let pushkey = authorized_pushkey(&bytes, base_url)?;

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&pushkey).map_err(|_| MatrixError::MessageInvalid)?;
    headers.insert(X_MATRIX_PUSHKEY, value);

    Ok(OutgoingRequest {
        method: parts.method,
        target: pushkey,
        headers,
        body: bytes,
    })
}

/// Collect at most `max_length` bytes, failing as soon as more arrive.
async fn read_limited(body: Body, max_length: usize) -> Result<Bytes, MatrixError> {
    let mut stream = body.into_data_stream();
    let mut buf: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::debug!(error = %e, "Failed to read Matrix request body");
            MatrixError::MessageInvalid
        })?;
        if buf.len() + chunk.len() > max_length {
            return Err(MatrixError::RequestTooLarge);
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

fn authorized_pushkey(bytes: &[u8], base_url: &str) -> Result<String, MatrixError> {
    let message: MatrixPushNotification =
        serde_json::from_slice(bytes).map_err(|_| MatrixError::MessageInvalid)?;

    let device = message.primary_device().ok_or(MatrixError::MessageInvalid)?;
    let pushkey = device.pushkey.as_str();
    if pushkey.is_empty() {
        return Err(MatrixError::MessageInvalid);
    }

    if !under_base_url(pushkey, base_url) {
        return Err(MatrixError::PushkeyBaseUrlMismatch {
            pushkey: pushkey.to_string(),
        });
    }

    let url = match Url::parse(pushkey) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => return Err(MatrixError::MessageInvalid),
    };

    // Forwarding to our own notify route would feed the push back into us.
    if url.path().trim_end_matches('/') == NOTIFY_PATH {
        tracing::debug!(pushkey = %pushkey, "Pushkey points at the Matrix notify route");
        return Err(MatrixError::MessageInvalid);
    }

    Ok(pushkey.to_string())
}

/// `pushkey` starts with `base_url` and the match ends where a URL component
/// ends, so `https://push.example.com.evil.org` or
/// `https://push.example.com@evil.org` never pass for `https://push.example.com`.
fn under_base_url(pushkey: &str, base_url: &str) -> bool {
    let Some(rest) = pushkey.strip_prefix(base_url) else {
        return false;
    };
    base_url.ends_with('/') || rest.is_empty() || rest.starts_with(['/', '?', '#'])
}
