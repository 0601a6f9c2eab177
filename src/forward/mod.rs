//! Execution of translated requests.
//!
//! # Responsibilities
//! - Send the outgoing request to the authorized pushkey exactly once
//! - Report transport failures and non-2xx answers as errors
//!
//! # Design Decisions
//! - No retries here; delivery guarantees belong to the receiving endpoint
//! - `Forwarder` is a trait so the HTTP layer can be tested without a network

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;

use crate::config::ForwardConfig;
use crate::matrix::OutgoingRequest;

#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("upstream answered {0}")]
    Status(StatusCode),
}

/// Executes an [`OutgoingRequest`].
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: OutgoingRequest) -> Result<(), ForwardError>;
}

/// Forwarder backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    pub fn new(config: &ForwardConfig) -> Result<Self, ForwardError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: OutgoingRequest) -> Result<(), ForwardError> {
        let (method, target, headers, body) = request.into_parts();
        tracing::debug!(method = %method, target = %target, bytes = body.len(), "Forwarding Matrix push");

        let response = self
            .client
            .request(method, target.as_str())
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ForwardError::Status(status))
        }
    }
}
