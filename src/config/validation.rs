//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes and timeouts > 0)
//! - Check the base URL is something pushkeys can be compared against
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address is not a socket address: {0}")]
    BindAddress(String),

    #[error("gateway.base_url must be an absolute http(s) URL: {0}")]
    BaseUrl(String),

    #[error("gateway.max_length must be greater than zero")]
    MaxLength,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("observability.metrics_address is not a socket address: {0}")]
    MetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let base_url = &config.gateway.base_url;
    match Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(ValidationError::BaseUrl(base_url.clone())),
    }

    if config.gateway.max_length == 0 {
        errors.push(ValidationError::MaxLength);
    }
    if config.forward.timeout_secs == 0 {
        errors.push(ValidationError::Zero("forward.timeout_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.visitor.requests_per_second == 0 {
        errors.push(ValidationError::Zero("visitor.requests_per_second"));
    }
    if config.visitor.burst_size == 0 {
        errors.push(ValidationError::Zero("visitor.burst_size"));
    }
    if config.visitor.eviction_interval_secs == 0 {
        errors.push(ValidationError::Zero("visitor.eviction_interval_secs"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
