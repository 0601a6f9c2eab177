//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the Matrix push gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Matrix translation settings (base URL, size cap).
    pub gateway: MatrixConfig,

    /// Outgoing request settings.
    pub forward: ForwardConfig,

    /// Per-visitor abuse tracking.
    pub visitor: VisitorConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Settings read by the Matrix translator on every request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// URL of the push server that receives forwarded notifications, such as
    /// `https://ntfy.example.com`. Pushkeys must start with it. Never point it
    /// at this gateway.
    pub base_url: String,

    /// Maximum accepted Matrix request body, in bytes.
    pub max_length: usize,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            max_length: 4096,
        }
    }
}

/// Outgoing request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Total timeout for one forwarded request, in seconds.
    pub timeout_secs: u64,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` for outgoing requests.
    pub use_system_proxy: bool,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            use_system_proxy: true,
        }
    }
}

/// Visitor rate limiting and rejection accounting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VisitorConfig {
    /// Enforce the per-visitor rate limit.
    pub enabled: bool,

    /// Sustained requests per second per visitor.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,

    /// Extra tokens charged for each rejected pushkey.
    pub rejection_cost: u32,

    /// How often idle visitors with a full bucket are forgotten, in seconds.
    pub eviction_interval_secs: u64,
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 10,
            burst_size: 60,
            rejection_cost: 1,
            eviction_interval_secs: 60,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Address for the metrics listener.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "matrix_push_gateway=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
