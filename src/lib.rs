//! UnifiedPush Matrix push gateway.
//!
//! Accepts Matrix push gateway calls, forwards them to pushkeys under this
//! server's base URL and answers with the Matrix result document.

pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod matrix;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
