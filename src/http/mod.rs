//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → security::visitor (per-IP limit)
//!     → handlers.rs (Matrix discovery / notify, health)
//!     → error.rs (standard error body for non-protocol failures)
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::HttpError;
pub use request::{MakeRequestUuidV4, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
