//! Matrix push gateway protocol adapter.
//!
//! # Data Flow
//! ```text
//! POST /_matrix/push/v1/notify (Matrix JSON)
//!     → translate.rs (size guard, shape check, pushkey authorization)
//!     → OutgoingRequest (handed to the forwarder)
//!     → response.rs (success / rejection body, always HTTP 200)
//!
//! GET /_matrix/push/v1/notify
//!     → response.rs (UnifiedPush discovery document)
//! ```
//!
//! # Design Decisions
//! - The inbound bytes are captured once and forwarded untouched
//! - Only pushkeys under the configured base URL are ever forwarded
//! - A rejected pushkey is a protocol answer (200), not an HTTP error

pub mod error;
pub mod response;
pub mod translate;
pub mod types;

pub use error::MatrixError;
pub use response::{discovery_response, rejection_response, success_response};
pub use translate::{translate, OutgoingRequest, X_MATRIX_PUSHKEY};
pub use types::{Device, MatrixPushNotification, Notification};

/// Path of the Matrix push gateway endpoint.
pub const NOTIFY_PATH: &str = "/_matrix/push/v1/notify";
