//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → visitor.rs (check per-IP token bucket, 429 when empty)
//!     → Matrix translator (pushkey must sit under the base URL)
//!     → On rejection: visitor.rs charges the visitor extra tokens
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input
//! - Rejected pushkeys cost the caller, so probing for open relays is throttled

pub mod visitor;

pub use visitor::{AbuseTracker, VisitorLimiter};
