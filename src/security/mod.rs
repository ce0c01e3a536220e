//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection:
//!     → admission.rs (capacity check, then per-source rate check)
//!     → rate_limit.rs (sliding log per source address)
//!     → dispatch to the relay, or close immediately
//! ```
//!
//! # Design Decisions
//! - Rejection is silent to the client: the socket is simply closed
//! - Rejections are logged, never counted in the traffic statistics
//! - No authentication or encryption; exposure equals the backend port's

pub mod admission;
pub mod rate_limit;

pub use admission::{source_key, Admission, AdmissionControl};
pub use rate_limit::RateLimiter;
