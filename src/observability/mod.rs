//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sessions and the acceptor produce:
//!     → logging.rs (structured log events)
//!     → stats.rs (atomic counters)
//!
//! Consumers:
//!     → reporter.rs (periodic statistics log line)
//!     → shutdown path (final statistics log line)
//! ```
//!
//! # Design Decisions
//! - Structured logging, pretty or JSON
//! - Counters are cheap (atomic increments) and only ever logged
//! - No metrics endpoint: statistics leave the process through logs only

pub mod logging;
pub mod reporter;
pub mod stats;

pub use logging::init_logging;
pub use reporter::StatsReporter;
pub use stats::{Stats, StatsSnapshot};
