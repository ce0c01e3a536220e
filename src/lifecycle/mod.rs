//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Bind listener → Start sweeper/reporter → Accept loop
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close listener → Drain sessions → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listener, then background tasks
//! - Ordered shutdown: stop accept, drain, close
//! - Draining is unbounded unless a drain timeout is configured

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{ProxyError, ProxyHandle};
pub use state::LifecycleState;
