//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → admission control (security)
//!     → connection.rs (ID, active-connection guard)
//!     → Hand off to the relay
//! ```
//!
//! # Design Decisions
//! - Bind failure is fatal, accept failure is not
//! - Each admitted connection holds a guard until its session ends

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId};
pub use listener::{Listener, ListenerError};
