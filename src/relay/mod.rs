//! Relay subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs  accept → admission → spawn session
//!     → session.rs  dial backend (timeout) → split both sockets
//!         → frame.rs  client→backend  (frames, counts commands + bytes)
//!         → frame.rs  backend→client  (frames, counts bytes)
//!     → first direction to end closes both sockets, both are joined
//! ```
//!
//! # Design Decisions
//! - Frames are located, never interpreted
//! - Errors stay inside their session; the accept loop never stops for one

pub mod error;
pub mod frame;
pub mod server;
pub mod session;

pub use error::ConnectionError;
pub use frame::{relay_frames, Direction, SessionCounters};
pub use server::RelayServer;
pub use session::{ConnectionHandler, SessionSummary};
