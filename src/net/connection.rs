//! Connection identity and lifetime accounting.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Pair every active-connection increment with exactly one decrement

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::Stats;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Guard that tracks an admitted connection's lifetime.
///
/// Creating it counts the connection as accepted and active; dropping it
/// decrements the active count. The decrement happens on every exit path,
/// including a panicking or aborted session task.
#[derive(Debug)]
pub struct ConnectionGuard {
    stats: Arc<Stats>,
    id: ConnectionId,
    active_at_open: u64,
}

impl ConnectionGuard {
    pub fn open(stats: Arc<Stats>) -> Self {
        let active_at_open = stats.connection_opened();
        Self {
            stats,
            id: ConnectionId::new(),
            active_at_open,
        }
    }

    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Active connection count right after this connection was counted.
    pub fn active_at_open(&self) -> u64 {
        self.active_at_open
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.stats.connection_closed();
        tracing::trace!(connection_id = %self.id, active = remaining, "Connection released");
    }
}
