//! Process-wide traffic counters.
//!
//! # Responsibilities
//! - Count accepted connections, active connections, forwarded commands and bytes
//! - Remember when the relay started
//! - Produce point-in-time snapshots for the statistics log line
//!
//! # Design Decisions
//! - Each counter is an independent atomic; there is no cross-counter consistency
//! - Relaxed ordering: readers only need eventually-visible values
//! - Owned by the acceptor and shared as `Arc<Stats>`, never a global

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// Aggregate relay statistics.
#[derive(Debug)]
pub struct Stats {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    total_commands: AtomicU64,
    total_bytes: AtomicU64,
    started_at: Instant,
    started_wall: SystemTime,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            total_commands: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
            started_at: Instant::now(),
            started_wall: SystemTime::now(),
        }
    }

    /// Record an admitted connection: bumps both the total and the active count.
    ///
    /// Pair every call with exactly one [`Stats::connection_closed`]; the
    /// [`ConnectionGuard`](crate::net::ConnectionGuard) does this on drop.
    pub fn connection_opened(&self) -> u64 {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn connection_closed(&self) -> u64 {
        let previous = self.active_connections.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "active connection counter underflow");
        previous.saturating_sub(1)
    }

    /// One client→backend frame was forwarded.
    pub fn add_command(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes(&self, n: u64) {
        self.total_bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn total_commands(&self) -> u64 {
        self.total_commands.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_wall
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Read every counter once. Values may mix updates from concurrent sessions.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: Duration::from_secs(self.uptime().as_secs()),
            total_connections: self.total_connections(),
            active_connections: self.active_connections(),
            total_commands: self.total_commands(),
            total_bytes: self.total_bytes(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`Stats`], uptime rounded down to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    pub total_connections: u64,
    pub active_connections: u64,
    pub total_commands: u64,
    pub total_bytes: u64,
}

impl StatsSnapshot {
    /// Emit the snapshot as a single structured `info` event.
    pub fn log(&self) {
        tracing::info!(
            uptime = %humantime::format_duration(self.uptime),
            total_connections = self.total_connections,
            active_connections = self.active_connections,
            total_commands = self.total_commands,
            total_bytes = self.total_bytes,
            "Statistics"
        );
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uptime={} connections={} active={} commands={} bytes={}",
            humantime::format_duration(self.uptime),
            self.total_connections,
            self.active_connections,
            self.total_commands,
            self.total_bytes
        )
    }
}
