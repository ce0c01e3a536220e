//! Admission control for accepted connections.
//!
//! Capacity is checked before the rate limiter, so a saturated relay rejects
//! for capacity without consuming the source's rate budget.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::observability::Stats;
use crate::security::rate_limit::RateLimiter;

/// Outcome of admission control for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Active connections already at the configured maximum.
    AtCapacity,
    /// The source address exceeded its per-window budget.
    RateLimited,
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Admission::Admitted => write!(f, "admitted"),
            Admission::AtCapacity => write!(f, "connection limit reached"),
            Admission::RateLimited => write!(f, "rate limit exceeded"),
        }
    }
}

/// Capacity and rate checks applied before a connection is relayed.
#[derive(Debug, Clone)]
pub struct AdmissionControl {
    stats: Arc<Stats>,
    max_connections: u64,
    limiter: Option<Arc<RateLimiter>>,
}

impl AdmissionControl {
    /// `limiter` is `None` when rate limiting is disabled.
    pub fn new(stats: Arc<Stats>, max_connections: usize, limiter: Option<Arc<RateLimiter>>) -> Self {
        Self {
            stats,
            max_connections: max_connections as u64,
            limiter,
        }
    }

    pub fn check(&self, peer: SocketAddr) -> Admission {
        if self.stats.active_connections() >= self.max_connections {
            return Admission::AtCapacity;
        }

        match &self.limiter {
            Some(limiter) if !limiter.allow(&source_key(peer)) => Admission::RateLimited,
            _ => Admission::Admitted,
        }
    }
}

/// Rate limiter key for a peer: the host portion only.
pub fn source_key(peer: SocketAddr) -> String {
    peer.ip().to_string()
}
