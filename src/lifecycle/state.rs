//! Relay lifecycle states.

use std::fmt;

/// `Stopped → Listening → Draining → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Not bound, or fully shut down.
    #[default]
    Stopped,
    /// Accepting and dispatching connections.
    Listening,
    /// Listener closed; waiting for sessions to finish.
    Draining,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Stopped => write!(f, "stopped"),
            LifecycleState::Listening => write!(f, "listening"),
            LifecycleState::Draining => write!(f, "draining"),
        }
    }
}
