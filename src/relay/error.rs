//! Per-connection relay errors.
//!
//! None of these cross a connection boundary: the session logs them and tears down.

use std::time::Duration;

use crate::relay::frame::Direction;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("failed to connect to backend {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {timeout:?} connecting to backend {address}")]
    DialTimeout { address: String, timeout: Duration },

    #[error("{direction} read failed: {source}")]
    Read {
        direction: Direction,
        #[source]
        source: std::io::Error,
    },

    #[error("{direction} write failed: {source}")]
    Write {
        direction: Direction,
        #[source]
        source: std::io::Error,
    },
}
