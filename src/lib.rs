//! Transparent TCP relay for line-oriented ServerQuery protocols.
//!
//! Runs next to the backend service, forwarding newline-delimited frames in
//! both directions while enforcing a connection cap and a per-source rate
//! limit, and logging aggregate traffic statistics.

pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod security;

pub use config::schema::ProxyConfig;
pub use lifecycle::{ProxyHandle, Shutdown};
pub use relay::RelayServer;
