//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line flags (cli.rs)  +  optional TOML file
//!     → loader.rs (parse & deserialize)
//!     → flags override file values
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod duration_format;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, RateLimitConfig,
    ShutdownConfig,
};
pub use validation::{validate_config, ValidationError};
