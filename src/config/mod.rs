//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once by HttpServer::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable for the process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    JournalConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, RouteConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
