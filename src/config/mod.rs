//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or LoggerConfig built in code
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → LoggerConfig (immutable)
//!     → consumed by one Logger constructor call
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::LoggerConfig;
pub use validation::{validate_config, ValidationError};
