//! Service utilities: a structured logging facade and an HTTP response envelope.

pub mod config;
pub mod http;
pub mod observability;

pub use config::LoggerConfig;
pub use http::Response;
pub use observability::{LeveledLogger, Level, Logger, LoggerError};
