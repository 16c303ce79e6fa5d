//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Logger::info / infof! / ...      tracing::info! (after install_global)
//!     → logging.rs (level check, caller, with-context)
//!     → tracing Dispatch
//!     → layer.rs (RecordLayer: threshold, field collection)
//!     → encoder.rs (JSON or console line)
//!     → sink.rs (stdout, stderr, files, registered schemes)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing, console format for humans
//! - Each logger tree owns its own dispatcher; nothing global unless asked for
//! - Sinks are shared by every logger derived from one constructor call

pub mod encoder;
pub mod error;
pub mod field;
pub mod layer;
pub mod level;
pub mod logging;
pub mod sink;

pub use encoder::Encoding;
pub use error::LoggerError;
pub use field::{Field, Fields};
pub use level::{AtomicLevel, Level, ParseLevelError};
pub use logging::{LeveledLogger, Logger};
pub use sink::{register_sink, FileSink, MemorySink, Sink, SinkFactory, StdStream};
