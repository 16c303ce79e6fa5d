//! Logger error types.

use thiserror::Error;

/// Errors raised while building or flushing a [`Logger`](super::Logger).
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("no encoder registered for name {0:?}")]
    UnknownEncoding(String),

    #[error("no sink found for scheme {scheme:?} in {path:?}")]
    UnknownScheme { scheme: String, path: String },

    #[error("couldn't open sink {path:?}: {source}")]
    OpenSink {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid sink scheme {0:?}")]
    InvalidScheme(String),

    #[error("sink factory already registered for scheme {0:?}")]
    SchemeRegistered(String),

    #[error("sync {sink}: {source}")]
    Sync {
        sink: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{} sinks failed to sync: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<LoggerError>),

    #[error("a global tracing dispatcher is already installed")]
    GlobalAlreadySet,
}

fn join_errors(errors: &[LoggerError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LoggerError {
    /// Collapse a list of failures into one error, if there are any.
    pub(crate) fn combine(mut errors: Vec<LoggerError>) -> Result<(), LoggerError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(LoggerError::Multiple(errors)),
        }
    }
}
