//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check encoding names and sink identifiers
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - The level is never rejected: unknown levels fall back to info at construction
//! - Empty fields are fine (they take defaults); empty entries inside a list are not

use thiserror::Error;

use crate::config::schema::LoggerConfig;
use crate::observability::encoder::Encoding;
use crate::observability::sink::{is_known_scheme, split_scheme};

/// A single semantic problem in a [`LoggerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown encoding {0:?} (expected \"json\" or \"console\")")]
    UnknownEncoding(String),

    #[error("{field}[{index}] is empty")]
    EmptySink { field: &'static str, index: usize },

    #[error("{field}[{index}]: unknown sink scheme {scheme:?}")]
    UnknownScheme {
        field: &'static str,
        index: usize,
        scheme: String,
    },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &LoggerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let encoding = config.encoding.trim();
    if !encoding.is_empty() && encoding.parse::<Encoding>().is_err() {
        errors.push(ValidationError::UnknownEncoding(config.encoding.clone()));
    }

    check_sinks("outputPaths", &config.output_paths, &mut errors);
    check_sinks("errorOutputPaths", &config.error_output_paths, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_sinks(field: &'static str, paths: &[String], errors: &mut Vec<ValidationError>) {
    for (index, path) in paths.iter().enumerate() {
        if path.trim().is_empty() {
            errors.push(ValidationError::EmptySink { field, index });
            continue;
        }
        if let Some((scheme, _)) = split_scheme(path) {
            if !is_known_scheme(scheme) {
                errors.push(ValidationError::UnknownScheme {
                    field,
                    index,
                    scheme: scheme.to_string(),
                });
            }
        }
    }
}
