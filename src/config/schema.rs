//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Keys are camelCase (`outputPaths`, `errorOutputPaths`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logger configuration.
///
/// Every field is expected to be set. Empty values are not an error: the
/// logger substitutes the default for each empty field (see [`normalized`]).
///
/// [`normalized`]: LoggerConfig::normalized
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Minimum level: debug, info, warn, error, dpanic, panic or fatal.
    /// Anything else is treated as info.
    pub level: String,

    /// Development mode: capitalized levels, RFC 3339 timestamps, stack
    /// traces from warn, and `dpanic` panics.
    pub development: bool,

    /// "json" or "console".
    pub encoding: String,

    /// Sinks for log records ("stdout", "stderr", file paths, `scheme://...`).
    pub output_paths: Vec<String>,

    /// Sinks for the logger's own errors, such as failed writes.
    pub error_output_paths: Vec<String>,

    /// Omit the `caller` key.
    pub disable_caller: bool,

    /// Never capture stack traces.
    pub disable_stacktrace: bool,

    /// Fields attached to every record.
    pub initial_fields: Map<String, Value>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            development: false,
            encoding: "json".to_string(),
            output_paths: vec!["stdout".to_string()],
            error_output_paths: vec!["stderr".to_string()],
            disable_caller: false,
            disable_stacktrace: false,
            initial_fields: Map::new(),
        }
    }
}

impl LoggerConfig {
    /// Development defaults: debug level, console encoding.
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            development: true,
            encoding: "console".to_string(),
            ..Self::default()
        }
    }

    /// Copy with each empty field replaced by its default.
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        let mut cfg = self.clone();
        if cfg.level.trim().is_empty() {
            cfg.level = defaults.level;
        }
        if cfg.encoding.trim().is_empty() {
            cfg.encoding = defaults.encoding;
        }
        if cfg.output_paths.is_empty() {
            cfg.output_paths = defaults.output_paths;
        }
        if cfg.error_output_paths.is_empty() {
            cfg.error_output_paths = defaults.error_output_paths;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero() -> LoggerConfig {
        LoggerConfig {
            level: String::new(),
            development: false,
            encoding: String::new(),
            output_paths: Vec::new(),
            error_output_paths: Vec::new(),
            disable_caller: false,
            disable_stacktrace: false,
            initial_fields: Map::new(),
        }
    }

    #[test]
    fn zero_value_normalizes_to_defaults() {
        assert_eq!(zero().normalized(), LoggerConfig::default());
    }

    #[test]
    fn normalize_keeps_set_fields() {
        let cfg = LoggerConfig {
            level: "warn".into(),
            output_paths: vec!["/var/log/app.log".into()],
            ..zero()
        }
        .normalized();

        assert_eq!(cfg.level, "warn");
        assert_eq!(cfg.encoding, "json");
        assert_eq!(cfg.output_paths, vec!["/var/log/app.log"]);
        assert_eq!(cfg.error_output_paths, vec!["stderr"]);
    }

    #[test]
    fn camel_case_keys() {
        let cfg: LoggerConfig = serde_json::from_str(
            r#"{"level":"debug","outputPaths":["stderr"],"errorOutputPaths":[],"disableCaller":true}"#,
        )
        .unwrap();
        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.output_paths, vec!["stderr"]);
        assert!(cfg.error_output_paths.is_empty());
        assert!(cfg.disable_caller);
        assert_eq!(cfg.encoding, "json");
    }
}
