//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicU32, Ordering};

use service_kit::observability::{register_sink, MemorySink};
use service_kit::LoggerConfig;

static SCHEME_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Register a fresh in-memory sink and return it with its sink identifier.
pub fn memory_sink(prefix: &str) -> (MemorySink, String) {
    let n = SCHEME_COUNTER.fetch_add(1, Ordering::Relaxed);
    let scheme = format!("{}-{}", prefix, n);
    let sink = MemorySink::new();
    register_sink(&scheme, sink.factory()).unwrap();
    (sink, format!("{}://", scheme))
}

/// Config writing records to `output` and internal errors to `errors`.
#[allow(dead_code)]
pub fn config_with(level: &str, output: &str, errors: &str) -> LoggerConfig {
    LoggerConfig {
        level: level.to_string(),
        output_paths: vec![output.to_string()],
        error_output_paths: vec![errors.to_string()],
        disable_stacktrace: true,
        ..LoggerConfig::default()
    }
}

/// Parse every line of a sink as JSON.
#[allow(dead_code)]
pub fn records(sink: &MemorySink) -> Vec<serde_json::Value> {
    sink.lines()
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
