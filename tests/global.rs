//! Routing plain `tracing` events through an installed logger.
//!
//! Kept in its own test binary: the global dispatcher can only be set once.

use service_kit::observability::{Logger, LoggerError};

mod common;

#[test]
fn install_global_routes_tracing_macros() {
    let (sink, out) = common::memory_sink("global");
    let (_, errs) = common::memory_sink("global-err");
    let logger = Logger::try_new(common::config_with("info", &out, &errs)).unwrap();

    logger.install_global().unwrap();
    tracing::info!(port = 8080, "Listening for connections");
    tracing::debug!("below threshold");

    let recs = common::records(&sink);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["level"], "info");
    assert_eq!(recs[0]["msg"], "Listening for connections");
    assert_eq!(recs[0]["port"], 8080);

    let again = logger.install_global().unwrap_err();
    assert!(matches!(again, LoggerError::GlobalAlreadySet));
}
