//! End-to-end tests for normalization feeding the logging pipeline

use plinth::log::{build_with_writer, Capture};
use plinth::prelude::*;
use serde_json::json;

#[test]
fn test_normalized_errors_reach_the_log_sink() {
    let capture = Capture::new();
    let config = LogConfig::default().with_format(LogFormat::Json);
    let dispatch = build_with_writer(&config, capture.clone()).unwrap();

    tracing::dispatcher::with_default(&dispatch, || {
        let error = BaseError::from_caught(json!({
            "message": "payment declined",
            "orderId": "ord-9912",
        }))
        .unwrap();
        error.report();
    });

    assert!(capture.contains("payment declined"));
    assert!(capture.contains("ord-9912"));
    assert!(capture.contains("plinth_error"));
    // An unassigned cause reaches the sink as the fixed sentinel.
    assert!(capture.contains(plinth::error::UNKNOWN_CAUSE));
}

#[test]
fn test_reporting_respects_level_filters() {
    let capture = Capture::new();
    let config = LogConfig::default()
        .with_filter("plinth_error=off")
        .with_format(LogFormat::Compact);
    let dispatch = build_with_writer(&config, capture.clone()).unwrap();

    tracing::dispatcher::with_default(&dispatch, || {
        BaseError::new("suppressed").report();
    });

    assert!(capture.contents().is_empty());
}

#[test]
fn test_prelude_macros_are_reachable() {
    fn check(flag: bool) -> Result<(), BaseError> {
        ensure!(flag, "flag must be set");
        Ok(())
    }

    assert!(check(true).is_ok());
    let error = check(false).unwrap_err();
    assert_eq!(error.message(), "flag must be set");
}
