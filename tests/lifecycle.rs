//! Lifecycle setup and teardown against a real data directory.
//!
//! The tracing subscriber is process-global, so this file holds a single
//! test that performs one setup.

use std::fs;
use std::time::Duration;

use intchain_node::bootstrap::lifecycle::{Lifecycle, LifecycleOptions};
use intchain_node::error::AppError;
use tempfile::TempDir;
use tracing::info;

#[tokio::test]
async fn setup_teardown_is_symmetric_and_idempotent() {
    let tmp = TempDir::new().unwrap();
    let opts = LifecycleOptions {
        data_dir: tmp.path().to_path_buf(),
        log_dir: "log".into(),
        verbosity: 3,
        debug: true,
        vmodule: "intchain_node::genesis=4".into(),
        backtrace_at: String::new(),
        metrics_interval: Duration::from_millis(50),
    };

    let mut lifecycle = Lifecycle::setup(&opts).unwrap();
    let state = lifecycle.state().expect("state after setup");
    let trace = state.debug_trace().expect("debug capture on").to_path_buf();
    let log_file = state.logger.log_file.clone();
    assert!(state.metrics().unwrap().is_running());
    assert!(opts.common_dir().is_dir());
    assert!(opts.log_root().join("debug").is_dir());

    info!(chain = "intchain", "marker event");
    tokio::time::sleep(Duration::from_millis(200)).await;

    lifecycle.teardown().unwrap();
    lifecycle.teardown().unwrap();
    assert!(lifecycle.is_torn_down());

    // Running on a torn-down lifecycle still returns the command's own result.
    let err = lifecycle
        .run(async { Err::<(), _>(AppError::NotFound("child_9".into())) })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let captured = fs::read_to_string(&trace).unwrap();
    assert!(captured.contains("marker event"));
    assert!(captured.lines().all(|l| serde_json::from_str::<serde_json::Value>(l).is_ok()));

    let summary = opts
        .log_root()
        .join("debug")
        .join(format!("session-{}.json", std::process::id()));
    assert!(summary.exists());

    let log = fs::read_to_string(log_file).unwrap();
    assert!(log.contains("marker event"));
    assert_eq!(log.matches("lifecycle teardown complete").count(), 1);

    let snapshot = opts.common_dir().join("metrics.prom");
    let metrics = fs::read_to_string(snapshot).unwrap();
    assert!(metrics.contains("intchain_metrics_samples_total"));
}
