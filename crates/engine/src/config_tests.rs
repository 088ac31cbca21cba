// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_documented_values() {
    let config = DagManagerConfig::default();
    assert_eq!(config.num_threads, 3);
    assert_eq!(config.polling_interval(), Duration::from_secs(10));
    assert_eq!(config.dag_state_store, "fs");
    assert_eq!(config.retention(), Some(Duration::from_secs(7 * 24 * 60 * 60)));
    assert_eq!(config.retention_polling(), Duration::from_secs(3600));
    assert_eq!(config.job_start_sla(), Duration::from_secs(600));
    assert_eq!(config.flow_sla_secs, None);
    assert_eq!(
        config.default_failure_option,
        FailureOption::FinishAllPossible
    );
    assert_eq!(config.stop_flow_execution_limit, 10);
    assert_eq!(config.flow_status_tolerance(), Duration::from_secs(300));
    assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
}

#[test]
fn zero_retention_disables_the_sweep() {
    let config = DagManagerConfig {
        failed_dag_retention_secs: 0,
        ..DagManagerConfig::default()
    };
    assert_eq!(config.retention(), None);
}

#[test]
fn load_overlays_partial_toml_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dag-manager.toml");
    std::fs::write(
        &path,
        r#"
num_threads = 5
polling_interval_secs = 2
default_failure_option = "FINISH_RUNNING"
flow_sla_secs = 7
"#,
    )
    .unwrap();

    let config = DagManagerConfig::load(&path).unwrap();
    assert_eq!(config.num_threads, 5);
    assert_eq!(config.polling_interval(), Duration::from_secs(2));
    assert_eq!(config.default_failure_option, FailureOption::FinishRunning);
    assert_eq!(config.flow_sla_secs, Some(7));
    // Untouched keys keep their defaults.
    assert_eq!(config.stop_flow_execution_limit, 10);
}

#[test]
fn load_rejects_bad_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dag-manager.toml");
    std::fs::write(&path, "num_threads = \"three\"").unwrap();
    assert!(matches!(
        DagManagerConfig::load(&path),
        Err(ConfigError::Toml(_))
    ));
}
