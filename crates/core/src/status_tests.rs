// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    pending = { ExecutionStatus::Pending, false },
    pending_retry = { ExecutionStatus::PendingRetry, false },
    pending_resume = { ExecutionStatus::PendingResume, false },
    orchestrated = { ExecutionStatus::Orchestrated, false },
    running = { ExecutionStatus::Running, false },
    complete = { ExecutionStatus::Complete, true },
    failed = { ExecutionStatus::Failed, true },
    cancelled = { ExecutionStatus::Cancelled, true },
)]
fn job_terminal_set_is_closed(status: ExecutionStatus, terminal: bool) {
    assert_eq!(status.is_job_terminal(), terminal);
    assert_eq!(status.is_flow_terminal(), terminal);
}

#[test]
fn event_name_mapping_round_trips() {
    for status in [
        ExecutionStatus::Pending,
        ExecutionStatus::PendingRetry,
        ExecutionStatus::PendingResume,
        ExecutionStatus::Orchestrated,
        ExecutionStatus::Running,
        ExecutionStatus::Complete,
        ExecutionStatus::Failed,
        ExecutionStatus::Cancelled,
    ] {
        assert_eq!(
            ExecutionStatus::from_event_name(status.as_event_name()),
            Some(status)
        );
    }
}

#[test]
fn unknown_event_name_maps_to_none() {
    assert_eq!(ExecutionStatus::from_event_name("LAUNCHED"), None);
    assert_eq!(ExecutionStatus::from_event_name(""), None);
}

#[test]
fn pending_family() {
    assert!(ExecutionStatus::Pending.is_pending());
    assert!(ExecutionStatus::PendingRetry.is_pending());
    assert!(ExecutionStatus::PendingResume.is_pending());
    assert!(!ExecutionStatus::Running.is_pending());
}

#[test]
fn failure_option_default_is_finish_all_possible() {
    assert_eq!(FailureOption::default(), FailureOption::FinishAllPossible);
}

#[parameterized(
    finish_running = { "FINISH_RUNNING", FailureOption::FinishRunning },
    cancel = { "CANCEL", FailureOption::Cancel },
    finish_all = { "FINISH_ALL_POSSIBLE", FailureOption::FinishAllPossible },
)]
fn failure_option_names_round_trip(name: &str, option: FailureOption) {
    assert_eq!(FailureOption::from_name(name), Some(option));
    assert_eq!(option.as_name(), name);
}
