// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn display_prints_group_name_exec() {
    let id = DagId::new("group0", "flow0", 100);
    assert_eq!(id.to_string(), "group0_flow0_100");
}

#[test]
fn parse_round_trips_display() {
    let id = DagId::new("group0", "flow0", 1700000000123);
    assert_eq!(DagId::parse(&id.to_string()), Ok(id));
}

#[test]
fn parse_allows_underscores_in_flow_name() {
    let id = DagId::parse("g_daily_ingest_42").unwrap();
    assert_eq!(id.flow_group, "g");
    assert_eq!(id.flow_name, "daily_ingest");
    assert_eq!(id.flow_execution_id, 42);
}

#[parameterized(
    empty = { "" },
    no_separators = { "group0" },
    one_separator = { "group0_100" },
    trailing_separator = { "group0_flow0_" },
    non_numeric_exec = { "group0_flow0_abc" },
)]
fn parse_rejects_malformed(input: &str) {
    assert!(DagId::parse(input).is_err());
}

#[test]
fn flow_strips_execution_id() {
    let id = DagId::new("group0", "flow0", 100);
    assert_eq!(id.flow(), FlowId::new("group0", "flow0"));
    assert_eq!(id.flow().execution(100), id);
}
