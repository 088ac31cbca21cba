// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counters and gauges for the manager, snapshotable for status queries.

use fd_core::FlowEvent;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Shared, lock-free metrics. One instance per manager, sized to the shard
/// count at construction.
pub struct DagManagerMetrics {
    jobs_sent: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_start_sla_exceeded: AtomicU64,
    jobs_run_sla_exceeded: AtomicU64,
    flows_succeeded: AtomicU64,
    flows_failed: AtomicU64,
    flows_cancelled: AtomicU64,
    flows_deadline_exceeded: AtomicU64,
    running_jobs: AtomicI64,
    orchestration_delay_ms: AtomicU64,
    shard_heartbeat_ms: Vec<AtomicU64>,
}

impl DagManagerMetrics {
    pub fn new(num_shards: usize) -> Self {
        Self {
            jobs_sent: AtomicU64::new(0),
            jobs_succeeded: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            jobs_start_sla_exceeded: AtomicU64::new(0),
            jobs_run_sla_exceeded: AtomicU64::new(0),
            flows_succeeded: AtomicU64::new(0),
            flows_failed: AtomicU64::new(0),
            flows_cancelled: AtomicU64::new(0),
            flows_deadline_exceeded: AtomicU64::new(0),
            running_jobs: AtomicI64::new(0),
            orchestration_delay_ms: AtomicU64::new(0),
            shard_heartbeat_ms: (0..num_shards).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn incr_jobs_sent(&self) {
        self.jobs_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_jobs_succeeded(&self) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_jobs_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_start_sla_exceeded(&self) {
        self.jobs_start_sla_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_run_sla_exceeded(&self) {
        self.jobs_run_sla_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_running_jobs(&self) {
        self.running_jobs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decr_running_jobs(&self) {
        self.running_jobs.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn set_orchestration_delay_ms(&self, delay_ms: u64) {
        self.orchestration_delay_ms.store(delay_ms, Ordering::Relaxed);
    }

    pub fn heartbeat(&self, shard: usize, now_ms: u64) {
        if let Some(beat) = self.shard_heartbeat_ms.get(shard) {
            beat.store(now_ms, Ordering::Relaxed);
        }
    }

    /// Count one confirmed terminal flow.
    pub fn record_flow_terminal(&self, event: FlowEvent) {
        let counter = match event {
            FlowEvent::Succeeded => &self.flows_succeeded,
            FlowEvent::Failed => &self.flows_failed,
            FlowEvent::Cancelled => &self.flows_cancelled,
            FlowEvent::StartDeadlineExceeded | FlowEvent::RunDeadlineExceeded => {
                &self.flows_deadline_exceeded
            }
            // Non-terminal names never reach cleanup confirmation.
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_sent: self.jobs_sent.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_start_sla_exceeded: self.jobs_start_sla_exceeded.load(Ordering::Relaxed),
            jobs_run_sla_exceeded: self.jobs_run_sla_exceeded.load(Ordering::Relaxed),
            flows_succeeded: self.flows_succeeded.load(Ordering::Relaxed),
            flows_failed: self.flows_failed.load(Ordering::Relaxed),
            flows_cancelled: self.flows_cancelled.load(Ordering::Relaxed),
            flows_deadline_exceeded: self.flows_deadline_exceeded.load(Ordering::Relaxed),
            running_jobs: self.running_jobs.load(Ordering::Relaxed),
            orchestration_delay_ms: self.orchestration_delay_ms.load(Ordering::Relaxed),
            shard_heartbeat_ms: self
                .shard_heartbeat_ms
                .iter()
                .map(|b| b.load(Ordering::Relaxed))
                .collect(),
        }
    }
}

/// Point-in-time view shared with status surfaces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_sent: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_start_sla_exceeded: u64,
    pub jobs_run_sla_exceeded: u64,
    pub flows_succeeded: u64,
    pub flows_failed: u64,
    pub flows_cancelled: u64,
    pub flows_deadline_exceeded: u64,
    pub running_jobs: i64,
    pub orchestration_delay_ms: u64,
    pub shard_heartbeat_ms: Vec<u64>,
}
