// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The executor seam: submits and cancels jobs on a remote executor.

use async_trait::async_trait;
use fd_core::{JobSpec, SubmissionAck, SubmissionFuture};
use thiserror::Error;

/// Properties attached to a cancel request.
#[derive(Debug, Clone, Default)]
pub struct CancelProps {
    /// Serialized submission response of the job being cancelled, when the
    /// owning shard still holds the handle. Absent after a leader change;
    /// cancellation is then best-effort by spec URI.
    pub serialized_response: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("executor rejected cancel of {uri}: {reason}")]
    Cancel { uri: String, reason: String },
}

/// One producer per executor; resolved from the topology map by the
/// executor URI recorded on each job plan.
#[async_trait]
pub trait SpecProducer: Send + Sync {
    /// Begin dispatching a job. The returned future completes when the
    /// executor *accepts the submission*, not when the job finishes.
    fn add_spec(&self, spec: &JobSpec) -> SubmissionFuture;

    async fn cancel_job(&self, uri: &str, props: CancelProps) -> Result<(), ProducerError>;

    /// Serialized form of an accepted submission, carried in cancel props.
    fn serialize_ack(&self, ack: &SubmissionAck) -> Option<String> {
        ack.external_id.clone()
    }

    /// Human-facing link to the remote execution, for timing events.
    fn execution_link(&self, ack: &SubmissionAck, spec_uri: &str) -> Option<String> {
        let _ = spec_uri;
        ack.execution_link.clone()
    }
}
