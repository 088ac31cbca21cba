// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow-spec catalog seam. The manager only ever removes ad-hoc specs.

use fd_core::FlowSpec;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to remove flow spec {uri}: {reason}")]
pub struct CatalogError {
    pub uri: String,
    pub reason: String,
}

pub trait FlowCatalog: Send + Sync {
    fn remove_spec(&self, spec: &FlowSpec) -> Result<(), CatalogError>;
}
