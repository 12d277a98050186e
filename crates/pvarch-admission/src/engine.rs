// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Workflow engine triggers
//!
//! The engine runs outside the admission pipeline. These implementations hand
//! the PV name off and return immediately.

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::model::ActiveRecord;
use crate::store::{ConfigStore, WorkflowEngine, WorkflowQueue};

/// Forwards workflow starts to a channel consumed by an engine task.
#[derive(Clone)]
pub struct ChannelWorkflowEngine {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelWorkflowEngine {
    /// Create the engine trigger and the receiver the engine task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl WorkflowEngine for ChannelWorkflowEngine {
    fn start_workflow(&self, pv_name: &str) -> Result<()> {
        self.tx
            .send(pv_name.to_string())
            .map_err(|_| anyhow!("workflow engine is not running"))
    }
}

/// Engine stand-in that only logs the trigger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWorkflowEngine;

impl WorkflowEngine for LoggingWorkflowEngine {
    fn start_workflow(&self, pv_name: &str) -> Result<()> {
        tracing::info!("Starting archive workflow for pv {}", pv_name);
        Ok(())
    }
}

/// Move a queued request to the config store once collection has started.
///
/// The queued entry under `queue_key` is removed and an [`ActiveRecord`] for
/// `pv_name` is written with the request's fields and aliases. Returns
/// `false` if nothing was queued.
pub fn promote_pending(
    queue: &dyn WorkflowQueue,
    config: &dyn ConfigStore,
    queue_key: &str,
    pv_name: &str,
) -> Result<bool> {
    let Some(pending) = queue.take_pending(queue_key)? else {
        return Ok(false);
    };

    let mut record = ActiveRecord::new(pv_name);
    record.archived_fields = pending.requested_fields;
    config.update_active_record(pv_name, &record)?;
    for alias in &pending.aliases {
        config.add_alias(alias, pv_name)?;
    }

    tracing::info!("PV {} is now being archived", pv_name);
    Ok(true)
}
