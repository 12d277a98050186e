// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collaborator abstractions
//!
//! The admission pipeline never owns archive state. It reads and mutates it
//! through three injected collaborators:
//!
//! - [`ConfigStore`] -- owns persisted [`ActiveRecord`]s, aliases and
//!   installation properties.
//! - [`WorkflowQueue`] -- owns [`PendingRecord`]s until the engine starts them.
//! - [`WorkflowEngine`] -- starts collection for an admitted PV.
//!
//! # Implementations
//!
//! - `MemoryConfigStore` / `MemoryWorkflowQueue` -- in-process; the gateway
//!   queues requests in a `MemoryWorkflowQueue`
//! - `SqliteConfigStore` -- durable configuration store
//! - `ChannelWorkflowEngine` / `LoggingWorkflowEngine`

use anyhow::Result;

use crate::model::{ActiveRecord, PendingRecord};

/// Configuration store trait
///
/// Source of truth for PVs that are already being archived.
pub trait ConfigStore: Send + Sync {
    /// Fetch the active record for a PV, if the PV is being archived.
    fn active_record(&self, pv_name: &str) -> Result<Option<ActiveRecord>>;

    /// Persist an updated active record.
    fn update_active_record(&self, pv_name: &str, record: &ActiveRecord) -> Result<()>;

    /// Register `alias` as an additional lookup name for `pv_name`.
    fn add_alias(&self, alias: &str, pv_name: &str) -> Result<()>;

    /// Read an installation property.
    fn installation_property(&self, key: &str) -> Option<String>;

    /// Sub-fields archived as part of a PV's stream.
    fn standard_fields(&self) -> Result<Vec<String>>;
}

/// Workflow queue trait
///
/// Holds admitted requests until the engine confirms they have started.
/// Mutations made through [`WorkflowQueue::update_pending`] touch the queued
/// entry only; they are not written to any durable copy of the request.
pub trait WorkflowQueue: Send + Sync {
    /// True if a request for `pv_name` is waiting in the queue.
    fn has_pending(&self, pv_name: &str) -> Result<bool>;

    /// Snapshot of the queued request for `pv_name`.
    fn pending_record(&self, pv_name: &str) -> Result<Option<PendingRecord>>;

    /// Apply `update` to the queued request for `pv_name`.
    ///
    /// Returns `false` if no request is queued under that name.
    fn update_pending(
        &self,
        pv_name: &str,
        update: &mut dyn FnMut(&mut PendingRecord),
    ) -> Result<bool>;

    /// Atomically enqueue `record` under `pv_name` unless a request is
    /// already queued under that name.
    ///
    /// Returns `true` if the record was inserted.
    fn insert_if_absent(&self, pv_name: &str, record: PendingRecord) -> Result<bool>;

    /// Remove and return the queued request (engine confirmed start).
    fn take_pending(&self, pv_name: &str) -> Result<Option<PendingRecord>>;

    /// Names of all queued requests (sorted for determinism).
    fn pending_names(&self) -> Result<Vec<String>>;
}

/// Workflow engine trait
///
/// `start_workflow` is a trigger: it must return once the request has been
/// accepted, without waiting for collection to begin.
pub trait WorkflowEngine: Send + Sync {
    fn start_workflow(&self, pv_name: &str) -> Result<()>;
}
