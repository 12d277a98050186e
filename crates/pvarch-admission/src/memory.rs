// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory collaborators
//!
//! `DashMap`-backed configuration store and workflow queue. The queue is
//! what the gateway uses; the store backs tests and embedders that do not
//! need durability.

use std::collections::HashMap;

use anyhow::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::config::AdmissionConfig;
use crate::model::{ActiveRecord, PendingRecord};
use crate::store::{ConfigStore, WorkflowQueue};

// ============================================================================
// MemoryConfigStore
// ============================================================================

/// Configuration store held entirely in memory.
pub struct MemoryConfigStore {
    records: DashMap<String, ActiveRecord>,
    /// alias -> PV name
    aliases: DashMap<String, String>,
    properties: RwLock<HashMap<String, String>>,
    standard_fields: RwLock<Vec<String>>,
}

impl MemoryConfigStore {
    /// Create an empty store with no standard fields.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            aliases: DashMap::new(),
            properties: RwLock::new(HashMap::new()),
            standard_fields: RwLock::new(Vec::new()),
        }
    }

    /// Create a store seeded from an admission config.
    pub fn from_config(config: &AdmissionConfig) -> Self {
        let store = Self::new();
        *store.standard_fields.write() = config.standard_fields.clone();
        *store.properties.write() = config.installation_properties.clone();
        store
    }

    /// Create an empty store with the given standard fields.
    pub fn with_standard_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        *store.standard_fields.write() = fields.into_iter().map(Into::into).collect();
        store
    }

    /// Set an installation property.
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(key.into(), value.into());
    }

    /// Mark a PV as actively archived (engine confirmed start).
    pub fn insert_active(&self, record: ActiveRecord) {
        self.records.insert(record.pv_name.clone(), record);
    }

    /// Resolve an alias to the PV it was registered for.
    pub fn resolve_alias(&self, alias: &str) -> Option<String> {
        self.aliases.get(alias).map(|pv| pv.value().clone())
    }

    /// Number of actively archived PVs.
    pub fn active_count(&self) -> usize {
        self.records.len()
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn active_record(&self, pv_name: &str) -> Result<Option<ActiveRecord>> {
        Ok(self.records.get(pv_name).map(|r| r.value().clone()))
    }

    fn update_active_record(&self, pv_name: &str, record: &ActiveRecord) -> Result<()> {
        self.records.insert(pv_name.to_string(), record.clone());
        Ok(())
    }

    fn add_alias(&self, alias: &str, pv_name: &str) -> Result<()> {
        self.aliases.insert(alias.to_string(), pv_name.to_string());
        if let Some(mut record) = self.records.get_mut(pv_name) {
            record.aliases.insert(alias.to_string());
        }
        Ok(())
    }

    fn installation_property(&self, key: &str) -> Option<String> {
        self.properties.read().get(key).cloned()
    }

    fn standard_fields(&self) -> Result<Vec<String>> {
        Ok(self.standard_fields.read().clone())
    }
}

// ============================================================================
// MemoryWorkflowQueue
// ============================================================================

/// Workflow queue keyed by PV name.
///
/// `insert_if_absent` goes through the map's entry API, so the check and the
/// insert happen under the same shard lock.
#[derive(Default)]
pub struct MemoryWorkflowQueue {
    pending: DashMap<String, PendingRecord>,
}

impl MemoryWorkflowQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the queued request for `pv_name`.
    pub fn get(&self, pv_name: &str) -> Option<PendingRecord> {
        self.pending.get(pv_name).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl WorkflowQueue for MemoryWorkflowQueue {
    fn has_pending(&self, pv_name: &str) -> Result<bool> {
        Ok(self.pending.contains_key(pv_name))
    }

    fn pending_record(&self, pv_name: &str) -> Result<Option<PendingRecord>> {
        Ok(self.get(pv_name))
    }

    fn update_pending(
        &self,
        pv_name: &str,
        update: &mut dyn FnMut(&mut PendingRecord),
    ) -> Result<bool> {
        match self.pending.get_mut(pv_name) {
            Some(mut record) => {
                update(record.value_mut());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_if_absent(&self, pv_name: &str, record: PendingRecord) -> Result<bool> {
        match self.pending.entry(pv_name.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    fn take_pending(&self, pv_name: &str) -> Result<Option<PendingRecord>> {
        Ok(self.pending.remove(pv_name).map(|(_, record)| record))
    }

    fn pending_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }
}
