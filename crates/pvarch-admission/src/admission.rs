// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Admission check against existing archive state.
//!
//! A PV is in at most one of two states before a new request is queued:
//! actively archived (owned by the [`ConfigStore`]) or waiting in the
//! [`WorkflowQueue`]. Either way the request is not queued again; any
//! standard field and alias it carries are merged into the existing entry.
//!
//! | State   | Field merge                     | Alias                      |
//! |---------|---------------------------------|----------------------------|
//! | Active  | persisted, modification bumped  | registered with the store  |
//! | Pending | queued entry only, not durable  | queued entry only          |

use crate::error::Result;
use crate::model::{ActiveRecord, PendingRecord};
use crate::names::NormalizedName;
use crate::store::{ConfigStore, WorkflowQueue};

/// Existing state for a normalized PV name.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The PV is being archived. Carries the record after any merge.
    AlreadyActive(ActiveRecord),
    /// A request is queued. Carries the queued record after any merge.
    AlreadyPending(PendingRecord),
    /// No record exists; a new request may be submitted.
    NotRegistered,
}

impl Admission {
    pub fn is_registered(&self) -> bool {
        !matches!(self, Admission::NotRegistered)
    }
}

/// Looks up and merges into existing archive state.
pub struct AdmissionChecker<'a> {
    config: &'a dyn ConfigStore,
    queue: &'a dyn WorkflowQueue,
}

impl<'a> AdmissionChecker<'a> {
    pub fn new(config: &'a dyn ConfigStore, queue: &'a dyn WorkflowQueue) -> Self {
        Self { config, queue }
    }

    /// Check `name` and merge its standard field and `alias` into any
    /// existing entry.
    pub fn check(&self, name: &NormalizedName, alias: Option<&str>) -> Result<Admission> {
        let pv_name = name.base_name.as_str();

        if let Some(record) = self.config.active_record(pv_name)? {
            tracing::debug!("Already archiving pv {}", pv_name);
            let record = self.merge_active(pv_name, record, name, alias)?;
            return Ok(Admission::AlreadyActive(record));
        }

        if let Some(record) = self.merge_pending(pv_name, name, alias)? {
            tracing::warn!("We have a pending request for pv {}", pv_name);
            return Ok(Admission::AlreadyPending(record));
        }

        Ok(Admission::NotRegistered)
    }

    fn merge_active(
        &self,
        pv_name: &str,
        mut record: ActiveRecord,
        name: &NormalizedName,
        alias: Option<&str>,
    ) -> Result<ActiveRecord> {
        if let Some(field) = name.standard_field() {
            if record.add_archive_field(field) {
                tracing::debug!(
                    "Adding field {} to pv {} that is already being archived",
                    field,
                    pv_name
                );
                self.config.update_active_record(pv_name, &record)?;
            } else {
                tracing::debug!("Field {} is already being archived for {}", field, pv_name);
            }
        }

        if let Some(alias) = alias {
            tracing::debug!("Registering alias {} for {}", alias, pv_name);
            self.config.add_alias(alias, pv_name)?;
            record.aliases.insert(alias.to_string());
        }

        Ok(record)
    }

    fn merge_pending(
        &self,
        pv_name: &str,
        name: &NormalizedName,
        alias: Option<&str>,
    ) -> Result<Option<PendingRecord>> {
        let field = name.standard_field();
        let mut merged = None;

        // In-place on the queued entry; nothing here is persisted.
        self.queue.update_pending(pv_name, &mut |record: &mut PendingRecord| {
            if let Some(field) = field {
                if record.add_archive_field(field) {
                    tracing::debug!(
                        "Adding field {} to pending request for {} (not persisted)",
                        field,
                        pv_name
                    );
                }
            }
            if let Some(alias) = alias {
                if record.add_alias(alias) {
                    tracing::debug!("Adding alias {} to pending request for {}", alias, pv_name);
                }
            }
            merged = Some(record.clone());
        })?;

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StandardFieldCatalog;
    use crate::memory::{MemoryConfigStore, MemoryWorkflowQueue};
    use crate::model::SamplingMethod;
    use crate::names::normalize;
    use std::collections::BTreeSet;

    fn catalog() -> StandardFieldCatalog {
        StandardFieldCatalog::new(["HIHI", "LOLO"])
    }

    fn pending() -> PendingRecord {
        PendingRecord {
            sampling_method: SamplingMethod::Monitor,
            sampling_period_secs: 1.0,
            controlling_pv: None,
            policy_name: None,
            user_override: false,
            requested_fields: BTreeSet::new(),
            aliases: Vec::new(),
        }
    }

    #[test]
    fn test_unknown_pv_is_not_registered() {
        let config = MemoryConfigStore::new();
        let queue = MemoryWorkflowQueue::new();
        let checker = AdmissionChecker::new(&config, &queue);

        let name = normalize("SRC", &catalog()).unwrap();
        assert_eq!(checker.check(&name, None).unwrap(), Admission::NotRegistered);
    }

    #[test]
    fn test_active_pv_gets_standard_field_persisted() {
        let config = MemoryConfigStore::new();
        let queue = MemoryWorkflowQueue::new();
        config.insert_active(ActiveRecord::new("SRC"));
        let checker = AdmissionChecker::new(&config, &queue);

        let name = normalize("SRC.HIHI", &catalog()).unwrap();
        let admission = checker.check(&name, None).unwrap();
        assert!(matches!(admission, Admission::AlreadyActive(ref r) if r.is_field_archived("HIHI")));

        let stored = config.active_record("SRC").unwrap().unwrap();
        assert!(stored.is_field_archived("HIHI"));

        // Second add is a no-op.
        checker.check(&name, None).unwrap();
        let again = config.active_record("SRC").unwrap().unwrap();
        assert_eq!(again.archived_fields.len(), 1);
        assert_eq!(again.modification_time, stored.modification_time);
    }

    #[test]
    fn test_active_pv_ignores_non_standard_field() {
        let config = MemoryConfigStore::new();
        let queue = MemoryWorkflowQueue::new();
        config.insert_active(ActiveRecord::new("SRC.DESC"));
        let checker = AdmissionChecker::new(&config, &queue);

        let name = normalize("SRC.DESC", &catalog()).unwrap();
        let admission = checker.check(&name, None).unwrap();
        assert!(matches!(admission, Admission::AlreadyActive(ref r) if r.archived_fields.is_empty()));
    }

    #[test]
    fn test_active_pv_registers_alias() {
        let config = MemoryConfigStore::new();
        let queue = MemoryWorkflowQueue::new();
        config.insert_active(ActiveRecord::new("SRC"));
        let checker = AdmissionChecker::new(&config, &queue);

        let name = normalize("SRC", &catalog()).unwrap();
        checker.check(&name, Some("A1")).unwrap();
        assert_eq!(config.resolve_alias("A1").as_deref(), Some("SRC"));
    }

    #[test]
    fn test_pending_pv_merges_in_queue() {
        let config = MemoryConfigStore::new();
        let queue = MemoryWorkflowQueue::new();
        queue.insert_if_absent("SRC", pending()).unwrap();
        let checker = AdmissionChecker::new(&config, &queue);

        let name = normalize("SRC.LOLO", &catalog()).unwrap();
        let admission = checker.check(&name, Some("A2")).unwrap();
        assert!(admission.is_registered());

        let queued = queue.get("SRC").unwrap();
        assert!(queued.is_field_requested("LOLO"));
        assert_eq!(queued.aliases, vec!["A2"]);

        checker.check(&name, Some("A2")).unwrap();
        let queued = queue.get("SRC").unwrap();
        assert_eq!(queued.requested_fields.len(), 1);
        assert_eq!(queued.aliases.len(), 1);

        // Pending merges never reach the config store.
        assert!(config.resolve_alias("A2").is_none());
    }

    #[test]
    fn test_active_wins_over_pending() {
        let config = MemoryConfigStore::new();
        let queue = MemoryWorkflowQueue::new();
        config.insert_active(ActiveRecord::new("SRC"));
        queue.insert_if_absent("SRC", pending()).unwrap();
        let checker = AdmissionChecker::new(&config, &queue);

        let name = normalize("SRC.HIHI", &catalog()).unwrap();
        let admission = checker.check(&name, None).unwrap();
        assert!(matches!(admission, Admission::AlreadyActive(_)));
        assert!(!queue.get("SRC").unwrap().is_field_requested("HIHI"));
    }
}
