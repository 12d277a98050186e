// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Standard field catalog.
//!
//! Snapshot of the sub-fields that are archived automatically alongside their
//! PV. Loaded once per batch from the configuration store.

use std::collections::HashSet;

use crate::store::ConfigStore;

/// Set of standard field names (e.g. `HIHI`, `LOLO`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardFieldCatalog {
    fields: HashSet<String>,
}

impl StandardFieldCatalog {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Load the catalog from the configuration store.
    ///
    /// A failing store yields an empty catalog: no field is then treated as
    /// standard, and admission carries on.
    pub fn load(store: &dyn ConfigStore) -> Self {
        match store.standard_fields() {
            Ok(fields) => Self::new(fields),
            Err(e) => {
                tracing::error!("Exception fetching standard fields: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConfigStore;
    use crate::model::ActiveRecord;
    use anyhow::{anyhow, Result};

    struct BrokenStore;

    impl ConfigStore for BrokenStore {
        fn active_record(&self, _pv_name: &str) -> Result<Option<ActiveRecord>> {
            Ok(None)
        }
        fn update_active_record(&self, _pv_name: &str, _record: &ActiveRecord) -> Result<()> {
            Ok(())
        }
        fn add_alias(&self, _alias: &str, _pv_name: &str) -> Result<()> {
            Ok(())
        }
        fn installation_property(&self, _key: &str) -> Option<String> {
            None
        }
        fn standard_fields(&self) -> Result<Vec<String>> {
            Err(anyhow!("policy file unreadable"))
        }
    }

    #[test]
    fn test_load_from_store() {
        let store = MemoryConfigStore::with_standard_fields(["HIHI", "LOLO"]);
        let catalog = StandardFieldCatalog::load(&store);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("HIHI"));
        assert!(!catalog.contains("DESC"));
    }

    #[test]
    fn test_failing_store_degrades_to_empty() {
        let catalog = StandardFieldCatalog::load(&BrokenStore);
        assert!(catalog.is_empty());
        assert!(!catalog.contains("HIHI"));
    }
}
