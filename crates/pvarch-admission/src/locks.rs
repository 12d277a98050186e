// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-PV mutual exclusion.
//!
//! Admission is a check-then-act sequence (look up active record, look up
//! pending request, enqueue). [`KeyedLocks`] serializes that sequence per PV
//! name while requests for different PVs proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Map of lazily created per-key mutexes.
///
/// Entries are dropped again once no caller holds or waits on them.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let lock = Arc::clone(self.locks.entry(key.to_string()).or_default().value());

        let result = {
            let _guard = lock.lock();
            f()
        };

        drop(lock);
        // Only the map's own reference left: nobody else is using this key.
        self.locks.remove_if(key, |_, l| Arc::strong_count(l) == 1);

        result
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
