// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite configuration store
//!
//! Durable home for active records, aliases, installation properties and the
//! standard field catalog.

use crate::config::AdmissionConfig;
use crate::model::ActiveRecord;
use crate::store::ConfigStore;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// SQLite configuration store
///
/// Thread-safe via internal Mutex (SQLite Connection is not Sync).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE active_records (
///     pv_name TEXT PRIMARY KEY,
///     archived_fields TEXT NOT NULL,     -- JSON array
///     aliases TEXT NOT NULL,             -- JSON array
///     modification_time_ns INTEGER NOT NULL
/// );
/// CREATE TABLE aliases (alias TEXT PRIMARY KEY, pv_name TEXT NOT NULL);
/// CREATE TABLE installation_properties (key TEXT PRIMARY KEY, value TEXT NOT NULL);
/// CREATE TABLE standard_fields (field TEXT PRIMARY KEY);
/// ```
pub struct SqliteConfigStore {
    conn: Mutex<Connection>,
}

impl SqliteConfigStore {
    /// Create a new SQLite store with a file-based database
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory SQLite database")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS active_records (
                pv_name TEXT PRIMARY KEY,
                archived_fields TEXT NOT NULL,
                aliases TEXT NOT NULL,
                modification_time_ns INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS aliases (
                alias TEXT PRIMARY KEY,
                pv_name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_alias_pv ON aliases(pv_name);
            CREATE TABLE IF NOT EXISTS installation_properties (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS standard_fields (
                field TEXT PRIMARY KEY
            );",
        )?;

        Ok(())
    }

    /// Write the config's standard fields and installation properties.
    ///
    /// Existing properties with the same key are overwritten; the standard
    /// field catalog is replaced.
    pub fn seed_from_config(&self, config: &AdmissionConfig) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM standard_fields", [])?;
        for field in &config.standard_fields {
            tx.execute(
                "INSERT OR IGNORE INTO standard_fields (field) VALUES (?1)",
                params![field],
            )?;
        }

        for (key, value) in &config.installation_properties {
            tx.execute(
                "INSERT INTO installation_properties (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Set a single installation property.
    pub fn set_property(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO installation_properties (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Mark a PV as actively archived (engine confirmed start).
    pub fn insert_active(&self, record: &ActiveRecord) -> Result<()> {
        self.update_active_record(&record.pv_name, record)
    }

    /// Resolve an alias to the PV it was registered for.
    pub fn resolve_alias(&self, alias: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let pv = conn
            .query_row(
                "SELECT pv_name FROM aliases WHERE alias = ?1",
                [alias],
                |row| row.get(0),
            )
            .optional()?;
        Ok(pv)
    }

    /// Number of actively archived PVs.
    pub fn active_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM active_records", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }

    fn to_nanos(time: SystemTime) -> i64 {
        let nanos = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos();
        nanos.min(i64::MAX as u128) as i64
    }

    fn from_nanos(nanos: i64) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(nanos.max(0) as u64)
    }
}

impl ConfigStore for SqliteConfigStore {
    fn active_record(&self, pv_name: &str) -> Result<Option<ActiveRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT archived_fields, aliases, modification_time_ns
                 FROM active_records WHERE pv_name = ?1",
                [pv_name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((fields_json, aliases_json, modified_ns)) = row else {
            return Ok(None);
        };

        let archived_fields: BTreeSet<String> = serde_json::from_str(&fields_json)
            .with_context(|| format!("Corrupt archived_fields for {}", pv_name))?;
        let aliases: BTreeSet<String> = serde_json::from_str(&aliases_json)
            .with_context(|| format!("Corrupt aliases for {}", pv_name))?;

        Ok(Some(ActiveRecord {
            pv_name: pv_name.to_string(),
            archived_fields,
            aliases,
            modification_time: Self::from_nanos(modified_ns),
        }))
    }

    fn update_active_record(&self, pv_name: &str, record: &ActiveRecord) -> Result<()> {
        let fields_json = serde_json::to_string(&record.archived_fields)?;
        let aliases_json = serde_json::to_string(&record.aliases)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO active_records (pv_name, archived_fields, aliases, modification_time_ns)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(pv_name) DO UPDATE SET
                 archived_fields = excluded.archived_fields,
                 aliases = excluded.aliases,
                 modification_time_ns = excluded.modification_time_ns",
            params![
                pv_name,
                fields_json,
                aliases_json,
                Self::to_nanos(record.modification_time),
            ],
        )?;

        Ok(())
    }

    fn add_alias(&self, alias: &str, pv_name: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO aliases (alias, pv_name) VALUES (?1, ?2)
             ON CONFLICT(alias) DO UPDATE SET pv_name = excluded.pv_name",
            params![alias, pv_name],
        )?;

        let aliases_json: Option<String> = tx
            .query_row(
                "SELECT aliases FROM active_records WHERE pv_name = ?1",
                [pv_name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(json) = aliases_json {
            let mut aliases: BTreeSet<String> = serde_json::from_str(&json)
                .with_context(|| format!("Corrupt aliases for {}", pv_name))?;
            if aliases.insert(alias.to_string()) {
                tx.execute(
                    "UPDATE active_records SET aliases = ?1 WHERE pv_name = ?2",
                    params![serde_json::to_string(&aliases)?, pv_name],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn installation_property(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM installation_properties WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional();

        match value {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to read installation property {}: {}", key, e);
                None
            }
        }
    }

    fn standard_fields(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT field FROM standard_fields ORDER BY field")?;
        let fields = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(fields)
    }
}
