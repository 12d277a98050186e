// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Archive request data model.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::AdmissionError;

// ---------------------------------------------------------------------------
// SamplingMethod
// ---------------------------------------------------------------------------

/// How the engine samples a PV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SamplingMethod {
    /// Periodic sampling at the configured period.
    Scan,
    /// Record every value change, rate-limited by the period.
    #[default]
    Monitor,
}

impl SamplingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SamplingMethod::Scan => "SCAN",
            SamplingMethod::Monitor => "MONITOR",
        }
    }

    /// Case-insensitive parse, used for the structured JSON form.
    pub fn parse_lenient(s: &str) -> Result<Self, AdmissionError> {
        s.to_ascii_uppercase().parse()
    }
}

impl FromStr for SamplingMethod {
    type Err = AdmissionError;

    /// Exact match on the upper-case names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCAN" => Ok(SamplingMethod::Scan),
            "MONITOR" => Ok(SamplingMethod::Monitor),
            other => Err(AdmissionError::UnknownSamplingMethod(other.to_string())),
        }
    }
}

impl fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActiveRecord
// ---------------------------------------------------------------------------

/// Persisted state of a PV that is already being archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveRecord {
    /// Canonical PV name.
    pub pv_name: String,
    /// Standard fields archived alongside the PV.
    pub archived_fields: BTreeSet<String>,
    /// Aliases registered for this PV.
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    /// Last time the record was changed.
    pub modification_time: SystemTime,
}

impl ActiveRecord {
    pub fn new(pv_name: impl Into<String>) -> Self {
        Self {
            pv_name: pv_name.into(),
            archived_fields: BTreeSet::new(),
            aliases: BTreeSet::new(),
            modification_time: SystemTime::now(),
        }
    }

    pub fn is_field_archived(&self, field: &str) -> bool {
        self.archived_fields.contains(field)
    }

    /// Adds a field and bumps the modification time.
    ///
    /// Returns `false` (and leaves the record untouched) if the field is
    /// already archived.
    pub fn add_archive_field(&mut self, field: &str) -> bool {
        if self.archived_fields.contains(field) {
            return false;
        }
        self.archived_fields.insert(field.to_string());
        self.modification_time = SystemTime::now();
        true
    }
}

// ---------------------------------------------------------------------------
// PendingRecord
// ---------------------------------------------------------------------------

/// An admitted archive request waiting for the engine to start it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub sampling_method: SamplingMethod,
    pub sampling_period_secs: f32,
    /// PV gating conditional archiving.
    pub controlling_pv: Option<String>,
    /// Named policy that replaces normal policy execution.
    pub policy_name: Option<String>,
    /// Whether the caller overrode the sampling parameters.
    pub user_override: bool,
    pub requested_fields: BTreeSet<String>,
    pub aliases: Vec<String>,
}

impl PendingRecord {
    pub fn is_field_requested(&self, field: &str) -> bool {
        self.requested_fields.contains(field)
    }

    /// Returns `true` if the field was not yet part of the request.
    pub fn add_archive_field(&mut self, field: &str) -> bool {
        self.requested_fields.insert(field.to_string())
    }

    /// Returns `true` if the alias was not yet part of the request.
    pub fn add_alias(&mut self, alias: &str) -> bool {
        if self.aliases.iter().any(|a| a == alias) {
            return false;
        }
        self.aliases.push(alias.to_string());
        true
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Per-PV status reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveStatus {
    #[serde(rename = "Already submitted")]
    AlreadySubmitted,
    #[serde(rename = "Archive request submitted")]
    Submitted,
    #[serde(rename = "Exception occurred")]
    ExceptionOccurred,
}

impl ArchiveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveStatus::AlreadySubmitted => "Already submitted",
            ArchiveStatus::Submitted => "Archive request submitted",
            ArchiveStatus::ExceptionOccurred => "Exception occurred",
        }
    }
}

impl fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveOutcome {
    #[serde(rename = "pvName")]
    pub pv_name: String,
    pub status: ArchiveStatus,
}

impl ArchiveOutcome {
    pub fn new(pv_name: impl Into<String>, status: ArchiveStatus) -> Self {
        Self {
            pv_name: pv_name.into(),
            status,
        }
    }
}
