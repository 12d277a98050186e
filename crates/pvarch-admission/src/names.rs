// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PV name normalization.
//!
//! A raw PV name may carry a protocol prefix and a field suffix:
//!
//! ```text
//! pva://SRC:TEMP.HIHI
//! \____/\______/\___/
//! prefix  record  field
//! ```
//!
//! Normalization folds `.VAL` into the bare name and strips standard fields
//! (so `SRC.HIHI` is admitted as `SRC` with `HIHI` bundled in). The prefix is
//! kept: lookups use the prefixed name and only the queue key drops it, see
//! [`queue_key`].

use std::sync::OnceLock;

use regex::Regex;

use crate::catalog::StandardFieldCatalog;
use crate::error::{AdmissionError, Result};

/// Prefix marking a PV served over the v4 (pvAccess) protocol.
pub const PROTOCOL_V4_PREFIX: &str = "pva://";

/// The primary value field; `SRC.VAL` and `SRC` are the same PV.
pub const VALUE_FIELD: &str = "VAL";

/// Result of normalizing a raw PV name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    /// Name used for all lookups and reported back to the caller.
    pub base_name: String,
    /// Field from the raw name; `None` for bare names and `.VAL`.
    pub field_name: Option<String>,
    /// `field_name` is in the standard field catalog and was stripped from
    /// `base_name`.
    pub is_standard_field: bool,
}

impl NormalizedName {
    /// The field to bundle into the request, if it is a standard one.
    pub fn standard_field(&self) -> Option<&str> {
        if self.is_standard_field {
            self.field_name.as_deref()
        } else {
            None
        }
    }

    pub fn is_v4(&self) -> bool {
        self.base_name.starts_with(PROTOCOL_V4_PREFIX)
    }
}

/// Field part of a PV name (text after the first `.`), if any.
pub fn field_name(pv_name: &str) -> Option<&str> {
    match pv_name.split_once('.') {
        Some((_, field)) if !field.is_empty() => Some(field),
        _ => None,
    }
}

/// PV name with any field suffix removed.
pub fn strip_field_name(pv_name: &str) -> &str {
    match pv_name.split_once('.') {
        Some((record, _)) => record,
        None => pv_name,
    }
}

fn pv_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_\-+:\[\]<>;.,/\\#{}^]+$")
            .expect("PV name pattern is a valid regex")
    })
}

/// Syntax check for PV names.
pub fn is_valid_pv_name(pv_name: &str) -> bool {
    pv_name_pattern().is_match(pv_name)
}

/// Normalize a raw PV name against the standard field catalog.
pub fn normalize(raw_name: &str, catalog: &StandardFieldCatalog) -> Result<NormalizedName> {
    let mut normalized = NormalizedName {
        base_name: raw_name.to_string(),
        field_name: None,
        is_standard_field: false,
    };

    if let Some(field) = field_name(raw_name) {
        if field == VALUE_FIELD {
            tracing::debug!("Treating .VAL as pv name alone for {}", raw_name);
            normalized.base_name = strip_field_name(raw_name).to_string();
        } else if catalog.contains(field) {
            tracing::debug!("Field {} is one of the standard fields for pv {}", field, raw_name);
            normalized.base_name = strip_field_name(raw_name).to_string();
            normalized.field_name = Some(field.to_string());
            normalized.is_standard_field = true;
        } else {
            normalized.field_name = Some(field.to_string());
        }
    }

    if !is_valid_pv_name(&normalized.base_name) {
        tracing::error!("PV name fails syntax check {}", normalized.base_name);
        return Err(AdmissionError::InvalidName(normalized.base_name));
    }

    Ok(normalized)
}

/// Key under which a new request is queued.
///
/// Drops a fixed-length protocol prefix. Applied at submission time only;
/// admission lookups keep using the prefixed name.
pub fn queue_key(base_name: &str) -> &str {
    base_name
        .strip_prefix(PROTOCOL_V4_PREFIX)
        .unwrap_or(base_name)
}
