// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Archive request parsing.
//!
//! Two input forms are accepted:
//!
//! - **Plain**: a comma separated `pv` list plus one set of shared
//!   parameters. The shared parameters are validated up front, so a bad
//!   `samplingmethod` or `samplingperiod` rejects the whole batch.
//! - **Structured**: a JSON array of [`ArchiveSpec`]s, each with its own
//!   overrides. Overrides are validated per item while the item is processed,
//!   so a bad value only fails that item.

use serde::{Deserialize, Serialize};

use crate::error::{AdmissionError, Result};
use crate::model::SamplingMethod;

/// Sampling period as supplied by the caller (JSON string or number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSamplingPeriod {
    Number(f64),
    Text(String),
}

impl RawSamplingPeriod {
    /// Parse into seconds; rejects non-numeric and non-finite values.
    pub fn seconds(&self) -> Result<f32> {
        let value = match self {
            RawSamplingPeriod::Number(n) => *n as f32,
            RawSamplingPeriod::Text(s) => s
                .trim()
                .parse::<f32>()
                .map_err(|_| AdmissionError::InvalidSamplingPeriod(s.clone()))?,
        };
        if !value.is_finite() {
            return Err(AdmissionError::InvalidSamplingPeriod(value.to_string()));
        }
        Ok(value)
    }
}

/// One PV to archive, with optional per-PV overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSpec {
    /// Raw PV name.
    pub pv: String,

    /// Presence alone requests a policy override.
    #[serde(rename = "samplingperiod", default, skip_serializing_if = "Option::is_none")]
    pub sampling_period: Option<RawSamplingPeriod>,

    #[serde(rename = "samplingmethod", default, skip_serializing_if = "Option::is_none")]
    pub sampling_method: Option<String>,

    #[serde(rename = "controllingPV", default, skip_serializing_if = "Option::is_none")]
    pub controlling_pv: Option<String>,

    #[serde(rename = "policy", default, skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ArchiveSpec {
    pub fn new(pv: impl Into<String>) -> Self {
        Self {
            pv: pv.into(),
            sampling_period: None,
            sampling_method: None,
            controlling_pv: None,
            policy_name: None,
            alias: None,
        }
    }

    pub fn with_sampling_period(mut self, secs: f32) -> Self {
        self.sampling_period = Some(RawSamplingPeriod::Number(f64::from(secs)));
        self
    }

    pub fn with_sampling_method(mut self, method: impl Into<String>) -> Self {
        self.sampling_method = Some(method.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// True when the caller asked to override the policy's sampling
    /// parameters.
    pub fn overrides_policy(&self) -> bool {
        self.sampling_period.is_some()
    }

    /// Requested sampling method; MONITOR when absent.
    pub fn sampling_method(&self) -> Result<SamplingMethod> {
        match &self.sampling_method {
            Some(m) => SamplingMethod::parse_lenient(m),
            None => Ok(SamplingMethod::Monitor),
        }
    }

    /// Requested sampling period in seconds, if any.
    pub fn sampling_period(&self) -> Result<Option<f32>> {
        self.sampling_period.as_ref().map(|p| p.seconds()).transpose()
    }
}

/// Parse a structured (JSON array) request body.
pub fn parse_structured(body: &[u8]) -> Result<Vec<ArchiveSpec>> {
    serde_json::from_slice(body).map_err(|e| AdmissionError::MalformedRequest(e.to_string()))
}

/// Parameters of the plain request form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlainArchiveRequest {
    pub pv: Option<String>,
    #[serde(rename = "samplingperiod")]
    pub sampling_period: Option<String>,
    #[serde(rename = "samplingmethod")]
    pub sampling_method: Option<String>,
    #[serde(rename = "controllingPV")]
    pub controlling_pv: Option<String>,
    #[serde(rename = "policy")]
    pub policy_name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl PlainArchiveRequest {
    pub fn new(pv: impl Into<String>) -> Self {
        Self {
            pv: Some(pv.into()),
            ..Default::default()
        }
    }

    /// Fill parameters missing here from `other`.
    ///
    /// Used to combine query-string parameters with a form-encoded body; the
    /// values already present win.
    pub fn merge(self, other: PlainArchiveRequest) -> Self {
        Self {
            pv: self.pv.or(other.pv),
            sampling_period: self.sampling_period.or(other.sampling_period),
            sampling_method: self.sampling_method.or(other.sampling_method),
            controlling_pv: self.controlling_pv.or(other.controlling_pv),
            policy_name: self.policy_name.or(other.policy_name),
        }
    }

    /// Validate the shared parameters and expand the PV list into specs.
    ///
    /// Entries are separated by commas or newlines; blank entries are skipped.
    pub fn into_specs(self) -> Result<Vec<ArchiveSpec>> {
        let pv_list = self
            .pv
            .ok_or_else(|| AdmissionError::MalformedRequest("missing pv parameter".into()))?;

        let sampling_period = match non_empty(self.sampling_period) {
            Some(raw) => {
                let raw = RawSamplingPeriod::Text(raw);
                raw.seconds()?;
                Some(raw)
            }
            None => None,
        };

        // Exact, case-sensitive match in this form.
        let sampling_method = match self.sampling_method {
            Some(m) => Some(m.parse::<SamplingMethod>()?.as_str().to_string()),
            None => None,
        };

        let controlling_pv = non_empty(self.controlling_pv);
        let policy_name = non_empty(self.policy_name);

        let specs: Vec<ArchiveSpec> = pv_list
            .split([',', '\n'])
            .map(str::trim)
            .filter(|pv| !pv.is_empty())
            .map(|pv| ArchiveSpec {
                pv: pv.to_string(),
                sampling_period: sampling_period.clone(),
                sampling_method: sampling_method.clone(),
                controlling_pv: controlling_pv.clone(),
                policy_name: policy_name.clone(),
                alias: None,
            })
            .collect();

        if specs.is_empty() {
            return Err(AdmissionError::MalformedRequest("empty pv list".into()));
        }

        Ok(specs)
    }
}
