// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Admission configuration.
//!
//! Supports both programmatic (builder) and file-based (TOML) configuration.
//!
//! ```toml
//! default_monitor_sampling_period = 1.0
//! standard_fields = ["HIHI", "HIGH", "LOW", "LOLO"]
//!
//! [installation_properties]
//! "org.epics.archiverappliance.mgmt.bpl.ArchivePVAction.minimumSamplingPeriod" = "0.5"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling period used when the caller does not override policy parameters.
pub const DEFAULT_MONITOR_SAMPLING_PERIOD: f32 = 1.0;

/// Installation property holding the minimum sampling period floor.
pub const MINIMUM_SAMPLING_PERIOD_PROPERTY: &str =
    "org.epics.archiverappliance.mgmt.bpl.ArchivePVAction.minimumSamplingPeriod";

/// Value of the floor when the property is not set.
pub const DEFAULT_MINIMUM_SAMPLING_PERIOD: &str = "0.1";

/// Fields archived as part of the PV's stream unless configured otherwise.
pub const DEFAULT_STANDARD_FIELDS: &[&str] = &[
    "HIHI", "HIGH", "LOW", "LOLO", "LOPR", "HOPR", "DRVH", "DRVL",
];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Admission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Sampling period applied when no override is requested (seconds).
    #[serde(default = "default_monitor_sampling_period")]
    pub default_monitor_sampling_period: f32,

    /// Sub-fields archived automatically alongside their PV.
    #[serde(default = "default_standard_fields")]
    pub standard_fields: Vec<String>,

    /// Installation-level properties (string keyed, string valued).
    #[serde(default)]
    pub installation_properties: HashMap<String, String>,
}

fn default_monitor_sampling_period() -> f32 {
    DEFAULT_MONITOR_SAMPLING_PERIOD
}

fn default_standard_fields() -> Vec<String> {
    DEFAULT_STANDARD_FIELDS.iter().map(|f| f.to_string()).collect()
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            default_monitor_sampling_period: DEFAULT_MONITOR_SAMPLING_PERIOD,
            standard_fields: default_standard_fields(),
            installation_properties: HashMap::new(),
        }
    }
}

impl AdmissionConfig {
    /// Create a new config builder
    pub fn builder() -> AdmissionConfigBuilder {
        AdmissionConfigBuilder::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_monitor_sampling_period.is_finite()
            || self.default_monitor_sampling_period <= 0.0
        {
            return Err(ConfigError::Invalid(format!(
                "default monitor sampling period must be positive, got {}",
                self.default_monitor_sampling_period
            )));
        }

        for field in &self.standard_fields {
            if field.is_empty() || field.contains('.') {
                return Err(ConfigError::Invalid(format!(
                    "standard field name '{}' is not a bare field name",
                    field
                )));
            }
        }

        if let Some(min) = self.installation_properties.get(MINIMUM_SAMPLING_PERIOD_PROPERTY) {
            match min.trim().parse::<f32>() {
                Ok(v) if v.is_finite() && v >= 0.0 => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "{} must be a non-negative number, got '{}'",
                        MINIMUM_SAMPLING_PERIOD_PROPERTY, min
                    )))
                }
            }
        }

        Ok(())
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct AdmissionConfigBuilder {
    default_monitor_sampling_period: Option<f32>,
    standard_fields: Option<Vec<String>>,
    installation_properties: HashMap<String, String>,
}

impl AdmissionConfigBuilder {
    /// Set the default monitor sampling period (seconds)
    pub fn default_monitor_sampling_period(mut self, secs: f32) -> Self {
        self.default_monitor_sampling_period = Some(secs);
        self
    }

    /// Replace the standard field catalog
    pub fn standard_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.standard_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the minimum sampling period floor (seconds)
    pub fn minimum_sampling_period(self, secs: f32) -> Self {
        self.installation_property(MINIMUM_SAMPLING_PERIOD_PROPERTY, secs.to_string())
    }

    /// Set an arbitrary installation property
    pub fn installation_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.installation_properties.insert(key.into(), value.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> AdmissionConfig {
        let defaults = AdmissionConfig::default();

        AdmissionConfig {
            default_monitor_sampling_period: self
                .default_monitor_sampling_period
                .unwrap_or(defaults.default_monitor_sampling_period),
            standard_fields: self.standard_fields.unwrap_or(defaults.standard_fields),
            installation_properties: self.installation_properties,
        }
    }
}
