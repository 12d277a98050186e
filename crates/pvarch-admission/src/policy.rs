// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sampling policy resolution.

use crate::config::{DEFAULT_MINIMUM_SAMPLING_PERIOD, MINIMUM_SAMPLING_PERIOD_PROPERTY};
use crate::error::{AdmissionError, Result};
use crate::model::SamplingMethod;
use crate::request::ArchiveSpec;
use crate::store::ConfigStore;

/// Sampling parameters a new request is queued with.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePolicy {
    pub method: SamplingMethod,
    pub period_secs: f32,
    pub controlling_pv: Option<String>,
    pub policy_name: Option<String>,
    /// Caller overrode method/period.
    pub user_override: bool,
    /// Requested period, when it was raised to the floor.
    pub clamped_from: Option<f32>,
}

/// Read the minimum sampling period from the installation properties.
pub fn minimum_sampling_period(store: &dyn ConfigStore) -> Result<f32> {
    let raw = store
        .installation_property(MINIMUM_SAMPLING_PERIOD_PROPERTY)
        .unwrap_or_else(|| DEFAULT_MINIMUM_SAMPLING_PERIOD.to_string());

    raw.trim().parse::<f32>().map_err(|e| {
        AdmissionError::Collaborator(anyhow::anyhow!(
            "{} is not a number ('{}'): {}",
            MINIMUM_SAMPLING_PERIOD_PROPERTY,
            raw,
            e
        ))
    })
}

/// Resolves the effective sampling policy for one request.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    default_period_secs: f32,
}

impl PolicyResolver {
    pub fn new(default_period_secs: f32) -> Self {
        Self {
            default_period_secs,
        }
    }

    /// Compute the policy for `spec`.
    ///
    /// `minimum_period` is only consulted (and only read by the caller) when
    /// the spec overrides the sampling parameters.
    pub fn resolve(
        &self,
        pv_name: &str,
        spec: &ArchiveSpec,
        minimum_period: impl FnOnce() -> Result<f32>,
    ) -> Result<EffectivePolicy> {
        if let Some(controlling) = &spec.controlling_pv {
            tracing::debug!(
                "Conditionally archiving {} using controlling PV {}",
                pv_name,
                controlling
            );
        }
        if let Some(policy) = &spec.policy_name {
            tracing::info!("User override for policy {} on pv {}", policy, pv_name);
        }

        let mut policy = EffectivePolicy {
            method: SamplingMethod::Monitor,
            period_secs: self.default_period_secs,
            controlling_pv: spec.controlling_pv.clone(),
            policy_name: spec.policy_name.clone(),
            user_override: false,
            clamped_from: None,
        };

        if !spec.overrides_policy() {
            return Ok(policy);
        }

        let method = spec.sampling_method()?;
        let mut period = spec.sampling_period()?.unwrap_or(self.default_period_secs);

        let floor = minimum_period()?;
        if period < floor {
            tracing::warn!(
                "Enforcing the minimum sampling period of {} for pv {}",
                floor,
                pv_name
            );
            policy.clamped_from = Some(period);
            period = floor;
        }

        tracing::debug!(
            "Overriding policy params with sampling method {} and sampling period {}",
            method,
            period
        );

        policy.method = method;
        policy.period_secs = period;
        policy.user_override = true;
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConfigStore;

    fn resolver() -> PolicyResolver {
        PolicyResolver::new(1.0)
    }

    fn floor(v: f32) -> impl FnOnce() -> Result<f32> {
        move || Ok(v)
    }

    #[test]
    fn test_defaults_without_override() {
        let spec = ArchiveSpec::new("SRC");
        let policy = resolver()
            .resolve("SRC", &spec, || panic!("floor read without override"))
            .unwrap();

        assert_eq!(policy.method, SamplingMethod::Monitor);
        assert_eq!(policy.period_secs, 1.0);
        assert!(!policy.user_override);
        assert_eq!(policy.clamped_from, None);
    }

    #[test]
    fn test_period_below_floor_is_clamped() {
        let spec = ArchiveSpec::new("SRC").with_sampling_period(0.01);
        let policy = resolver().resolve("SRC", &spec, floor(0.1)).unwrap();

        assert_eq!(policy.period_secs, 0.1);
        assert_eq!(policy.clamped_from, Some(0.01));
        assert!(policy.user_override);
    }

    #[test]
    fn test_period_above_floor_is_kept() {
        let spec = ArchiveSpec::new("SRC")
            .with_sampling_period(5.0)
            .with_sampling_method("SCAN");
        let policy = resolver().resolve("SRC", &spec, floor(0.1)).unwrap();

        assert_eq!(policy.method, SamplingMethod::Scan);
        assert_eq!(policy.period_secs, 5.0);
        assert_eq!(policy.clamped_from, None);
    }

    #[test]
    fn test_method_alone_does_not_override() {
        let spec = ArchiveSpec::new("SRC").with_sampling_method("SCAN");
        let policy = resolver().resolve("SRC", &spec, floor(0.1)).unwrap();

        assert_eq!(policy.method, SamplingMethod::Monitor);
        assert!(!policy.user_override);
    }

    #[test]
    fn test_unknown_method_fails_with_override() {
        let spec = ArchiveSpec::new("SRC")
            .with_sampling_period(1.0)
            .with_sampling_method("POLL");
        let err = resolver().resolve("SRC", &spec, floor(0.1)).unwrap_err();
        assert!(matches!(err, AdmissionError::UnknownSamplingMethod(_)));
    }

    #[test]
    fn test_controlling_pv_and_policy_pass_through() {
        let mut spec = ArchiveSpec::new("SRC");
        spec.controlling_pv = Some("GATE".into());
        spec.policy_name = Some("fast".into());

        let policy = resolver().resolve("SRC", &spec, floor(0.1)).unwrap();
        assert_eq!(policy.controlling_pv.as_deref(), Some("GATE"));
        assert_eq!(policy.policy_name.as_deref(), Some("fast"));
    }

    #[test]
    fn test_minimum_period_from_store() {
        let store = MemoryConfigStore::new();
        assert_eq!(minimum_sampling_period(&store).unwrap(), 0.1);

        store.set_property(MINIMUM_SAMPLING_PERIOD_PROPERTY, "0.5");
        assert_eq!(minimum_sampling_period(&store).unwrap(), 0.5);

        store.set_property(MINIMUM_SAMPLING_PERIOD_PROPERTY, "soon");
        assert!(minimum_sampling_period(&store).is_err());
    }
}
