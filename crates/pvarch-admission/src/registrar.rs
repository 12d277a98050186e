// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Submission of new archive requests.

use std::collections::BTreeSet;

use crate::error::{AdmissionError, Result};
use crate::model::PendingRecord;
use crate::names::{queue_key, NormalizedName};
use crate::policy::EffectivePolicy;
use crate::store::{WorkflowEngine, WorkflowQueue};

/// Result of submitting a new request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Queued and handed to the engine.
    Submitted,
    /// Another request won the race for the same queue key.
    AlreadyQueued,
}

/// Builds, enqueues and starts new archive requests.
pub struct RequestRegistrar<'a> {
    queue: &'a dyn WorkflowQueue,
    engine: &'a dyn WorkflowEngine,
}

impl<'a> RequestRegistrar<'a> {
    pub fn new(queue: &'a dyn WorkflowQueue, engine: &'a dyn WorkflowEngine) -> Self {
        Self { queue, engine }
    }

    /// Build the queued record for a new request.
    pub fn build_record(
        name: &NormalizedName,
        policy: &EffectivePolicy,
        alias: Option<&str>,
    ) -> PendingRecord {
        let mut requested_fields = BTreeSet::new();
        if let Some(field) = name.standard_field() {
            requested_fields.insert(field.to_string());
        }

        PendingRecord {
            sampling_method: policy.method,
            sampling_period_secs: policy.period_secs,
            controlling_pv: policy.controlling_pv.clone(),
            policy_name: policy.policy_name.clone(),
            user_override: policy.user_override,
            requested_fields,
            aliases: alias.map(|a| vec![a.to_string()]).unwrap_or_default(),
        }
    }

    /// Queue the request and trigger the engine.
    ///
    /// The queue key has the protocol prefix removed; the engine is started
    /// with the full base name.
    pub fn submit(
        &self,
        name: &NormalizedName,
        policy: &EffectivePolicy,
        alias: Option<&str>,
    ) -> Result<Submission> {
        let pv_name = name.base_name.as_str();
        let key = queue_key(pv_name);
        let record = Self::build_record(name, policy, alias);

        let inserted = self
            .queue
            .insert_if_absent(key, record)
            .map_err(|e| AdmissionError::submission(pv_name, e))?;
        if !inserted {
            tracing::warn!("Request for {} is already queued under {}", pv_name, key);
            return Ok(Submission::AlreadyQueued);
        }

        self.engine
            .start_workflow(pv_name)
            .map_err(|e| AdmissionError::submission(pv_name, e))?;

        tracing::info!("Archive request submitted for pv {}", pv_name);
        Ok(Submission::Submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StandardFieldCatalog;
    use crate::memory::MemoryWorkflowQueue;
    use crate::model::SamplingMethod;
    use crate::names::normalize;
    use anyhow::anyhow;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingEngine {
        started: Mutex<Vec<String>>,
    }

    impl WorkflowEngine for RecordingEngine {
        fn start_workflow(&self, pv_name: &str) -> anyhow::Result<()> {
            self.started.lock().push(pv_name.to_string());
            Ok(())
        }
    }

    struct DownEngine;

    impl WorkflowEngine for DownEngine {
        fn start_workflow(&self, _pv_name: &str) -> anyhow::Result<()> {
            Err(anyhow!("engine unreachable"))
        }
    }

    fn policy() -> EffectivePolicy {
        EffectivePolicy {
            method: SamplingMethod::Scan,
            period_secs: 2.0,
            controlling_pv: Some("GATE".into()),
            policy_name: None,
            user_override: true,
            clamped_from: None,
        }
    }

    #[test]
    fn test_submit_queues_record_and_starts_engine() {
        let queue = MemoryWorkflowQueue::new();
        let engine = RecordingEngine::default();
        let registrar = RequestRegistrar::new(&queue, &engine);

        let name = normalize("SRC.HIHI", &StandardFieldCatalog::new(["HIHI"])).unwrap();
        let outcome = registrar.submit(&name, &policy(), Some("A1")).unwrap();
        assert_eq!(outcome, Submission::Submitted);

        let queued = queue.get("SRC").unwrap();
        assert_eq!(queued.sampling_method, SamplingMethod::Scan);
        assert_eq!(queued.sampling_period_secs, 2.0);
        assert_eq!(queued.controlling_pv.as_deref(), Some("GATE"));
        assert!(queued.is_field_requested("HIHI"));
        assert_eq!(queued.aliases, vec!["A1"]);
        assert_eq!(*engine.started.lock(), vec!["SRC"]);
    }

    #[test]
    fn test_v4_prefix_stripped_for_queue_only() {
        let queue = MemoryWorkflowQueue::new();
        let engine = RecordingEngine::default();
        let registrar = RequestRegistrar::new(&queue, &engine);

        let name = normalize("pva://SRC", &StandardFieldCatalog::default()).unwrap();
        registrar.submit(&name, &policy(), None).unwrap();

        assert!(queue.get("SRC").is_some());
        assert!(queue.get("pva://SRC").is_none());
        assert_eq!(*engine.started.lock(), vec!["pva://SRC"]);
    }

    #[test]
    fn test_second_insert_for_same_key_is_rejected() {
        let queue = MemoryWorkflowQueue::new();
        let engine = RecordingEngine::default();
        let registrar = RequestRegistrar::new(&queue, &engine);
        let name = normalize("SRC", &StandardFieldCatalog::default()).unwrap();

        registrar.submit(&name, &policy(), None).unwrap();
        let again = registrar.submit(&name, &policy(), None).unwrap();
        assert_eq!(again, Submission::AlreadyQueued);
        assert_eq!(engine.started.lock().len(), 1);
    }

    #[test]
    fn test_engine_failure_is_a_submission_error() {
        let queue = MemoryWorkflowQueue::new();
        let registrar = RequestRegistrar::new(&queue, &DownEngine);
        let name = normalize("SRC", &StandardFieldCatalog::default()).unwrap();

        let err = registrar.submit(&name, &policy(), None).unwrap_err();
        assert!(matches!(err, AdmissionError::Submission { ref pv, .. } if pv == "SRC"));
    }
}
