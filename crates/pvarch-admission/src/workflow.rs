// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Archive request workflow
//!
//! Runs the admission pipeline once per PV of a batch:
//!
//! ```text
//! normalize --> check (merge) --+--> already submitted
//!                               |
//!                               +--> resolve policy --> submit
//! ```
//!
//! Outcomes are returned in input order. An invalid PV name aborts the
//! batch; every other failure is reported as "Exception occurred" for its
//! PV and processing moves on to the next one.

use std::sync::Arc;

use crate::admission::{Admission, AdmissionChecker};
use crate::catalog::StandardFieldCatalog;
use crate::config::AdmissionConfig;
use crate::engine::promote_pending;
use crate::error::{AdmissionError, Result};
use crate::locks::KeyedLocks;
use crate::model::{ArchiveOutcome, ArchiveStatus};
use crate::names::{normalize, queue_key};
use crate::policy::{minimum_sampling_period, PolicyResolver};
use crate::registrar::{RequestRegistrar, Submission};
use crate::request::{parse_structured, ArchiveSpec, PlainArchiveRequest};
use crate::store::{ConfigStore, WorkflowEngine, WorkflowQueue};

/// Admission pipeline bound to its collaborators.
///
/// # Type Parameters
///
/// - `C` -- Configuration store (e.g., `SqliteConfigStore`)
/// - `Q` -- Workflow queue (e.g., `MemoryWorkflowQueue`)
/// - `E` -- Workflow engine trigger
pub struct ArchiveWorkflow<C: ConfigStore, Q: WorkflowQueue, E: WorkflowEngine> {
    config_store: Arc<C>,
    queue: Arc<Q>,
    engine: Arc<E>,
    policy: PolicyResolver,
    locks: KeyedLocks,
}

impl<C: ConfigStore, Q: WorkflowQueue, E: WorkflowEngine> ArchiveWorkflow<C, Q, E> {
    /// Create a workflow over the given collaborators.
    pub fn new(settings: &AdmissionConfig, config_store: C, queue: Q, engine: E) -> Self {
        Self::from_shared(settings, Arc::new(config_store), Arc::new(queue), Arc::new(engine))
    }

    /// Create a workflow over collaborators shared with other components.
    pub fn from_shared(
        settings: &AdmissionConfig,
        config_store: Arc<C>,
        queue: Arc<Q>,
        engine: Arc<E>,
    ) -> Self {
        Self {
            config_store,
            queue,
            engine,
            policy: PolicyResolver::new(settings.default_monitor_sampling_period),
            locks: KeyedLocks::new(),
        }
    }

    pub fn config_store(&self) -> &Arc<C> {
        &self.config_store
    }

    pub fn queue(&self) -> &Arc<Q> {
        &self.queue
    }

    /// Handle a plain request: shared parameters, comma separated PVs.
    pub fn archive_plain(&self, request: PlainArchiveRequest) -> Result<Vec<ArchiveOutcome>> {
        tracing::info!("Archiving pv(s) {}", request.pv.as_deref().unwrap_or(""));
        let specs = request.into_specs()?;
        self.archive_batch(&specs)
    }

    /// Handle a structured request: a JSON array of per-PV specs.
    pub fn archive_structured(&self, body: &[u8]) -> Result<Vec<ArchiveOutcome>> {
        let specs = parse_structured(body)?;
        tracing::debug!("Archiving {} PVs from a JSON request", specs.len());
        self.archive_batch(&specs)
    }

    /// Run the pipeline for every spec, in order.
    pub fn archive_batch(&self, specs: &[ArchiveSpec]) -> Result<Vec<ArchiveOutcome>> {
        let catalog = StandardFieldCatalog::load(self.config_store.as_ref());

        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in specs {
            tracing::debug!("Calling archive_pv for pv {}", spec.pv);
            outcomes.push(self.archive_pv(spec, &catalog)?);
        }
        Ok(outcomes)
    }

    /// Run the pipeline for a single PV.
    ///
    /// Only batch-aborting errors are returned; anything else becomes an
    /// "Exception occurred" outcome.
    pub fn archive_pv(
        &self,
        spec: &ArchiveSpec,
        catalog: &StandardFieldCatalog,
    ) -> Result<ArchiveOutcome> {
        let name = normalize(&spec.pv, catalog)?;
        let pv_name = name.base_name.clone();

        let result = self.locks.with_lock(&pv_name, || -> Result<ArchiveStatus> {
            // Per-item overrides are validated before any state is touched.
            spec.sampling_method()?;
            spec.sampling_period()?;

            let checker = AdmissionChecker::new(self.config_store.as_ref(), self.queue.as_ref());
            if checker.check(&name, spec.alias.as_deref())?.is_registered() {
                return Ok(ArchiveStatus::AlreadySubmitted);
            }

            let policy = self.policy.resolve(&pv_name, spec, || {
                minimum_sampling_period(self.config_store.as_ref())
            })?;

            let registrar = RequestRegistrar::new(self.queue.as_ref(), self.engine.as_ref());
            match registrar.submit(&name, &policy, spec.alias.as_deref())? {
                Submission::Submitted => Ok(ArchiveStatus::Submitted),
                Submission::AlreadyQueued => Ok(ArchiveStatus::AlreadySubmitted),
            }
        });

        match result {
            Ok(status) => Ok(ArchiveOutcome::new(pv_name, status)),
            Err(e) if e.aborts_batch() => Err(e),
            Err(e) => {
                tracing::error!("Exception archiving PV {}: {}", pv_name, e);
                Ok(ArchiveOutcome::new(pv_name, ArchiveStatus::ExceptionOccurred))
            }
        }
    }

    /// Current admission state of a raw PV name, without merging anything.
    pub fn status(&self, raw_name: &str) -> Result<Admission> {
        let catalog = StandardFieldCatalog::load(self.config_store.as_ref());
        let name = normalize(raw_name, &catalog)?;

        if let Some(record) = self.config_store.active_record(&name.base_name)? {
            return Ok(Admission::AlreadyActive(record));
        }
        match self.queue.pending_record(&name.base_name)? {
            Some(record) => Ok(Admission::AlreadyPending(record)),
            None => Ok(Admission::NotRegistered),
        }
    }

    /// Record that the engine has started collecting `pv_name`.
    ///
    /// Moves the queued request to the config store under the per-PV lock.
    pub fn confirm_started(&self, pv_name: &str) -> Result<bool> {
        self.locks
            .with_lock(pv_name, || {
                promote_pending(
                    self.queue.as_ref(),
                    self.config_store.as_ref(),
                    queue_key(pv_name),
                    pv_name,
                )
            })
            .map_err(AdmissionError::Collaborator)
    }
}
