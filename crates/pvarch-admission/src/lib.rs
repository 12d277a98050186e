// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # pvarch-admission - Archive request admission
//!
//! Decides, for each PV named in an archive request, whether a new archiving
//! workflow must be started or the PV is already known, and records the
//! request accordingly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pvarch_admission::{
//!     AdmissionConfig, ArchiveWorkflow, LoggingWorkflowEngine, MemoryConfigStore,
//!     MemoryWorkflowQueue, PlainArchiveRequest, Result,
//! };
//!
//! fn main() -> Result<()> {
//!     let settings = AdmissionConfig::default();
//!     let workflow = ArchiveWorkflow::new(
//!         &settings,
//!         MemoryConfigStore::from_config(&settings),
//!         MemoryWorkflowQueue::new(),
//!         LoggingWorkflowEngine,
//!     );
//!
//!     for outcome in workflow.archive_plain(PlainArchiveRequest::new("SRC1,SRC2.HIHI"))? {
//!         println!("{} -> {}", outcome.pv_name, outcome.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          Request Layer                              |
//! |   PlainArchiveRequest (shared params) | ArchiveSpec[] (JSON array)  |
//! +---------------------------------------------------------------------+
//! |                         Admission Pipeline                          |
//! |   normalize -> AdmissionChecker -> PolicyResolver -> Registrar      |
//! |   (per-PV lock held from check to submit)                           |
//! +---------------------------------------------------------------------+
//! |                          Collaborators                              |
//! |   ConfigStore (active) | WorkflowQueue (pending) | WorkflowEngine   |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ArchiveWorkflow`] | Pipeline bound to its collaborators |
//! | [`ArchiveSpec`] | One PV with optional per-PV overrides |
//! | [`ArchiveOutcome`] | `{pvName, status}` for one PV of a batch |
//! | [`ActiveRecord`] | PV already being archived |
//! | [`PendingRecord`] | Request queued for the engine |
//! | [`AdmissionError`] | Batch-aborting and per-PV failures |

pub mod admission;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod memory;
pub mod model;
pub mod names;
pub mod policy;
pub mod registrar;
pub mod request;
pub mod sqlite;
pub mod store;
pub mod workflow;

pub use admission::{Admission, AdmissionChecker};
pub use catalog::StandardFieldCatalog;
pub use config::{AdmissionConfig, AdmissionConfigBuilder, ConfigError};
pub use engine::{promote_pending, ChannelWorkflowEngine, LoggingWorkflowEngine};
pub use error::{AdmissionError, Result};
pub use memory::{MemoryConfigStore, MemoryWorkflowQueue};
pub use model::{
    ActiveRecord, ArchiveOutcome, ArchiveStatus, PendingRecord, SamplingMethod,
};
pub use names::{normalize, NormalizedName};
pub use policy::{EffectivePolicy, PolicyResolver};
pub use registrar::{RequestRegistrar, Submission};
pub use request::{ArchiveSpec, PlainArchiveRequest};
pub use sqlite::SqliteConfigStore;
pub use store::{ConfigStore, WorkflowEngine, WorkflowQueue};
pub use workflow::ArchiveWorkflow;
