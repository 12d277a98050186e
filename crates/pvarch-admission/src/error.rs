// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Admission error types.
//!
//! Errors fall into two classes:
//!
//! - **Batch-aborting**: raised before per-item isolation is in place (request
//!   parsing of the plain form) or deliberately propagated out of the item
//!   pipeline (`InvalidName`). The caller gets an error instead of a list.
//! - **Per-item**: everything else raised inside the item pipeline. These are
//!   reported inline as `"Exception occurred"` and the batch continues.

use thiserror::Error;

/// Errors produced by the admission pipeline and request parsing.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The PV name fails the naming syntax check.
    #[error("PV name fails syntax check {0}")]
    InvalidName(String),

    /// The sampling method is neither SCAN nor MONITOR.
    #[error("unknown sampling method: {0}")]
    UnknownSamplingMethod(String),

    /// The sampling period could not be parsed or is not a finite number.
    #[error("invalid sampling period: {0}")]
    InvalidSamplingPeriod(String),

    /// The request body or parameters are malformed.
    #[error("malformed archive request: {0}")]
    MalformedRequest(String),

    /// Building, enqueuing, or starting the workflow for a new request failed.
    #[error("failed to submit archive request for {pv}: {source}")]
    Submission {
        pv: String,
        #[source]
        source: anyhow::Error,
    },

    /// A collaborator (config store, workflow queue) failed.
    #[error("collaborator failure: {0}")]
    Collaborator(#[from] anyhow::Error),
}

impl AdmissionError {
    /// True when the error must abort the whole batch rather than being
    /// reported against a single item.
    pub fn aborts_batch(&self) -> bool {
        matches!(
            self,
            AdmissionError::InvalidName(_) | AdmissionError::MalformedRequest(_)
        )
    }

    pub(crate) fn submission(pv: &str, source: anyhow::Error) -> Self {
        AdmissionError::Submission {
            pv: pv.to_string(),
            source,
        }
    }
}

/// Result alias for the admission pipeline.
pub type Result<T> = std::result::Result<T, AdmissionError>;
