// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route definitions for the management and status APIs.

use crate::handlers;
use crate::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Archiver management routes
pub fn mgmt_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/mgmt/bpl/archivePV",
            get(handlers::archive_pv).post(handlers::archive_pv),
        )
        .route("/mgmt/bpl/pendingRequests", get(handlers::pending_requests))
}

/// API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/info", get(handlers::info))
}
