// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PV Archive Gateway - HTTP management endpoint for archive requests
//!
//! Accepts archive requests over HTTP, runs them through the admission
//! pipeline and hands admitted PVs to the workflow engine task.
//!
//! # Usage
//!
//! ```bash
//! # Start gateway on default port 17665 with ./pvarch.db
//! pvarch-gateway
//!
//! # In-memory configuration store, engine confirms starts immediately
//! pvarch-gateway --db :memory: --auto-start
//!
//! # Custom settings file
//! pvarch-gateway --config admission.toml --port 9000
//! ```
//!
//! # Endpoints
//!
//! - `GET|POST /mgmt/bpl/archivePV` - Submit an archive request
//! - `GET /mgmt/bpl/pendingRequests` - PVs waiting for the engine
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/info` - Gateway and admission settings

mod handlers;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use pvarch_admission::{
    AdmissionConfig, ArchiveWorkflow, ChannelWorkflowEngine, MemoryWorkflowQueue,
    SqliteConfigStore,
};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// PV Archive Gateway
#[derive(Parser, Debug)]
#[command(name = "pvarch-gateway")]
#[command(about = "HTTP management gateway for PV archive requests")]
#[command(version)]
struct Args {
    /// HTTP server port
    #[arg(short, long, default_value = "17665")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// SQLite configuration database (":memory:" for an in-memory store)
    #[arg(long, default_value = "pvarch.db")]
    db: String,

    /// Admission settings (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Mark submitted PVs as archived as soon as the engine receives them
    #[arg(long)]
    auto_start: bool,
}

/// Admission pipeline as wired by the gateway.
pub type Workflow = ArchiveWorkflow<SqliteConfigStore, MemoryWorkflowQueue, ChannelWorkflowEngine>;

/// Shared application state
pub struct AppState {
    workflow: Arc<Workflow>,
    settings: AdmissionConfig,
}

impl AppState {
    /// Wire the pipeline over `store`.
    ///
    /// Returns the receiver the engine task drains.
    fn new(
        settings: AdmissionConfig,
        store: SqliteConfigStore,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (engine, rx) = ChannelWorkflowEngine::new();
        let workflow = ArchiveWorkflow::new(&settings, store, MemoryWorkflowQueue::new(), engine);
        let state = Self {
            workflow: Arc::new(workflow),
            settings,
        };
        (state, rx)
    }

    pub fn workflow(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    pub fn settings(&self) -> &AdmissionConfig {
        &self.settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let settings = match &args.config {
        Some(path) => AdmissionConfig::from_file(path)
            .with_context(|| format!("Failed to load admission settings from {}", path))?,
        None => AdmissionConfig::default(),
    };
    settings.validate()?;

    let store = SqliteConfigStore::new(&args.db)?;
    store.seed_from_config(&settings)?;

    let (state, rx) = AppState::new(settings, store);
    let state = Arc::new(state);

    tokio::spawn(run_engine(Arc::clone(state.workflow()), rx, args.auto_start));

    let app = build_router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    info!("PV Archive Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP server: http://{}", addr);
    info!("Configuration store: {}", args.db);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Engine task: receives workflow starts from the admission pipeline.
async fn run_engine(
    workflow: Arc<Workflow>,
    mut rx: mpsc::UnboundedReceiver<String>,
    auto_start: bool,
) {
    while let Some(pv_name) = rx.recv().await {
        info!("Workflow started for pv {}", pv_name);
        if !auto_start {
            continue;
        }

        let workflow = Arc::clone(&workflow);
        let result =
            tokio::task::spawn_blocking(move || workflow.confirm_started(&pv_name)).await;
        match result {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => tracing::warn!("No pending request found for started workflow"),
            Ok(Err(e)) => tracing::error!("Failed to record workflow start: {}", e),
            Err(e) => tracing::error!("Engine task panicked: {}", e),
        }
    }
    info!("Workflow engine stopped");
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::mgmt_routes())
        .merge(routes::api_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
