// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP request handlers.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Form, FromRequest, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pvarch_admission::policy::minimum_sampling_period;
use pvarch_admission::store::WorkflowQueue;
use pvarch_admission::{AdmissionError, ArchiveOutcome, PlainArchiveRequest};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            error: error.to_string(),
            code: 500,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        let code = match err {
            AdmissionError::InvalidName(_)
            | AdmissionError::MalformedRequest(_)
            | AdmissionError::UnknownSamplingMethod(_)
            | AdmissionError::InvalidSamplingPeriod(_) => 400,
            _ => 500,
        };
        Self {
            error: err.to_string(),
            code,
        }
    }
}

fn content_type_is(headers: &HeaderMap, mime: &str) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(mime))
}

fn rejection(status: StatusCode, body_text: String) -> ApiError {
    ApiError {
        error: body_text,
        code: status.as_u16(),
    }
}

/// GET|POST /mgmt/bpl/archivePV
///
/// A JSON body is a structured request. Otherwise the query parameters form a
/// plain request, merged with a form-encoded body if there is one. Any other
/// POST body may carry the PV list (comma or newline separated) instead of
/// `pv`.
pub async fn archive_pv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlainArchiveRequest>,
    headers: HeaderMap,
    request: Request,
) -> Result<Json<Vec<ArchiveOutcome>>, ApiError> {
    let workflow = Arc::clone(state.workflow());
    let structured = content_type_is(&headers, "application/json");

    let mut plain = query;
    let body = if content_type_is(&headers, "application/x-www-form-urlencoded") {
        let Form(form) = Form::<PlainArchiveRequest>::from_request(request, &state)
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;
        plain = plain.merge(form);
        Bytes::new()
    } else {
        Bytes::from_request(request, &state)
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?
    };

    if !structured && plain.pv.is_none() && !body.is_empty() {
        plain.pv = Some(String::from_utf8_lossy(&body).into_owned());
    }

    let outcomes = tokio::task::spawn_blocking(move || {
        if structured {
            workflow.archive_structured(&body)
        } else {
            workflow.archive_plain(plain)
        }
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(outcomes))
}

/// GET /mgmt/bpl/pendingRequests
pub async fn pending_requests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = state
        .workflow()
        .queue()
        .pending_names()
        .map_err(ApiError::internal)?;
    Ok(Json(names))
}

/// GET /api/v1/health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/v1/info
pub async fn info(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let workflow = state.workflow();
    let store = workflow.config_store().as_ref();

    let minimum_period = minimum_sampling_period(store)?;
    let active = store.active_count().map_err(ApiError::internal)?;
    let pending = workflow.queue().len();

    Ok(Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "defaultMonitorSamplingPeriod": state.settings().default_monitor_sampling_period,
        "minimumSamplingPeriod": minimum_period,
        "standardFields": state.settings().standard_fields,
        "activePVs": active,
        "pendingRequests": pending,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use http_body_util::BodyExt;
    use pvarch_admission::{ActiveRecord, AdmissionConfig, SqliteConfigStore};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<AppState>, mpsc::UnboundedReceiver<String>) {
        let settings = AdmissionConfig::builder()
            .standard_fields(["HIHI", "LOLO"])
            .build();
        let store = SqliteConfigStore::new_in_memory().unwrap();
        store.seed_from_config(&settings).unwrap();

        let (state, rx) = AppState::new(settings, store);
        let state = Arc::new(state);
        (crate::build_router(Arc::clone(&state)), state, rx)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_plain_get_request() {
        let (app, state, mut rx) = app();
        state
            .workflow()
            .config_store()
            .insert_active(&ActiveRecord::new("SRC2"))
            .unwrap();

        let (status, body) = send(app, get("/mgmt/bpl/archivePV?pv=SRC1,SRC2.HIHI")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "pvName": "SRC1", "status": "Archive request submitted" },
                { "pvName": "SRC2", "status": "Already submitted" }
            ])
        );
        assert_eq!(rx.try_recv().unwrap(), "SRC1");
    }

    #[tokio::test]
    async fn test_post_pv_list_in_body() {
        let (app, state, _rx) = app();

        let request = Request::builder()
            .method("POST")
            .uri("/mgmt/bpl/archivePV?samplingperiod=2.0&samplingmethod=SCAN")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("SRC1\nSRC2"))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let queued = state.workflow().queue().get("SRC2").unwrap();
        assert_eq!(queued.sampling_period_secs, 2.0);
    }

    #[tokio::test]
    async fn test_form_encoded_post() {
        let (app, state, _rx) = app();

        let request = Request::builder()
            .method("POST")
            .uri("/mgmt/bpl/archivePV?samplingperiod=3")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("pv=SRC1%2CSRC2&samplingmethod=SCAN"))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "pvName": "SRC1", "status": "Archive request submitted" },
                { "pvName": "SRC2", "status": "Archive request submitted" }
            ])
        );

        let queued = state.workflow().queue().get("SRC1").unwrap();
        assert_eq!(queued.sampling_period_secs, 3.0);
        assert_eq!(queued.sampling_method, pvarch_admission::SamplingMethod::Scan);
    }

    #[tokio::test]
    async fn test_structured_post() {
        let (app, _state, _rx) = app();

        let request = Request::builder()
            .method("POST")
            .uri("/mgmt/bpl/archivePV")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"[{"pv":"SRC1","samplingperiod":"1","samplingmethod":"POLL"},{"pv":"SRC2","alias":"A2"}]"#,
            ))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["status"], "Exception occurred");
        assert_eq!(body[1]["status"], "Archive request submitted");
    }

    #[tokio::test]
    async fn test_invalid_name_is_bad_request() {
        let (app, _state, _rx) = app();

        let (status, body) = send(app, get("/mgmt/bpl/archivePV?pv=BAD%20NAME")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_plain_unknown_method_is_bad_request() {
        let (app, state, _rx) = app();

        let (status, _) = send(
            app,
            get("/mgmt/bpl/archivePV?pv=SRC1&samplingperiod=1&samplingmethod=POLL"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.workflow().queue().is_empty());
    }

    #[tokio::test]
    async fn test_missing_pv_is_bad_request() {
        let (app, _state, _rx) = app();

        let (status, _) = send(app, get("/mgmt/bpl/archivePV")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pending_requests_and_info() {
        let (app, _state, _rx) = app();

        send(app.clone(), get("/mgmt/bpl/archivePV?pv=B,A")).await;

        let (status, body) = send(app.clone(), get("/mgmt/bpl/pendingRequests")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["A", "B"]));

        let (status, body) = send(app.clone(), get("/api/v1/info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pendingRequests"], 2);
        assert_eq!(body["activePVs"], 0);

        let (status, body) = send(app, get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
