//! Axum router and HTTP handlers for etr-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Tests drive the bare router.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use etr_reconcile::{FailureKind, ReconciliationError};
use etr_registry::RegistryError;
use tracing::{info, warn};

use crate::{
    api_types::{BusinessDetailQuery, BusinessDetailResponse, ErrorResponse, HealthResponse},
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/sync/:tin", get(sync_tin))
        .route("/v1/business/detail", get(business_detail))
        .route("/v1/registry/registration/:tin", get(registration))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: status.as_u16(),
            message: message.into(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }),
    )
        .into_response()
}

pub fn status_for_kind(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Validation | FailureKind::Incomplete | FailureKind::LocalMissing => {
            StatusCode::BAD_REQUEST
        }
        FailureKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        FailureKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reconcile_error(e: ReconciliationError) -> Response {
    error_response(status_for_kind(e.kind), e.message)
}

fn registry_error(e: RegistryError) -> Response {
    let status = match e {
        RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::Unavailable(_) | RegistryError::Decode(_) => StatusCode::BAD_GATEWAY,
        RegistryError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e.to_string())
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            registry: st.registry.source_name().to_string(),
            uptime_secs: st.uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/sync/:tin
// ---------------------------------------------------------------------------

pub(crate) async fn sync_tin(State(st): State<Arc<AppState>>, Path(tin): Path<String>) -> Response {
    match st.engine.reconcile(&tin).await {
        Ok(summary) => {
            info!(tin = %summary.tin, branch = ?summary.branch, "sync complete");
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e) => {
            warn!(tin = %tin, kind = ?e.kind, error = %e, "sync failed");
            reconcile_error(e)
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/business/detail?licenseNo=&tin=&lang=
// ---------------------------------------------------------------------------

/// Refresh the stored license when there is one; otherwise hand back the
/// registry's detail record untouched.
pub(crate) async fn business_detail(
    State(st): State<Arc<AppState>>,
    Query(q): Query<BusinessDetailQuery>,
) -> Response {
    match st
        .engine
        .update_business_details(&q.license_no, &q.tin, Some(&q.lang))
        .await
    {
        Ok(summary) => {
            return (
                StatusCode::OK,
                Json(BusinessDetailResponse {
                    sync: Some(summary),
                    detail: None,
                    updated: true,
                }),
            )
                .into_response();
        }
        Err(e) if e.kind == FailureKind::LocalMissing => {}
        Err(e) => {
            warn!(tin = %q.tin, licence_no = %q.license_no, error = %e, "license refresh failed");
            return reconcile_error(e);
        }
    }

    match st
        .registry
        .license_detail(q.license_no.trim(), q.tin.trim(), &q.lang)
        .await
    {
        Ok(detail) => (
            StatusCode::OK,
            Json(BusinessDetailResponse {
                sync: None,
                detail: Some(detail),
                updated: false,
            }),
        )
            .into_response(),
        Err(e) => registry_error(e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/registry/registration/:tin
// ---------------------------------------------------------------------------

pub(crate) async fn registration(
    State(st): State<Arc<AppState>>,
    Path(tin): Path<String>,
) -> Response {
    let tin = tin.trim();
    if tin.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "TIN cannot be empty");
    }
    match st.registry.registration_info(tin).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => registry_error(e),
    }
}
