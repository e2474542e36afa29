//! Local stand-in for the remote account service.
//!
//! Serves the listing and detail routes the pipeline consumes, backed by an
//! in-memory [`Dataset`]. Used for local runs and as the HTTP fixture of the
//! client and CLI tests.

mod dataset;

use std::sync::Arc;

use account_sieve_core::{Record, RecordId};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

pub use dataset::{Dataset, DatasetError, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone)]
struct ServiceState {
    dataset: Arc<Dataset>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListQuery {
    token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ListBody {
    result: Vec<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    accounts: usize,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ServiceError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, error: message.into() }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

pub fn app(dataset: Dataset) -> Router {
    let state = ServiceState { dataset: Arc::new(dataset) };
    Router::new()
        .route("/health", get(health))
        .route("/list", get(list))
        .route("/list/", get(list))
        .route("/detail/:id", get(detail))
        .with_state(state)
}

/// Serves `dataset` on an already bound listener until the task is dropped.
///
/// # Errors
/// Propagates I/O errors from the underlying server.
pub async fn serve(listener: TcpListener, dataset: Dataset) -> std::io::Result<()> {
    axum::serve(listener, app(dataset)).await
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", accounts: state.dataset.accounts.len() })
}

async fn list(
    State(state): State<ServiceState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListBody>, ServiceError> {
    let token = query.token.as_deref().filter(|token| !token.is_empty());
    let page = state
        .dataset
        .page(token)
        .ok_or_else(|| ServiceError::new(StatusCode::BAD_REQUEST, "unknown token"))?;
    debug!(token = token.unwrap_or("<first page>"), ids = page.len(), "served list");
    Ok(Json(ListBody { result: page.ids, token: page.token }))
}

async fn detail(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Json<Record>, ServiceError> {
    let id = RecordId(id);
    if state.dataset.is_unavailable(id) {
        return Err(ServiceError::new(StatusCode::SERVICE_UNAVAILABLE, "account unavailable"));
    }
    let account = state
        .dataset
        .account(id)
        .cloned()
        .ok_or_else(|| ServiceError::new(StatusCode::NOT_FOUND, format!("no account {id}")))?;
    debug!(id = %id, "served detail");
    Ok(Json(account))
}
