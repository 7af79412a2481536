use crate::error::AppError;
use crate::models::{ReconciliationOutcome, ReconciliationRequest};
use crate::service::{write_csv, ClaimReconciler, LearnedNameStore};
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state: the engine plus the learned-name store it reads from
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<ClaimReconciler>,
    pub store: Arc<LearnedNameStore>,
}

impl AppState {
    pub fn new(reconciler: Arc<ClaimReconciler>, store: Arc<LearnedNameStore>) -> Self {
        Self { reconciler, store }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchReconcileRequest {
    pub requests: Vec<ReconciliationRequest>,
}

#[derive(Debug, Deserialize)]
pub struct LearnedName {
    pub raw: String,
    pub canonical: String,
}

#[derive(Debug, Deserialize)]
pub struct LearnNamesRequest {
    pub names: Vec<LearnedName>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub success: bool,
    pub message: String,
    pub outcome: Option<ReconciliationOutcome>,
}

#[derive(Debug, Serialize)]
pub struct BatchReconcileResponse {
    pub success: bool,
    pub message: String,
    pub outcomes: Option<Vec<ReconciliationOutcome>>,
}

#[derive(Debug, Serialize)]
pub struct LearnNamesResponse {
    pub success: bool,
    pub message: String,
    pub learned: usize,
}

/// Plain failure body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

fn error_response(err: AppError) -> Response {
    let status = match err {
        AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!("Request failed: {}", err);
    let response = ErrorResponse {
        success: false,
        message: format!("Error: {}", err),
    };
    (status, Json(response)).into_response()
}

/// Bill amounts must not be negative
fn validate_request(request: &ReconciliationRequest) -> Result<(), AppError> {
    let zero = BigDecimal::zero();
    if let Some(item) = request.bill_items.iter().find(|item| item.amount < zero) {
        return Err(AppError::InvalidRequest(format!(
            "bill item {:?} has negative amount {}",
            item.name, item.amount
        )));
    }
    Ok(())
}

/// Keep freshly supplied lists so later requests for the same document can omit them
fn remember_extraction(store: &LearnedNameStore, request: &ReconciliationRequest) {
    if let Some(hash) = request.document_hash.as_deref() {
        if !request.has_no_lists() {
            store.cache_extraction(hash, request.extraction());
        }
    }
}

/// Liveness probe
pub async fn health_check() -> &'static str {
    "OK"
}

/// Reconcile one request; verifies the claim form when one is attached
pub async fn reconcile(State(state): State<AppState>, Json(req): Json<ReconciliationRequest>) -> Response {
    if let Err(e) = validate_request(&req) {
        return error_response(e);
    }

    // 1. reconcile, extract, verify
    let outcome = state.reconciler.process(&req);
    // 2. cache the lists for this document
    remember_extraction(&state.store, &req);

    let totals = &outcome.summary.totals;
    let response = ReconcileResponse {
        success: true,
        message: format!(
            "Reconciled {} bill items: admissible {}, inadmissible {}",
            req.bill_items.len(),
            totals.admissible,
            totals.inadmissible
        ),
        outcome: Some(outcome),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Reconcile independent requests in parallel off the async runtime
pub async fn reconcile_batch(State(state): State<AppState>, Json(req): Json<BatchReconcileRequest>) -> Response {
    if let Err(e) = req.requests.iter().try_for_each(validate_request) {
        return error_response(e);
    }

    let reconciler = Arc::clone(&state.reconciler);
    let requests = req.requests;
    let joined = tokio::task::spawn_blocking(move || {
        let outcomes = reconciler.process_batch(&requests);
        (requests, outcomes)
    })
    .await;

    match joined {
        Ok((requests, outcomes)) => {
            requests
                .iter()
                .for_each(|request| remember_extraction(&state.store, request));
            let response = BatchReconcileResponse {
                success: true,
                message: format!("Successfully reconciled {} requests", outcomes.len()),
                outcomes: Some(outcomes),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("Batch reconciliation task failed: {}", e);
            let response = BatchReconcileResponse {
                success: false,
                message: format!("Error: {}", e),
                outcomes: None,
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
    }
}

/// Reconciliation rendered as CSV rows
pub async fn reconcile_csv(State(state): State<AppState>, Json(req): Json<ReconciliationRequest>) -> Response {
    if let Err(e) = validate_request(&req) {
        return error_response(e);
    }

    let outcome = state.reconciler.process(&req);
    let mut body = Vec::new();
    match write_csv(&outcome.summary, &mut body) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Record preferred spellings for bill item names
pub async fn learn_names(State(state): State<AppState>, Json(req): Json<LearnNamesRequest>) -> Response {
    let learned = req
        .names
        .iter()
        .filter(|entry| state.store.learn_name(&entry.raw, &entry.canonical))
        .count();
    tracing::info!("Learned {} of {} names", learned, req.names.len());

    let response = LearnNamesResponse {
        success: true,
        message: format!("Learned {} of {} names", learned, req.names.len()),
        learned,
    };
    (StatusCode::OK, Json(response)).into_response()
}
