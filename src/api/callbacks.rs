//! HTTP callback endpoints for the redirect payment flow
//!
//! The processor sends the payer's browser back through these endpoints
//! after the hosted checkout. The invoice hash rides in the URL path and
//! the correlation token in the query string; both are untrusted input.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::health::{HealthChecker, HealthStatus};
use crate::middleware::error::get_request_id_from_headers;
use crate::services::PaymentFlow;

/// Shared state for callback handlers
#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<PaymentFlow>,
    pub health: HealthChecker,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/payments/paypal-express/return/{hash}",
            get(return_callback).post(return_callback),
        )
        .route(
            "/payments/paypal-express/cancel/{hash}",
            get(cancel_callback).post(cancel_callback),
        )
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let status = state.health.check_health().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// Return callback: the payer approved the payment at the processor.
async fn return_callback(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    info!(hash = %hash, "return callback received");

    let token = params.get("token").map(|s| s.as_str());
    let payload = serde_json::to_value(&params).unwrap_or(serde_json::Value::Null);

    let redirect = state
        .flow
        .handle_return(&hash, token, &payload)
        .await
        .map_err(|err| attach_request_id(err.into(), request_id))?;

    Ok(Redirect::to(&redirect.url))
}

/// Cancel callback: the payer abandoned the payment at the processor.
async fn cancel_callback(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    info!(hash = %hash, "cancel callback received");

    let payload = serde_json::to_value(&params).unwrap_or(serde_json::Value::Null);

    let redirect = state
        .flow
        .handle_cancel(&hash, &payload)
        .await
        .map_err(|err| attach_request_id(err.into(), request_id))?;

    Ok(Redirect::to(&redirect.url))
}

fn attach_request_id(err: AppError, request_id: Option<String>) -> AppError {
    match request_id {
        Some(id) => err.with_request_id(id),
        None => err,
    }
}
