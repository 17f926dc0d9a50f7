pub mod health;
pub mod recipes;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{Cancellation, RecipeStore, StoreError};
use crate::validation::ValidationErrors;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecipeStore>,
    pub operation_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecipeStore>, operation_timeout: Option<Duration>) -> Self {
        Self {
            store,
            operation_timeout,
        }
    }

    /// A fresh token for one request, bounded by the configured deadline.
    pub fn cancellation(&self) -> Cancellation {
        Cancellation::with_optional_timeout(self.operation_timeout)
    }
}

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            status: status.as_u16(),
            details: None,
        }),
    )
        .into_response()
}

pub fn validation_response(errors: ValidationErrors) -> Response {
    let status = StatusCode::BAD_REQUEST;
    (
        status,
        Json(ErrorResponse {
            error: "validation failed".to_string(),
            status: status.as_u16(),
            details: Some(errors.into_map()),
        }),
    )
        .into_response()
}

/// Map a store failure to its HTTP answer. Storage details are logged, never
/// returned to the client.
pub fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::Validation(errors) => validation_response(errors),
        StoreError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "recipe not found"),
        StoreError::Conflict { context, source } => {
            tracing::warn!(error = %source, "{}", context);
            error_response(StatusCode::CONFLICT, context)
        }
        StoreError::Cancelled => {
            tracing::warn!("operation cancelled before completion");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "operation cancelled")
        }
        other => {
            tracing::error!(error = ?other, "store operation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

pub fn json_rejection_response(rejection: JsonRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

pub fn path_rejection_response(rejection: PathRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, format!("invalid recipe id: {}", rejection.body_text()))
}

pub fn query_rejection_response(rejection: QueryRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

/// Full application router, without the HTTP trace layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(health::ping))
        .nest("/api/v1/recipes", recipes::router())
        .with_state(state)
}
