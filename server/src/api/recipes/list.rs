use crate::api::{error_response, query_rejection_response, store_error_response, AppState};
use crate::types::ListOptions;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Summaries only: ingredients, steps and tags are left out of each entry.
pub async fn list_recipes(
    State(state): State<AppState>,
    params: Result<Query<ListOptions>, QueryRejection>,
) -> Response {
    let Query(options) = match params {
        Ok(params) => params,
        Err(rejection) => return query_rejection_response(rejection),
    };

    if matches!(options.limit, Some(limit) if limit < 0) {
        return error_response(StatusCode::BAD_REQUEST, "limit must not be negative");
    }
    if matches!(options.offset, Some(offset) if offset < 0) {
        return error_response(StatusCode::BAD_REQUEST, "offset must not be negative");
    }

    match state
        .store
        .list_recipes(options, state.cancellation())
        .await
    {
        Ok(recipes) => Json(recipes).into_response(),
        Err(e) => store_error_response(e),
    }
}
