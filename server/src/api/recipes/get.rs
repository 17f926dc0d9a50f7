use crate::api::{path_rejection_response, store_error_response, AppState};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

pub async fn get_recipe(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return path_rejection_response(rejection),
    };

    match state.store.get_recipe(id, state.cancellation()).await {
        Ok(recipe) => Json(recipe).into_response(),
        Err(e) => store_error_response(e),
    }
}
