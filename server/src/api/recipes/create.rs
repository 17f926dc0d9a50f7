use crate::api::{json_rejection_response, store_error_response, validation_response, AppState};
use crate::types::RecipeRequest;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

pub async fn create_recipe(
    State(state): State<AppState>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection_response(rejection),
    };

    if let Err(errors) = request.validate() {
        return validation_response(errors);
    }

    match state
        .store
        .create_recipe(request, state.cancellation())
        .await
    {
        Ok(recipe) => (StatusCode::CREATED, Json(recipe)).into_response(),
        Err(e) => store_error_response(e),
    }
}
