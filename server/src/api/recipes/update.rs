use crate::api::{
    json_rejection_response, path_rejection_response, store_error_response, validation_response,
    AppState,
};
use crate::types::RecipeRequest;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

/// Full replace: fields and collections missing from the body are cleared.
pub async fn update_recipe(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return path_rejection_response(rejection),
    };
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return json_rejection_response(rejection),
    };

    if let Err(errors) = request.validate() {
        return validation_response(errors);
    }

    match state
        .store
        .update_recipe(id, request, state.cancellation())
        .await
    {
        Ok(recipe) => Json(recipe).into_response(),
        Err(e) => store_error_response(e),
    }
}
