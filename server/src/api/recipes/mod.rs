pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod update;

use crate::api::AppState;
use axum::routing::get;
use axum::Router;

/// Returns the router for recipe endpoints (mounted at /api/v1/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::update_recipe)
                .delete(delete::delete_recipe),
        )
}
