pub mod album;
mod api_doc;
pub mod root;

use crate::album::router::album_router;
use crate::api_state::ApiContext;
use crate::root::router::root_public_router;
use crate::routes::api_doc::ApiDoc;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

// --- Router Construction ---
pub fn create_router(api_state: ApiContext) -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .merge(root_public_router())
        .merge(album_router())
        .with_state(api_state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
