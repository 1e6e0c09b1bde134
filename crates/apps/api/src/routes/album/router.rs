use crate::api_state::ApiContext;
use crate::routes::album::handlers::{
    delete_album_handler, download_cluster_handler, get_album_status_handler,
    list_cluster_photos_handler, list_clusters_handler, submit_album_handler,
};
use axum::{
    Router,
    routing::{delete, get, post},
};

pub fn album_router() -> Router<ApiContext> {
    Router::new()
        .route("/albums", post(submit_album_handler))
        .route("/albums/{album_id}/status", get(get_album_status_handler))
        .route("/albums/{album_id}/clusters", get(list_clusters_handler))
        .route(
            "/albums/{album_id}/clusters/{cluster_id}/photos",
            get(list_cluster_photos_handler),
        )
        .route(
            "/albums/{album_id}/clusters/{cluster_id}/download",
            get(download_cluster_handler),
        )
        .route("/albums/{album_id}", delete(delete_album_handler))
}
