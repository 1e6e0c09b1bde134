use crate::routes::{album, root};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::handlers::root,
        root::handlers::health_check,
        // Album handlers
        album::handlers::submit_album_handler,
        album::handlers::get_album_status_handler,
        album::handlers::list_clusters_handler,
        album::handlers::list_cluster_photos_handler,
        album::handlers::download_cluster_handler,
        album::handlers::delete_album_handler,
    ),
    components(
        schemas(
            ingestion::interfaces::SubmitRequest,
            ingestion::interfaces::SubmitResponse,
            ingestion::interfaces::StatusResponse,
            ingestion::interfaces::ClusterSummary,
            ingestion::interfaces::PhotoSummary,
            ingestion::interfaces::DeleteResponse,
        ),
    ),
    tags(
        (name = "Album", description = "Submit photo archives and browse the resulting face clusters"),
        (name = "System", description = "Health check"),
    )
)]
pub struct ApiDoc;
