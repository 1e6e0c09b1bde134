use crate::api_state::ApiContext;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use ingestion::controller::submit;
use ingestion::error::ServiceError;
use ingestion::interfaces::{
    AccessQuery, ClusterSummary, DeleteResponse, PhotoSummary, StatusResponse, SubmitRequest,
    SubmitResponse,
};
use ingestion::query::{delete_album, download_cluster, get_status, list_clusters, list_photos};
use tracing::info;

/// Submit an uploaded photo archive for face clustering.
///
/// Processing happens asynchronously; poll the status endpoint with the
/// returned album id. Resubmitting the same fingerprint while its album is
/// still queued or processing returns the existing album and job.
#[utoipa::path(
    post,
    path = "/albums",
    tag = "Album",
    request_body = SubmitRequest,
    responses(
        (status = 202, description = "Album accepted for processing.", body = SubmitResponse),
        (status = 400, description = "Missing fields or unknown archive key."),
        (status = 413, description = "The archive exceeds a configured limit."),
        (status = 500, description = "A database or internal error occurred."),
    )
)]
pub async fn submit_album_handler(
    State(context): State<ApiContext>,
    Json(payload): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ServiceError> {
    info!("Submit album handler for archive {:?}", payload.archive_key);
    let response = submit(&context.ctx, payload).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Poll an album's processing state.
///
/// An id the server hasn't made visible yet reports `queued` rather than
/// 404, so pollers never have to special-case the race with submission.
#[utoipa::path(
    get,
    path = "/albums/{album_id}/status",
    tag = "Album",
    params(
        ("album_id" = String, Path, description = "The unique ID of the album.")
    ),
    responses(
        (status = 200, description = "Current status, progress, and photo count.", body = StatusResponse),
        (status = 500, description = "A database or internal error occurred."),
    )
)]
pub async fn get_album_status_handler(
    State(context): State<ApiContext>,
    Path(album_id): Path<String>,
) -> Result<Json<StatusResponse>, ServiceError> {
    let status = get_status(&context.ctx, &album_id).await?;
    Ok(Json(status))
}

/// List the face clusters found in a completed album.
#[utoipa::path(
    get,
    path = "/albums/{album_id}/clusters",
    tag = "Album",
    params(
        ("album_id" = String, Path, description = "The unique ID of the album."),
        AccessQuery,
    ),
    responses(
        (status = 200, description = "The album's clusters.", body = Vec<ClusterSummary>),
        (status = 401, description = "The album is protected and the recovery code is missing or wrong."),
        (status = 404, description = "Album not found."),
        (status = 500, description = "A database or internal error occurred."),
    )
)]
pub async fn list_clusters_handler(
    State(context): State<ApiContext>,
    Path(album_id): Path<String>,
    Query(access): Query<AccessQuery>,
) -> Result<Json<Vec<ClusterSummary>>, ServiceError> {
    let clusters = list_clusters(&context.ctx, &album_id, access.code.as_deref()).await?;
    Ok(Json(clusters))
}

/// List the photos linked to one cluster.
#[utoipa::path(
    get,
    path = "/albums/{album_id}/clusters/{cluster_id}/photos",
    tag = "Album",
    params(
        ("album_id" = String, Path, description = "The unique ID of the album."),
        ("cluster_id" = String, Path, description = "The unique ID of the cluster."),
        AccessQuery,
    ),
    responses(
        (status = 200, description = "The cluster's photos.", body = Vec<PhotoSummary>),
        (status = 401, description = "The album is protected and the recovery code is missing or wrong."),
        (status = 404, description = "Album or cluster not found."),
        (status = 500, description = "A database or internal error occurred."),
    )
)]
pub async fn list_cluster_photos_handler(
    State(context): State<ApiContext>,
    Path((album_id, cluster_id)): Path<(String, String)>,
    Query(access): Query<AccessQuery>,
) -> Result<Json<Vec<PhotoSummary>>, ServiceError> {
    let photos = list_photos(
        &context.ctx,
        &album_id,
        &cluster_id,
        access.code.as_deref(),
    )
    .await?;
    Ok(Json(photos))
}

/// Download a zip archive of every photo in a cluster.
#[utoipa::path(
    get,
    path = "/albums/{album_id}/clusters/{cluster_id}/download",
    tag = "Album",
    params(
        ("album_id" = String, Path, description = "The unique ID of the album."),
        ("cluster_id" = String, Path, description = "The unique ID of the cluster."),
        AccessQuery,
    ),
    responses(
        (status = 200, description = "A zip archive of the cluster's photos.", content_type = "application/zip"),
        (status = 401, description = "The album is protected and the recovery code is missing or wrong."),
        (status = 404, description = "Album or cluster not found, or the cluster has no photos."),
        (status = 500, description = "A database or internal error occurred."),
    )
)]
pub async fn download_cluster_handler(
    State(context): State<ApiContext>,
    Path((album_id, cluster_id)): Path<(String, String)>,
    Query(access): Query<AccessQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let bytes = download_cluster(
        &context.ctx,
        &album_id,
        &cluster_id,
        access.code.as_deref(),
    )
    .await?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"cluster-{cluster_id}.zip\""),
        ),
    ];
    Ok((headers, bytes))
}

/// Delete an album and everything derived from it.
#[utoipa::path(
    delete,
    path = "/albums/{album_id}",
    tag = "Album",
    params(
        ("album_id" = String, Path, description = "The unique ID of the album."),
        AccessQuery,
    ),
    responses(
        (status = 200, description = "Counts of the deleted rows.", body = DeleteResponse),
        (status = 401, description = "The album is protected and the recovery code is missing or wrong."),
        (status = 404, description = "Album not found."),
        (status = 500, description = "A database or internal error occurred."),
    )
)]
pub async fn delete_album_handler(
    State(context): State<ApiContext>,
    Path(album_id): Path<String>,
    Query(access): Query<AccessQuery>,
) -> Result<Json<DeleteResponse>, ServiceError> {
    let deleted = delete_album(&context.ctx, &album_id, access.code.as_deref()).await?;
    Ok(Json(DeleteResponse { deleted }))
}
