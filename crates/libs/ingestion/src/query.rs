//! Read-side operations: status polling, cluster/photo listings, on-demand
//! archive download, and the best-effort album delete.

use crate::context::ServiceContext;
use crate::error::ServiceError;
use crate::interfaces::{ClusterSummary, PhotoSummary, StatusResponse};
use common_services::archive::build_archive;
use common_services::database::{Album, AlbumStatus, DeletedCounts};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Album status for pollers. A valid-looking id with no visible row yet
/// gets a synthetic `queued` response instead of a 404, so a poll racing
/// the insert never sees a transient error.
pub async fn get_status(
    ctx: &Arc<ServiceContext>,
    album_id: &str,
) -> Result<StatusResponse, ServiceError> {
    let Some(album) = ctx.store.find_album(album_id).await? else {
        return Ok(StatusResponse {
            album_id: album_id.to_string(),
            status: AlbumStatus::Queued,
            progress: 0,
            photo_count: 0,
            error_message: None,
        });
    };
    Ok(StatusResponse {
        album_id: album.id,
        status: album.status,
        progress: album.progress,
        photo_count: album.photo_count,
        error_message: album.error_message,
    })
}

pub async fn list_clusters(
    ctx: &Arc<ServiceContext>,
    album_id: &str,
    code: Option<&str>,
) -> Result<Vec<ClusterSummary>, ServiceError> {
    let album = require_album(ctx, album_id).await?;
    require_access(ctx, &album, code)?;

    let clusters = ctx.store.list_clusters_for_album(album_id).await?;
    Ok(clusters
        .into_iter()
        .map(|c| ClusterSummary {
            cluster_id: c.id,
            thumbnail_url: c.thumbnail_url,
            created_at: c.created_at,
        })
        .collect())
}

pub async fn list_photos(
    ctx: &Arc<ServiceContext>,
    album_id: &str,
    cluster_id: &str,
    code: Option<&str>,
) -> Result<Vec<PhotoSummary>, ServiceError> {
    let album = require_album(ctx, album_id).await?;
    require_access(ctx, &album, code)?;

    if ctx.store.find_cluster(album_id, cluster_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("cluster {cluster_id}")));
    }

    let photos = ctx.store.list_photos_for_cluster(album_id, cluster_id).await?;
    Ok(photos
        .into_iter()
        .map(|p| PhotoSummary {
            photo_id: p.id,
            url: ctx.storage.public_url(&p.storage_path),
            created_at: p.created_at,
        })
        .collect())
}

/// Builds a fresh zip of everything linked to the cluster. A photo whose
/// blob fetch fails is skipped rather than aborting the whole archive.
pub async fn download_cluster(
    ctx: &Arc<ServiceContext>,
    album_id: &str,
    cluster_id: &str,
    code: Option<&str>,
) -> Result<Vec<u8>, ServiceError> {
    let album = require_album(ctx, album_id).await?;
    require_access(ctx, &album, code)?;

    if ctx.store.find_cluster(album_id, cluster_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("cluster {cluster_id}")));
    }

    let photos = ctx.store.list_photos_for_cluster(album_id, cluster_id).await?;
    if photos.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "cluster {cluster_id} has no linked photos"
        )));
    }

    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    for photo in photos.iter().take(ctx.settings.limits.max_photos_per_album) {
        match ctx.storage.get(&photo.storage_path).await {
            Ok(bytes) => {
                let name = Path::new(&photo.storage_path)
                    .file_name()
                    .map_or_else(|| photo.id.clone(), |n| n.to_string_lossy().to_string());
                files.push((name, bytes));
            }
            Err(e) => {
                warn!(
                    "Skipping photo {} in cluster download: {}",
                    photo.id, e
                );
            }
        }
    }

    Ok(build_archive(&files)?)
}

/// Deletes an album and everything under it, in dependency order. Storage
/// failures are logged and ignored so the database cleanup always runs.
pub async fn delete_album(
    ctx: &Arc<ServiceContext>,
    album_id: &str,
    code: Option<&str>,
) -> Result<DeletedCounts, ServiceError> {
    let album = require_album(ctx, album_id).await?;
    require_access(ctx, &album, code)?;

    let photos = ctx.store.list_photos_for_album(album_id).await?;
    let mut blob_paths: Vec<String> = photos.iter().map(|p| p.storage_path.clone()).collect();
    blob_paths.push(album.upload_key.clone());
    if let Err(e) = ctx.storage.delete(&blob_paths).await {
        warn!("Blob cleanup for album {} failed: {}", album_id, e);
    }

    let store = &ctx.store;
    let counts = DeletedCounts {
        links: store.delete_links_for_album(album_id).await?,
        clusters: store.delete_clusters_for_album(album_id).await?,
        photos: store.delete_photos_for_album(album_id).await?,
        jobs: store.delete_jobs_for_album(album_id).await?,
        albums: store.delete_album_row(album_id).await?,
    };
    info!("Deleted album {}: {:?}", album_id, counts);
    Ok(counts)
}

async fn require_album(
    ctx: &Arc<ServiceContext>,
    album_id: &str,
) -> Result<Album, ServiceError> {
    ctx.store
        .find_album(album_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("album {album_id}")))
}

/// Open albums (no stored hash) grant access unconditionally; protected
/// albums require the matching recovery code. The failure carries the
/// stored hint, never the hash or salt.
fn require_access(
    ctx: &Arc<ServiceContext>,
    album: &Album,
    code: Option<&str>,
) -> Result<(), ServiceError> {
    let Some(stored_hash) = album.access_code_hash.as_deref() else {
        return Ok(());
    };
    let Some(code) = code else {
        return Err(ServiceError::Unauthorized {
            hint: album.access_code_hint.clone(),
        });
    };
    if ctx.access_codes.verify(code, stored_hash)? {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized {
            hint: album.access_code_hint.clone(),
        })
    }
}
