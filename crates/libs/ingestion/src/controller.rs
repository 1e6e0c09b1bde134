//! Owns the album/job lifecycle: fingerprint dedup, creation, and handoff
//! to the asynchronous pipeline.

use crate::context::ServiceContext;
use crate::error::ServiceError;
use crate::interfaces::{SubmitRequest, SubmitResponse};
use crate::pipeline::run_pipeline;
use chrono::Utc;
use common_services::archive::list_entry_names;
use common_services::database::{Album, AlbumStatus, Job, JobStatus};
use common_services::nice_id;
use common_services::storage::StorageError;
use std::sync::Arc;
use tracing::{info, warn};

const ALBUM_ID_LEN: usize = 16;
const JOB_ID_LEN: usize = 16;

/// Submits an archive for processing. Idempotent by fingerprint while the
/// matching album is still queued or processing.
pub async fn submit(
    ctx: &Arc<ServiceContext>,
    request: SubmitRequest,
) -> Result<SubmitResponse, ServiceError> {
    let fingerprint = request.fingerprint.trim();
    let archive_key = request.archive_key.trim();
    if fingerprint.is_empty() {
        return Err(ServiceError::InvalidInput("fingerprint is empty".into()));
    }
    if archive_key.is_empty() {
        return Err(ServiceError::InvalidInput("archive_key is empty".into()));
    }

    // Limits are enforced before any album or job row exists.
    check_limits(ctx, archive_key).await?;

    // Held across the whole check-and-create sequence so concurrent
    // submissions of one fingerprint create exactly one job.
    let _guard = ctx.lock_fingerprint(fingerprint).await;

    if let Some(album) = ctx.store.latest_album_by_fingerprint(fingerprint).await? {
        if album.status.is_active() {
            info!("Reusing active album {} for fingerprint", album.id);
            let job_id = ensure_job(ctx, &album.id, archive_key).await?;
            return Ok(SubmitResponse {
                album_id: album.id,
                job_id,
                recovery_code: None,
            });
        }
    }

    let album_id = nice_id(ALBUM_ID_LEN);
    let minted = if ctx.access_codes.is_enabled() {
        Some(ctx.access_codes.mint()?)
    } else {
        None
    };

    let now = Utc::now();
    let album = Album {
        id: album_id.clone(),
        fingerprint: fingerprint.to_string(),
        status: AlbumStatus::Queued,
        progress: 0,
        photo_count: 0,
        error_message: None,
        upload_key: archive_key.to_string(),
        access_code_hash: minted.as_ref().map(|m| m.hash.clone()),
        access_code_hint: minted.as_ref().map(|m| m.hint.clone()),
        access_code_created_at: minted.as_ref().map(|_| now),
        lease_owner: None,
        lease_expires_at: None,
        created_at: now,
    };
    ctx.store.insert_album(&album).await?;
    info!("Created album {} for new submission", album_id);

    let job_id = ensure_job(ctx, &album_id, archive_key).await?;

    Ok(SubmitResponse {
        album_id,
        job_id,
        recovery_code: minted.map(|m| m.plaintext),
    })
}

/// Returns the active job for the album, creating and scheduling one when
/// none exists.
async fn ensure_job(
    ctx: &Arc<ServiceContext>,
    album_id: &str,
    archive_key: &str,
) -> Result<String, ServiceError> {
    if let Some(job) = ctx.store.active_job_for_album(album_id).await? {
        info!("Album {} already has active job {}", album_id, job.id);
        return Ok(job.id);
    }

    let job = Job {
        id: nice_id(JOB_ID_LEN),
        album_id: album_id.to_string(),
        status: JobStatus::Pending,
        zip_path: archive_key.to_string(),
        error: None,
        result: None,
        created_at: Utc::now(),
    };
    ctx.store.insert_job(&job).await?;
    info!("Created job {} for album {}", job.id, album_id);

    tokio::spawn(run_pipeline(
        ctx.clone(),
        album_id.to_string(),
        job.id.clone(),
    ));

    Ok(job.id)
}

/// Rejects oversized archives and over-limit photo counts before any state
/// is created. An archive whose central directory can't be read is let
/// through; the pipeline fails that run with a recorded error.
async fn check_limits(ctx: &Arc<ServiceContext>, archive_key: &str) -> Result<(), ServiceError> {
    let limits = &ctx.settings.limits;
    let bytes = match ctx.storage.get(archive_key).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(path)) => {
            return Err(ServiceError::InvalidInput(format!(
                "archive_key does not reference an uploaded archive: {path}"
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if bytes.len() as u64 > limits.max_archive_bytes {
        return Err(ServiceError::TooLarge(format!(
            "Archive is {} bytes; the maximum is {} bytes.",
            bytes.len(),
            limits.max_archive_bytes
        )));
    }

    match list_entry_names(&bytes) {
        Ok(names) => {
            let photo_entries = names
                .iter()
                .filter(|name| ctx.settings.ingestion.is_photo_entry(name))
                .count();
            if photo_entries > limits.max_photos_per_album {
                return Err(ServiceError::TooLarge(format!(
                    "Archive contains {} photos; the maximum is {}.",
                    photo_entries, limits.max_photos_per_album
                )));
            }
        }
        Err(e) => {
            warn!("Could not enumerate archive {}: {}", archive_key, e);
        }
    }

    Ok(())
}
