//! The asynchronous ingestion run: archive → photos → embeddings →
//! clusters. One spawned task per job; never interleaved with another run
//! of the same album.

use crate::clustering::{FaceSample, assign_clusters, normalize};
use crate::context::ServiceContext;
use chrono::{Duration, Utc};
use color_eyre::eyre::{Result, WrapErr, eyre};
use common_services::archive::{ArchiveEntry, extract_entries};
use common_services::database::{Cluster, Photo, PhotoClusterLink};
use common_services::nice_id;
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

const PROGRESS_STARTED: i32 = 5;
const PROGRESS_ARCHIVE_READ: i32 = 10;
const PROGRESS_INGEST_END: i32 = 80;
const PROGRESS_CLUSTERING: i32 = 85;
const PROGRESS_PERSISTED: i32 = 95;

const CLUSTER_ID_LEN: usize = 16;
const PHOTO_ID_LEN: usize = 16;

/// Entry point spawned by the controller. Any unhandled error marks the
/// album and job failed; rows committed before the failure are kept.
pub async fn run_pipeline(ctx: Arc<ServiceContext>, album_id: String, job_id: String) {
    if let Err(report) = run(&ctx, &album_id, &job_id).await {
        let message = format!("{report:#}");
        error!("Pipeline run for album {} failed: {}", album_id, message);
        if let Err(e) = ctx.store.fail_album(&album_id, &message).await {
            error!("Could not record failure on album {}: {}", album_id, e);
        }
        if let Err(e) = ctx.store.fail_job(&job_id, &message).await {
            error!("Could not record failure on job {}: {}", job_id, e);
        }
    }
}

/// One successfully ingested image and whatever faces it contained.
struct IngestedImage {
    photo_id: String,
    embeddings: Vec<Vec<f32>>,
}

async fn run(ctx: &Arc<ServiceContext>, album_id: &str, job_id: &str) -> Result<()> {
    let store = &ctx.store;
    let album = store
        .find_album(album_id)
        .await?
        .ok_or_else(|| eyre!("album {album_id} does not exist"))?;

    store
        .mark_album_processing(album_id, &ctx.worker_id, lease_expiry(ctx))
        .await?;
    store.mark_job_processing(job_id).await?;
    store
        .update_album_progress(album_id, PROGRESS_STARTED, 0, &ctx.worker_id, lease_expiry(ctx))
        .await?;

    let archive_bytes = ctx
        .storage
        .get(&album.upload_key)
        .await
        .wrap_err("could not fetch the uploaded archive")?;
    if archive_bytes.is_empty() {
        return Err(eyre!("the uploaded archive is empty"));
    }

    let entries = extract_entries(&archive_bytes).wrap_err("could not read the archive")?;
    let images: Vec<ArchiveEntry> = entries
        .into_iter()
        .filter(|entry| ctx.settings.ingestion.is_photo_entry(&entry.name))
        .collect();
    if images.is_empty() {
        return Err(eyre!("the archive contains no supported images"));
    }
    store
        .update_album_progress(
            album_id,
            PROGRESS_ARCHIVE_READ,
            0,
            &ctx.worker_id,
            lease_expiry(ctx),
        )
        .await?;

    info!("Ingesting {} images for album {}", images.len(), album_id);

    let mut photo_count = 0;
    let mut samples: Vec<FaceSample> = Vec::new();
    let total = images.len();
    for (index, entry) in images.iter().enumerate() {
        // One bad image never fails the whole album.
        match ingest_image(ctx, album_id, index, entry).await {
            Ok(image) => {
                photo_count += 1;
                for mut embedding in image.embeddings {
                    normalize(&mut embedding);
                    samples.push(FaceSample {
                        photo_id: image.photo_id.clone(),
                        embedding,
                    });
                }
            }
            Err(e) => {
                warn!("Skipping image {:?} in album {}: {:#}", entry.name, album_id, e);
            }
        }
        let span = PROGRESS_INGEST_END - PROGRESS_ARCHIVE_READ;
        let progress = PROGRESS_ARCHIVE_READ + (span * (index as i32 + 1)) / total as i32;
        store
            .update_album_progress(
                album_id,
                progress,
                photo_count,
                &ctx.worker_id,
                lease_expiry(ctx),
            )
            .await?;
    }

    store
        .update_album_progress(
            album_id,
            PROGRESS_CLUSTERING,
            photo_count,
            &ctx.worker_id,
            lease_expiry(ctx),
        )
        .await?;

    let cluster_count = if samples.is_empty() {
        // Zero faces across the album is a valid outcome, not a failure.
        info!("No faces detected in album {}", album_id);
        0
    } else {
        let groups = assign_clusters(&samples, ctx.settings.ingestion.cluster_threshold)?;
        persist_clusters(ctx, album_id, &samples, &groups).await?
    };

    store
        .update_album_progress(
            album_id,
            PROGRESS_PERSISTED,
            photo_count,
            &ctx.worker_id,
            lease_expiry(ctx),
        )
        .await?;

    store
        .complete_album(album_id, photo_count, &ctx.worker_id)
        .await?;
    store
        .complete_job(
            job_id,
            json!({
                "photos": photo_count,
                "faces": samples.len(),
                "clusters": cluster_count,
            }),
        )
        .await?;
    info!(
        "Album {} completed: {} photos, {} faces, {} clusters",
        album_id,
        photo_count,
        samples.len(),
        cluster_count
    );
    Ok(())
}

/// Persists one image: blob, photo row, then face extraction. Extraction
/// failures degrade to an ingested photo with zero faces.
async fn ingest_image(
    ctx: &Arc<ServiceContext>,
    album_id: &str,
    index: usize,
    entry: &ArchiveEntry,
) -> Result<IngestedImage> {
    let extension = Path::new(&entry.name)
        .extension()
        .map_or_else(|| "jpg".to_string(), |e| e.to_string_lossy().to_lowercase());
    // Deterministic path, so a retried run upserts instead of duplicating.
    let storage_path = format!("albums/{album_id}/photos/{index:04}.{extension}");
    let content_type = mime_guess::from_path(&entry.name)
        .first_or_octet_stream()
        .to_string();

    ctx.storage
        .put(&storage_path, &entry.bytes, &content_type)
        .await
        .wrap_err("could not store the image blob")?;

    let photo = Photo {
        id: nice_id(PHOTO_ID_LEN),
        album_id: album_id.to_string(),
        storage_path: storage_path.clone(),
        created_at: Utc::now(),
    };
    ctx.store.insert_photo(&photo).await?;

    let embeddings = match ctx.extractor.extract_faces(&entry.bytes).await {
        Ok(embeddings) => embeddings,
        Err(e) => {
            warn!(
                "Face extraction failed for {:?}; keeping the photo with no faces: {}",
                entry.name, e
            );
            Vec::new()
        }
    };

    Ok(IngestedImage {
        photo_id: photo.id,
        embeddings,
    })
}

/// Writes one cluster per group plus deduplicated photo links. The
/// thumbnail is the public URL of the group's first photo.
async fn persist_clusters(
    ctx: &Arc<ServiceContext>,
    album_id: &str,
    samples: &[FaceSample],
    groups: &[Vec<usize>],
) -> Result<usize> {
    let photos = ctx.store.list_photos_for_album(album_id).await?;
    for group in groups {
        let first = group
            .first()
            .ok_or_else(|| eyre!("clustering produced an empty group"))?;
        let thumbnail_photo_id = &samples[*first].photo_id;
        let thumbnail_url = photos
            .iter()
            .find(|p| &p.id == thumbnail_photo_id)
            .map(|p| ctx.storage.public_url(&p.storage_path))
            .ok_or_else(|| eyre!("cluster thumbnail photo is missing"))?;

        let cluster = Cluster {
            id: nice_id(CLUSTER_ID_LEN),
            album_id: album_id.to_string(),
            thumbnail_url,
            created_at: Utc::now(),
        };
        ctx.store.insert_cluster(&cluster).await?;

        // A photo with several faces in one cluster links once.
        let mut linked: HashSet<&str> = HashSet::new();
        for &sample_index in group {
            let photo_id = samples[sample_index].photo_id.as_str();
            if linked.insert(photo_id) {
                ctx.store
                    .insert_link(&PhotoClusterLink {
                        photo_id: photo_id.to_string(),
                        cluster_id: cluster.id.clone(),
                        album_id: album_id.to_string(),
                    })
                    .await?;
            }
        }
    }
    Ok(groups.len())
}

fn lease_expiry(ctx: &Arc<ServiceContext>) -> chrono::DateTime<Utc> {
    Utc::now() + Duration::seconds(ctx.settings.ingestion.lease_seconds)
}
