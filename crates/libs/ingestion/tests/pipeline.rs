//! End-to-end runs of the album pipeline against the in-memory
//! collaborators: submit → ingest → cluster → query → delete.

use app_state::{
    ApiSettings, AppSettings, IngestionSettings, LimitSettings, LoggingSettings, SecretSettings,
    StorageSettings,
};
use async_trait::async_trait;
use common_services::archive::build_archive;
use common_services::database::{Album, AlbumStatus, Job, JobStatus, MemoryStore, MetadataStore};
use common_services::faces::{ExtractorError, FaceExtractor};
use common_services::storage::{MemoryStorage, ObjectStorage};
use ingestion::context::ServiceContext;
use ingestion::controller::submit;
use ingestion::error::ServiceError;
use ingestion::interfaces::{StatusResponse, SubmitRequest};
use ingestion::query::{delete_album, download_cluster, get_status, list_clusters, list_photos};
use ingestion::reaper::sweep_expired_leases;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

const ARCHIVE_KEY: &str = "uploads/test.zip";

fn test_settings(salt: Option<&str>) -> AppSettings {
    AppSettings {
        ingestion: IngestionSettings {
            photo_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            extractor_url: "http://localhost:9500".into(),
            cluster_threshold: 0.35,
            lease_seconds: 300,
            reaper_interval_seconds: 60,
        },
        storage: StorageSettings {
            blob_folder: PathBuf::from("/tmp/unused"),
            public_base_url: "http://localhost:8468/media".into(),
        },
        limits: LimitSettings {
            max_archive_bytes: 10 * 1024 * 1024,
            max_photos_per_album: 100,
            fetch_timeout_seconds: 5,
        },
        api: ApiSettings {
            host: "127.0.0.1".into(),
            port: 8468,
            allowed_origins: vec![],
        },
        logging: LoggingSettings {
            level: "info".into(),
        },
        secrets: SecretSettings {
            database_url: "postgres://unused".into(),
            access_code_salt: salt.map(ToString::to_string),
        },
    }
}

/// Maps exact image bytes to canned embeddings; unknown bytes have no
/// faces, bytes registered via `fail_on` make the extractor error.
#[derive(Default)]
struct StubExtractor {
    embeddings: HashMap<Vec<u8>, Vec<Vec<f32>>>,
    fail_on: Option<Vec<u8>>,
}

#[async_trait]
impl FaceExtractor for StubExtractor {
    async fn extract_faces(&self, image_bytes: &[u8]) -> Result<Vec<Vec<f32>>, ExtractorError> {
        if self.fail_on.as_deref() == Some(image_bytes) {
            return Err(ExtractorError::UnexpectedStatus {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                text: "stub exploded".into(),
            });
        }
        Ok(self.embeddings.get(image_bytes).cloned().unwrap_or_default())
    }
}

/// Blocks every extraction until the test hands out permits, keeping the
/// run in `processing` for as long as needed.
struct GatedExtractor {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl FaceExtractor for GatedExtractor {
    async fn extract_faces(&self, _image_bytes: &[u8]) -> Result<Vec<Vec<f32>>, ExtractorError> {
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(Vec::new())
    }
}

struct Harness {
    ctx: Arc<ServiceContext>,
    store: Arc<MemoryStore>,
    storage: Arc<MemoryStorage>,
}

async fn harness(
    salt: Option<&str>,
    extractor: Arc<dyn FaceExtractor>,
    archive_files: &[(String, Vec<u8>)],
) -> Harness {
    harness_with_settings(test_settings(salt), extractor, archive_files).await
}

async fn harness_with_settings(
    settings: AppSettings,
    extractor: Arc<dyn FaceExtractor>,
    archive_files: &[(String, Vec<u8>)],
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(MemoryStorage::new());
    let archive = build_archive(archive_files).expect("archive builds");
    storage
        .put(ARCHIVE_KEY, &archive, "application/zip")
        .await
        .expect("archive stored");
    let ctx = Arc::new(ServiceContext::new(
        settings,
        store.clone(),
        storage.clone(),
        extractor,
    ));
    Harness {
        ctx,
        store,
        storage,
    }
}

fn submit_request(fingerprint: &str) -> SubmitRequest {
    SubmitRequest {
        fingerprint: fingerprint.to_string(),
        archive_key: ARCHIVE_KEY.to_string(),
    }
}

async fn wait_until_terminal(ctx: &Arc<ServiceContext>, album_id: &str) -> StatusResponse {
    for _ in 0..250 {
        let status = get_status(ctx, album_id).await.expect("status");
        if status.status.is_terminal() {
            return status;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("album {album_id} never reached a terminal state");
}

/// Two photos of one person, one photo of a stranger.
fn three_face_archive() -> Vec<(String, Vec<u8>)> {
    vec![
        ("alice_1.jpg".to_string(), b"image-alice-1".to_vec()),
        ("alice_2.jpg".to_string(), b"image-alice-2".to_vec()),
        ("bob.jpg".to_string(), b"image-bob".to_vec()),
    ]
}

fn three_face_extractor() -> StubExtractor {
    let mut embeddings = HashMap::new();
    embeddings.insert(b"image-alice-1".to_vec(), vec![vec![1.0, 0.0, 0.0]]);
    embeddings.insert(b"image-alice-2".to_vec(), vec![vec![0.98, 0.1, 0.0]]);
    embeddings.insert(b"image-bob".to_vec(), vec![vec![0.0, 1.0, 0.0]]);
    StubExtractor {
        embeddings,
        fail_on: None,
    }
}

#[tokio::test]
async fn empty_submission_fields_are_rejected() {
    let h = harness(None, Arc::new(StubExtractor::default()), &three_face_archive()).await;

    let err = submit(&h.ctx, SubmitRequest {
        fingerprint: "  ".into(),
        archive_key: ARCHIVE_KEY.into(),
    })
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = submit(&h.ctx, SubmitRequest {
        fingerprint: "f1".into(),
        archive_key: String::new(),
    })
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    assert!(h.store.latest_album_by_fingerprint("f1").await.unwrap().is_none());
}

#[tokio::test]
async fn three_images_two_people_yield_two_clusters() {
    let h = harness(None, Arc::new(three_face_extractor()), &three_face_archive()).await;

    let submitted = submit(&h.ctx, submit_request("f1")).await.unwrap();
    let status = wait_until_terminal(&h.ctx, &submitted.album_id).await;

    assert_eq!(status.status, AlbumStatus::Completed);
    assert_eq!(status.progress, 100);
    assert_eq!(status.photo_count, 3);
    assert_eq!(status.error_message, None);

    let clusters = list_clusters(&h.ctx, &submitted.album_id, None).await.unwrap();
    assert_eq!(clusters.len(), 2);

    let mut sizes = Vec::new();
    for cluster in &clusters {
        let photos = list_photos(&h.ctx, &submitted.album_id, &cluster.cluster_id, None)
            .await
            .unwrap();
        for photo in &photos {
            assert!(photo.url.starts_with("memory://"));
        }
        sizes.push(photos.len());
    }
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 2]);

    // Total linked photos never exceed the album's photo count.
    let links = h.store.count_links_for_album(&submitted.album_id).await.unwrap();
    assert!(links <= i64::from(status.photo_count));
}

#[tokio::test]
async fn photos_with_no_faces_complete_with_zero_clusters() {
    let h = harness(None, Arc::new(StubExtractor::default()), &three_face_archive()).await;

    let submitted = submit(&h.ctx, submit_request("f1")).await.unwrap();
    let status = wait_until_terminal(&h.ctx, &submitted.album_id).await;

    assert_eq!(status.status, AlbumStatus::Completed);
    assert_eq!(status.photo_count, 3);
    let clusters = list_clusters(&h.ctx, &submitted.album_id, None).await.unwrap();
    assert!(clusters.is_empty());
}

#[tokio::test]
async fn archive_without_supported_images_fails_the_run() {
    let files = vec![("notes.txt".to_string(), b"not a photo".to_vec())];
    let h = harness(None, Arc::new(StubExtractor::default()), &files).await;

    let submitted = submit(&h.ctx, submit_request("f1")).await.unwrap();
    let status = wait_until_terminal(&h.ctx, &submitted.album_id).await;

    assert_eq!(status.status, AlbumStatus::Failed);
    let message = status.error_message.expect("failure message recorded");
    assert!(message.contains("no supported images"));
    // Progress stays at its last written value instead of resetting.
    assert!(status.progress < 100);
}

#[tokio::test]
async fn over_limit_archives_are_rejected_before_any_album_exists() {
    let mut settings = test_settings(None);
    settings.limits.max_photos_per_album = 2;
    let h = harness_with_settings(
        settings,
        Arc::new(StubExtractor::default()),
        &three_face_archive(),
    )
    .await;

    let err = submit(&h.ctx, submit_request("f1")).await.unwrap_err();
    assert!(matches!(err, ServiceError::TooLarge(_)));
    assert!(h.store.latest_album_by_fingerprint("f1").await.unwrap().is_none());
}

#[tokio::test]
async fn oversized_archives_are_rejected_synchronously() {
    let mut settings = test_settings(None);
    settings.limits.max_archive_bytes = 8;
    let h = harness_with_settings(
        settings,
        Arc::new(StubExtractor::default()),
        &three_face_archive(),
    )
    .await;

    let err = submit(&h.ctx, submit_request("f1")).await.unwrap_err();
    assert!(matches!(err, ServiceError::TooLarge(_)));
}

#[tokio::test]
async fn resubmission_while_active_reuses_album_and_job() {
    let gate = Arc::new(Semaphore::new(0));
    let extractor = Arc::new(GatedExtractor { gate: gate.clone() });
    let h = harness(Some("test-salt"), extractor, &three_face_archive()).await;

    let first = submit(&h.ctx, submit_request("f1")).await.unwrap();
    assert!(first.recovery_code.is_some());

    // The run is parked inside the extractor, so the album stays active.
    let second = submit(&h.ctx, submit_request("f1")).await.unwrap();
    assert_eq!(second.album_id, first.album_id);
    assert_eq!(second.job_id, first.job_id);
    assert!(second.recovery_code.is_none(), "no second code is minted");

    gate.add_permits(16);
    let status = wait_until_terminal(&h.ctx, &first.album_id).await;
    assert_eq!(status.status, AlbumStatus::Completed);
}

#[tokio::test]
async fn resubmission_after_a_terminal_run_creates_a_fresh_album() {
    let files = vec![("notes.txt".to_string(), b"not a photo".to_vec())];
    let h = harness(None, Arc::new(StubExtractor::default()), &files).await;

    let first = submit(&h.ctx, submit_request("f1")).await.unwrap();
    let status = wait_until_terminal(&h.ctx, &first.album_id).await;
    assert_eq!(status.status, AlbumStatus::Failed);

    let second = submit(&h.ctx, submit_request("f1")).await.unwrap();
    assert_ne!(second.album_id, first.album_id);
}

#[tokio::test]
async fn one_broken_image_does_not_fail_the_album() {
    let mut extractor = three_face_extractor();
    extractor.fail_on = Some(b"image-bob".to_vec());
    let h = harness(None, Arc::new(extractor), &three_face_archive()).await;

    let submitted = submit(&h.ctx, submit_request("f1")).await.unwrap();
    let status = wait_until_terminal(&h.ctx, &submitted.album_id).await;

    // Bob's photo is still ingested; only his faces are missing.
    assert_eq!(status.status, AlbumStatus::Completed);
    assert_eq!(status.photo_count, 3);
    let clusters = list_clusters(&h.ctx, &submitted.album_id, None).await.unwrap();
    assert_eq!(clusters.len(), 1);
    let photos = list_photos(&h.ctx, &submitted.album_id, &clusters[0].cluster_id, None)
        .await
        .unwrap();
    assert_eq!(photos.len(), 2);
}

#[tokio::test]
async fn status_polls_never_see_not_found() {
    let h = harness(None, Arc::new(StubExtractor::default()), &three_face_archive()).await;
    let status = get_status(&h.ctx, "not-yet-visible").await.unwrap();
    assert_eq!(status.status, AlbumStatus::Queued);
    assert_eq!(status.progress, 0);
    assert_eq!(status.photo_count, 0);
}

#[tokio::test]
async fn protected_albums_require_the_recovery_code() {
    let h = harness(
        Some("test-salt"),
        Arc::new(three_face_extractor()),
        &three_face_archive(),
    )
    .await;

    let submitted = submit(&h.ctx, submit_request("f1")).await.unwrap();
    let code = submitted.recovery_code.expect("code minted");
    wait_until_terminal(&h.ctx, &submitted.album_id).await;

    let album_id = submitted.album_id.as_str();
    assert!(matches!(
        list_clusters(&h.ctx, album_id, None).await,
        Err(ServiceError::Unauthorized { .. })
    ));
    assert!(matches!(
        list_clusters(&h.ctx, album_id, Some("AAAA-BBBB-CCCC")).await,
        Err(ServiceError::Unauthorized { .. })
    ));

    // Sloppy formatting of the right code is fine.
    let sloppy = code.to_lowercase().replace('-', " ");
    let clusters = list_clusters(&h.ctx, album_id, Some(&sloppy)).await.unwrap();
    assert_eq!(clusters.len(), 2);

    let cluster_id = clusters[0].cluster_id.as_str();
    assert!(matches!(
        list_photos(&h.ctx, album_id, cluster_id, None).await,
        Err(ServiceError::Unauthorized { .. })
    ));
    assert!(matches!(
        download_cluster(&h.ctx, album_id, cluster_id, None).await,
        Err(ServiceError::Unauthorized { .. })
    ));
    assert!(matches!(
        delete_album(&h.ctx, album_id, Some("wrong")).await,
        Err(ServiceError::Unauthorized { .. })
    ));

    assert!(download_cluster(&h.ctx, album_id, cluster_id, Some(&code)).await.is_ok());
    assert!(delete_album(&h.ctx, album_id, Some(&code)).await.is_ok());
}

#[tokio::test]
async fn unauthorized_errors_reveal_the_hint_but_never_the_hash() {
    let h = harness(
        Some("test-salt"),
        Arc::new(three_face_extractor()),
        &three_face_archive(),
    )
    .await;
    let submitted = submit(&h.ctx, submit_request("f1")).await.unwrap();
    wait_until_terminal(&h.ctx, &submitted.album_id).await;

    let album = h.store.find_album(&submitted.album_id).await.unwrap().unwrap();
    let Err(ServiceError::Unauthorized { hint }) =
        list_clusters(&h.ctx, &submitted.album_id, None).await
    else {
        panic!("expected an authorization failure");
    };
    assert_eq!(hint, album.access_code_hint);
    let code = submitted.recovery_code.unwrap();
    assert!(code.ends_with(hint.as_deref().unwrap()));
}

#[tokio::test]
async fn cluster_download_bundles_the_linked_photos() {
    let h = harness(None, Arc::new(three_face_extractor()), &three_face_archive()).await;
    let submitted = submit(&h.ctx, submit_request("f1")).await.unwrap();
    wait_until_terminal(&h.ctx, &submitted.album_id).await;

    let clusters = list_clusters(&h.ctx, &submitted.album_id, None).await.unwrap();
    let pair_cluster = {
        let mut found = None;
        for cluster in &clusters {
            let photos = list_photos(&h.ctx, &submitted.album_id, &cluster.cluster_id, None)
                .await
                .unwrap();
            if photos.len() == 2 {
                found = Some(cluster.cluster_id.clone());
            }
        }
        found.expect("one cluster holds two photos")
    };

    let bytes = download_cluster(&h.ctx, &submitted.album_id, &pair_cluster, None)
        .await
        .unwrap();
    let names = common_services::archive::list_entry_names(&bytes).unwrap();
    assert_eq!(names.len(), 2);

    assert!(matches!(
        download_cluster(&h.ctx, &submitted.album_id, "no-such-cluster", None).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn the_reaper_fails_runs_with_expired_leases() {
    let h = harness(None, Arc::new(StubExtractor::default()), &three_face_archive()).await;

    // A run from a worker that died mid-flight, its lease long expired.
    let now = chrono::Utc::now();
    h.store
        .insert_album(&Album {
            id: "stalled".into(),
            fingerprint: "f1".into(),
            status: AlbumStatus::Processing,
            progress: 40,
            photo_count: 2,
            error_message: None,
            upload_key: ARCHIVE_KEY.into(),
            access_code_hash: None,
            access_code_hint: None,
            access_code_created_at: None,
            lease_owner: Some("w-dead".into()),
            lease_expires_at: Some(now - chrono::Duration::minutes(10)),
            created_at: now,
        })
        .await
        .unwrap();
    h.store
        .insert_job(&Job {
            id: "j1".into(),
            album_id: "stalled".into(),
            status: JobStatus::Processing,
            zip_path: ARCHIVE_KEY.into(),
            error: None,
            result: None,
            created_at: now,
        })
        .await
        .unwrap();

    let reaped = sweep_expired_leases(&h.ctx).await.unwrap();
    assert_eq!(reaped, 1);

    let album = h.store.find_album("stalled").await.unwrap().unwrap();
    assert_eq!(album.status, AlbumStatus::Failed);
    assert!(album.error_message.unwrap().contains("lease expired"));
    // Progress keeps its last written value.
    assert_eq!(album.progress, 40);
    assert!(h.store.active_job_for_album("stalled").await.unwrap().is_none());

    // A second sweep finds nothing left to reap.
    assert_eq!(sweep_expired_leases(&h.ctx).await.unwrap(), 0);
}

#[tokio::test]
async fn a_reaped_run_cannot_complete_its_album() {
    let gate = Arc::new(Semaphore::new(0));
    let extractor = Arc::new(GatedExtractor { gate: gate.clone() });
    let h = harness(None, extractor, &three_face_archive()).await;

    let submitted = submit(&h.ctx, submit_request("f1")).await.unwrap();

    // Wait for the run to take its lease, then fail the album out from
    // under it, as the reaper would for an expired lease.
    for _ in 0..250 {
        let album = h.store.find_album(&submitted.album_id).await.unwrap();
        if album.is_some_and(|a| a.status == AlbumStatus::Processing) {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    h.store
        .fail_album(&submitted.album_id, "lease expired")
        .await
        .unwrap();

    // Release the run; its late writes must not leave the failed state.
    gate.add_permits(16);
    sleep(Duration::from_millis(200)).await;

    let album = h.store.find_album(&submitted.album_id).await.unwrap().unwrap();
    assert_eq!(album.status, AlbumStatus::Failed);
    assert_eq!(album.error_message.as_deref(), Some("lease expired"));
}

#[tokio::test]
async fn deleting_an_album_cascades_and_clears_storage() {
    let h = harness(None, Arc::new(three_face_extractor()), &three_face_archive()).await;
    let submitted = submit(&h.ctx, submit_request("f1")).await.unwrap();
    wait_until_terminal(&h.ctx, &submitted.album_id).await;

    let counts = delete_album(&h.ctx, &submitted.album_id, None).await.unwrap();
    assert_eq!(counts.albums, 1);
    assert_eq!(counts.photos, 3);
    assert_eq!(counts.clusters, 2);
    assert_eq!(counts.links, 3);
    assert_eq!(counts.jobs, 1);

    assert!(h.storage.is_empty().await, "all blobs are deleted");
    assert!(matches!(
        list_clusters(&h.ctx, &submitted.album_id, None).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        delete_album(&h.ctx, &submitted.album_id, None).await,
        Err(ServiceError::NotFound(_))
    ));
}
