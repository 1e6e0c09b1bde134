use crate::database::{Album, Cluster, DbError, Job, Photo, PhotoClusterLink};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Deleted row counts returned by the album cascade delete.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema,
)]
pub struct DeletedCounts {
    pub links: u64,
    pub clusters: u64,
    pub photos: u64,
    pub jobs: u64,
    pub albums: u64,
}

/// The relational metadata store contract the pipeline and queries run
/// against. Implemented by Postgres for production and in memory for tests.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // --- albums ---

    async fn insert_album(&self, album: &Album) -> Result<(), DbError>;

    async fn find_album(&self, album_id: &str) -> Result<Option<Album>, DbError>;

    /// Most recently created album with this fingerprint, regardless of
    /// status.
    async fn latest_album_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<Album>, DbError>;

    /// Marks an album processing, clears any prior error, and takes a
    /// lease for the owning run. A no-op on terminal albums.
    async fn mark_album_processing(
        &self,
        album_id: &str,
        lease_owner: &str,
        lease_expires_at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    /// Writes progress and photo count, refreshing the lease. Progress is
    /// clamped monotonic: a smaller value never overwrites a larger one.
    /// Applies only while the album is processing and the lease is still
    /// held by `lease_owner`; a reaped run's late writes are no-ops.
    async fn update_album_progress(
        &self,
        album_id: &str,
        progress: i32,
        photo_count: i32,
        lease_owner: &str,
        lease_expires_at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    /// Terminal success: status completed, progress 100, lease released.
    /// Applies only while the album is processing and the lease is still
    /// held by `lease_owner`, so a reaped run can't resurrect a failed
    /// album.
    async fn complete_album(
        &self,
        album_id: &str,
        photo_count: i32,
        lease_owner: &str,
    ) -> Result<(), DbError>;

    /// Terminal failure: status failed, error recorded, progress left at
    /// its last written value, lease released. A no-op on albums already
    /// in a terminal state.
    async fn fail_album(&self, album_id: &str, error_message: &str) -> Result<(), DbError>;

    /// Processing albums whose lease expired before `now`.
    async fn expired_processing_albums(&self, now: DateTime<Utc>) -> Result<Vec<Album>, DbError>;

    async fn delete_album_row(&self, album_id: &str) -> Result<u64, DbError>;

    // --- jobs ---

    async fn insert_job(&self, job: &Job) -> Result<(), DbError>;

    /// The pending/processing job for an album, if any. At most one exists.
    async fn active_job_for_album(&self, album_id: &str) -> Result<Option<Job>, DbError>;

    async fn mark_job_processing(&self, job_id: &str) -> Result<(), DbError>;

    async fn complete_job(&self, job_id: &str, result: Value) -> Result<(), DbError>;

    async fn fail_job(&self, job_id: &str, error: &str) -> Result<(), DbError>;

    async fn delete_jobs_for_album(&self, album_id: &str) -> Result<u64, DbError>;

    // --- photos ---

    /// Idempotent on retry: a photo with an already-stored `storage_path`
    /// is left untouched.
    async fn insert_photo(&self, photo: &Photo) -> Result<(), DbError>;

    async fn list_photos_for_album(&self, album_id: &str) -> Result<Vec<Photo>, DbError>;

    async fn list_photos_for_cluster(
        &self,
        album_id: &str,
        cluster_id: &str,
    ) -> Result<Vec<Photo>, DbError>;

    async fn delete_photos_for_album(&self, album_id: &str) -> Result<u64, DbError>;

    // --- clusters and links ---

    async fn insert_cluster(&self, cluster: &Cluster) -> Result<(), DbError>;

    async fn find_cluster(
        &self,
        album_id: &str,
        cluster_id: &str,
    ) -> Result<Option<Cluster>, DbError>;

    async fn list_clusters_for_album(&self, album_id: &str) -> Result<Vec<Cluster>, DbError>;

    /// Idempotent: repeated (photo, cluster) pairs collapse to one link.
    async fn insert_link(&self, link: &PhotoClusterLink) -> Result<(), DbError>;

    async fn count_links_for_album(&self, album_id: &str) -> Result<i64, DbError>;

    async fn delete_links_for_album(&self, album_id: &str) -> Result<u64, DbError>;

    async fn delete_clusters_for_album(&self, album_id: &str) -> Result<u64, DbError>;
}
