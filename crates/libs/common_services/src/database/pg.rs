use crate::database::{
    Album, Cluster, DbError, Job, MetadataStore, Photo, PhotoClusterLink,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

/// Postgres-backed metadata store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for PgStore {
    async fn insert_album(&self, album: &Album) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO album (id, fingerprint, status, progress, photo_count, error_message,
                               upload_key, access_code_hash, access_code_hint,
                               access_code_created_at, lease_owner, lease_expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(&album.id)
        .bind(&album.fingerprint)
        .bind(album.status)
        .bind(album.progress)
        .bind(album.photo_count)
        .bind(&album.error_message)
        .bind(&album.upload_key)
        .bind(&album.access_code_hash)
        .bind(&album.access_code_hint)
        .bind(album.access_code_created_at)
        .bind(&album.lease_owner)
        .bind(album.lease_expires_at)
        .bind(album.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_album(&self, album_id: &str) -> Result<Option<Album>, DbError> {
        Ok(sqlx::query_as::<_, Album>("SELECT * FROM album WHERE id = $1")
            .bind(album_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn latest_album_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<Album>, DbError> {
        Ok(sqlx::query_as::<_, Album>(
            "SELECT * FROM album WHERE fingerprint = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn mark_album_processing(
        &self,
        album_id: &str,
        lease_owner: &str,
        lease_expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE album
            SET status = 'processing', error_message = NULL,
                lease_owner = $2, lease_expires_at = $3
            WHERE id = $1 AND status IN ('queued', 'processing')
            ",
        )
        .bind(album_id)
        .bind(lease_owner)
        .bind(lease_expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_album_progress(
        &self,
        album_id: &str,
        progress: i32,
        photo_count: i32,
        lease_owner: &str,
        lease_expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE album
            SET progress = GREATEST(progress, $2), photo_count = $3, lease_expires_at = $5
            WHERE id = $1 AND status = 'processing' AND lease_owner = $4
            ",
        )
        .bind(album_id)
        .bind(progress)
        .bind(photo_count)
        .bind(lease_owner)
        .bind(lease_expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn complete_album(
        &self,
        album_id: &str,
        photo_count: i32,
        lease_owner: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE album
            SET status = 'completed', progress = 100, photo_count = $2,
                lease_owner = NULL, lease_expires_at = NULL
            WHERE id = $1 AND status = 'processing' AND lease_owner = $3
            ",
        )
        .bind(album_id)
        .bind(photo_count)
        .bind(lease_owner)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_album(&self, album_id: &str, error_message: &str) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE album
            SET status = 'failed', error_message = $2,
                lease_owner = NULL, lease_expires_at = NULL
            WHERE id = $1 AND status IN ('queued', 'processing')
            ",
        )
        .bind(album_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn expired_processing_albums(&self, now: DateTime<Utc>) -> Result<Vec<Album>, DbError> {
        Ok(sqlx::query_as::<_, Album>(
            r"
            SELECT * FROM album
            WHERE status = 'processing' AND lease_expires_at IS NOT NULL AND lease_expires_at < $1
            ORDER BY created_at
            ",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_album_row(&self, album_id: &str) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM album WHERE id = $1")
            .bind(album_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_job(&self, job: &Job) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO job (id, album_id, status, zip_path, error, result, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(&job.id)
        .bind(&job.album_id)
        .bind(job.status)
        .bind(&job.zip_path)
        .bind(&job.error)
        .bind(&job.result)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn active_job_for_album(&self, album_id: &str) -> Result<Option<Job>, DbError> {
        Ok(sqlx::query_as::<_, Job>(
            r"
            SELECT * FROM job
            WHERE album_id = $1 AND status IN ('pending', 'processing')
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(album_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn mark_job_processing(&self, job_id: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE job SET status = 'processing' WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn complete_job(&self, job_id: &str, result: Value) -> Result<(), DbError> {
        sqlx::query("UPDATE job SET status = 'completed', result = $2 WHERE id = $1")
            .bind(job_id)
            .bind(result)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fail_job(&self, job_id: &str, error: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE job SET status = 'failed', error = $2 WHERE id = $1")
            .bind(job_id)
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_jobs_for_album(&self, album_id: &str) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM job WHERE album_id = $1")
            .bind(album_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO photo (id, album_id, storage_path, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (storage_path) DO NOTHING
            ",
        )
        .bind(&photo.id)
        .bind(&photo.album_id)
        .bind(&photo.storage_path)
        .bind(photo.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_photos_for_album(&self, album_id: &str) -> Result<Vec<Photo>, DbError> {
        Ok(sqlx::query_as::<_, Photo>(
            "SELECT * FROM photo WHERE album_id = $1 ORDER BY created_at, id",
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_photos_for_cluster(
        &self,
        album_id: &str,
        cluster_id: &str,
    ) -> Result<Vec<Photo>, DbError> {
        Ok(sqlx::query_as::<_, Photo>(
            r"
            SELECT p.*
            FROM photo p
            JOIN photo_cluster_link l ON l.photo_id = p.id
            WHERE l.album_id = $1 AND l.cluster_id = $2
            ORDER BY p.created_at, p.id
            ",
        )
        .bind(album_id)
        .bind(cluster_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_photos_for_album(&self, album_id: &str) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM photo WHERE album_id = $1")
            .bind(album_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_cluster(&self, cluster: &Cluster) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO cluster (id, album_id, thumbnail_url, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&cluster.id)
        .bind(&cluster.album_id)
        .bind(&cluster.thumbnail_url)
        .bind(cluster.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_cluster(
        &self,
        album_id: &str,
        cluster_id: &str,
    ) -> Result<Option<Cluster>, DbError> {
        Ok(sqlx::query_as::<_, Cluster>(
            "SELECT * FROM cluster WHERE album_id = $1 AND id = $2",
        )
        .bind(album_id)
        .bind(cluster_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_clusters_for_album(&self, album_id: &str) -> Result<Vec<Cluster>, DbError> {
        Ok(sqlx::query_as::<_, Cluster>(
            "SELECT * FROM cluster WHERE album_id = $1 ORDER BY created_at, id",
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_link(&self, link: &PhotoClusterLink) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO photo_cluster_link (photo_id, cluster_id, album_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (photo_id, cluster_id) DO NOTHING
            ",
        )
        .bind(&link.photo_id)
        .bind(&link.cluster_id)
        .bind(&link.album_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_links_for_album(&self, album_id: &str) -> Result<i64, DbError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM photo_cluster_link WHERE album_id = $1",
        )
        .bind(album_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_links_for_album(&self, album_id: &str) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM photo_cluster_link WHERE album_id = $1")
            .bind(album_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_clusters_for_album(&self, album_id: &str) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM cluster WHERE album_id = $1")
            .bind(album_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
