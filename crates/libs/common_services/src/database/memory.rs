use crate::database::{
    Album, AlbumStatus, Cluster, DbError, Job, JobStatus, MetadataStore, Photo, PhotoClusterLink,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory metadata store used by tests. Mirrors the Postgres store's
/// semantics: monotonic progress, upsert-by-natural-key photos, and
/// deduplicated links.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    albums: HashMap<String, Album>,
    jobs: HashMap<String, Job>,
    photos: HashMap<String, Photo>,
    clusters: HashMap<String, Cluster>,
    links: Vec<PhotoClusterLink>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_by_creation<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, String)) {
    items.sort_by_key(key);
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn insert_album(&self, album: &Album) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        inner.albums.insert(album.id.clone(), album.clone());
        Ok(())
    }

    async fn find_album(&self, album_id: &str) -> Result<Option<Album>, DbError> {
        let inner = self.inner.lock().await;
        Ok(inner.albums.get(album_id).cloned())
    }

    async fn latest_album_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<Album>, DbError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .albums
            .values()
            .filter(|a| a.fingerprint == fingerprint)
            .max_by_key(|a| (a.created_at, a.id.clone()))
            .cloned())
    }

    async fn mark_album_processing(
        &self,
        album_id: &str,
        lease_owner: &str,
        lease_expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        if let Some(album) = inner.albums.get_mut(album_id)
            && album.status.is_active()
        {
            album.status = AlbumStatus::Processing;
            album.error_message = None;
            album.lease_owner = Some(lease_owner.to_string());
            album.lease_expires_at = Some(lease_expires_at);
        }
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
        let mut inner = self.inner.lock().await;
        if let Some(album) = inner.albums.get_mut(album_id)
            && album.status == AlbumStatus::Processing
            && album.lease_owner.as_deref() == Some(lease_owner)
        {
            album.progress = album.progress.max(progress);
            album.photo_count = photo_count;
            album.lease_expires_at = Some(lease_expires_at);
        }
        Ok(())
    }

    async fn complete_album(
        &self,
        album_id: &str,
        photo_count: i32,
        lease_owner: &str,
    ) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        if let Some(album) = inner.albums.get_mut(album_id)
            && album.status == AlbumStatus::Processing
            && album.lease_owner.as_deref() == Some(lease_owner)
        {
            album.status = AlbumStatus::Completed;
            album.progress = 100;
            album.photo_count = photo_count;
            album.lease_owner = None;
            album.lease_expires_at = None;
        }
        Ok(())
    }

    async fn fail_album(&self, album_id: &str, error_message: &str) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        if let Some(album) = inner.albums.get_mut(album_id)
            && album.status.is_active()
        {
            album.status = AlbumStatus::Failed;
            album.error_message = Some(error_message.to_string());
            album.lease_owner = None;
            album.lease_expires_at = None;
        }
        Ok(())
    }

    async fn expired_processing_albums(&self, now: DateTime<Utc>) -> Result<Vec<Album>, DbError> {
        let inner = self.inner.lock().await;
        let mut expired: Vec<Album> = inner
            .albums
            .values()
            .filter(|a| {
                a.status == AlbumStatus::Processing
                    && a.lease_expires_at.is_some_and(|expiry| expiry < now)
            })
            .cloned()
            .collect();
        sort_by_creation(&mut expired, |a| (a.created_at, a.id.clone()));
        Ok(expired)
    }

    async fn delete_album_row(&self, album_id: &str) -> Result<u64, DbError> {
        let mut inner = self.inner.lock().await;
        Ok(u64::from(inner.albums.remove(album_id).is_some()))
    }

    async fn insert_job(&self, job: &Job) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        inner.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn active_job_for_album(&self, album_id: &str) -> Result<Option<Job>, DbError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .values()
            .filter(|j| j.album_id == album_id && j.status.is_active())
            .max_by_key(|j| (j.created_at, j.id.clone()))
            .cloned())
    }

    async fn mark_job_processing(&self, job_id: &str) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.get_mut(job_id) {
            job.status = JobStatus::Processing;
        }
        Ok(())
    }

    async fn complete_job(&self, job_id: &str, result: Value) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.get_mut(job_id) {
            job.status = JobStatus::Completed;
            job.result = Some(result);
        }
        Ok(())
    }

    async fn fail_job(&self, job_id: &str, error: &str) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.get_mut(job_id) {
            job.status = JobStatus::Failed;
            job.error = Some(error.to_string());
        }
        Ok(())
    }

    async fn delete_jobs_for_album(&self, album_id: &str) -> Result<u64, DbError> {
        let mut inner = self.inner.lock().await;
        let before = inner.jobs.len();
        inner.jobs.retain(|_, j| j.album_id != album_id);
        Ok((before - inner.jobs.len()) as u64)
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        let exists = inner
            .photos
            .values()
            .any(|p| p.storage_path == photo.storage_path);
        if !exists {
            inner.photos.insert(photo.id.clone(), photo.clone());
        }
        Ok(())
    }

    async fn list_photos_for_album(&self, album_id: &str) -> Result<Vec<Photo>, DbError> {
        let inner = self.inner.lock().await;
        let mut photos: Vec<Photo> = inner
            .photos
            .values()
            .filter(|p| p.album_id == album_id)
            .cloned()
            .collect();
        sort_by_creation(&mut photos, |p| (p.created_at, p.id.clone()));
        Ok(photos)
    }

    async fn list_photos_for_cluster(
        &self,
        album_id: &str,
        cluster_id: &str,
    ) -> Result<Vec<Photo>, DbError> {
        let inner = self.inner.lock().await;
        let mut photos: Vec<Photo> = inner
            .links
            .iter()
            .filter(|l| l.album_id == album_id && l.cluster_id == cluster_id)
            .filter_map(|l| inner.photos.get(&l.photo_id))
            .cloned()
            .collect();
        sort_by_creation(&mut photos, |p| (p.created_at, p.id.clone()));
        Ok(photos)
    }

    async fn delete_photos_for_album(&self, album_id: &str) -> Result<u64, DbError> {
        let mut inner = self.inner.lock().await;
        let before = inner.photos.len();
        inner.photos.retain(|_, p| p.album_id != album_id);
        Ok((before - inner.photos.len()) as u64)
    }

    async fn insert_cluster(&self, cluster: &Cluster) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        inner.clusters.insert(cluster.id.clone(), cluster.clone());
        Ok(())
    }

    async fn find_cluster(
        &self,
        album_id: &str,
        cluster_id: &str,
    ) -> Result<Option<Cluster>, DbError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .clusters
            .get(cluster_id)
            .filter(|c| c.album_id == album_id)
            .cloned())
    }

    async fn list_clusters_for_album(&self, album_id: &str) -> Result<Vec<Cluster>, DbError> {
        let inner = self.inner.lock().await;
        let mut clusters: Vec<Cluster> = inner
            .clusters
            .values()
            .filter(|c| c.album_id == album_id)
            .cloned()
            .collect();
        sort_by_creation(&mut clusters, |c| (c.created_at, c.id.clone()));
        Ok(clusters)
    }

    async fn insert_link(&self, link: &PhotoClusterLink) -> Result<(), DbError> {
        let mut inner = self.inner.lock().await;
        let exists = inner
            .links
            .iter()
            .any(|l| l.photo_id == link.photo_id && l.cluster_id == link.cluster_id);
        if !exists {
            inner.links.push(link.clone());
        }
        Ok(())
    }

    async fn count_links_for_album(&self, album_id: &str) -> Result<i64, DbError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .links
            .iter()
            .filter(|l| l.album_id == album_id)
            .count() as i64)
    }

    async fn delete_links_for_album(&self, album_id: &str) -> Result<u64, DbError> {
        let mut inner = self.inner.lock().await;
        let before = inner.links.len();
        inner.links.retain(|l| l.album_id != album_id);
        Ok((before - inner.links.len()) as u64)
    }

    async fn delete_clusters_for_album(&self, album_id: &str) -> Result<u64, DbError> {
        let mut inner = self.inner.lock().await;
        let before = inner.clusters.len();
        inner.clusters.retain(|_, c| c.album_id != album_id);
        Ok((before - inner.clusters.len()) as u64)
    }
}
