use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;

/// One user-submitted photo collection and its processing outcome.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Album {
    pub id: String,
    /// Caller-supplied dedup key; unique among concurrently active albums.
    pub fingerprint: String,
    pub status: AlbumStatus,
    /// 0..=100, non-decreasing within a processing run; 100 only when
    /// status is completed.
    pub progress: i32,
    pub photo_count: i32,
    pub error_message: Option<String>,
    /// Blob path of the source archive.
    pub upload_key: String,
    pub access_code_hash: Option<String>,
    pub access_code_hint: Option<String>,
    pub access_code_created_at: Option<DateTime<Utc>>,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, utoipa::ToSchema)]
#[sqlx(type_name = "album_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlbumStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl AlbumStatus {
    /// Terminal states are never left; a resubmission creates a new album.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }
}
