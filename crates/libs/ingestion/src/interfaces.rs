use chrono::{DateTime, Utc};
use common_services::database::{AlbumStatus, DeletedCounts};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// Caller-supplied deduplication key for the archive.
    pub fingerprint: String,
    /// Blob path of the uploaded archive.
    pub archive_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub album_id: String,
    pub job_id: String,
    /// Present only when a brand-new album was created with access control
    /// enabled; shown exactly once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub album_id: String,
    pub status: AlbumStatus,
    pub progress: i32,
    pub photo_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClusterSummary {
    pub cluster_id: String,
    pub thumbnail_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PhotoSummary {
    pub photo_id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: DeletedCounts,
}

/// Optional recovery-code credential, passed as a query parameter.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AccessQuery {
    pub code: Option<String>,
}
