use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::Type;

/// One execution attempt of the pipeline, bound to an album. Never mutated
/// once terminal.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: String,
    pub album_id: String,
    pub status: JobStatus,
    /// Blob path of the archive this attempt processes.
    pub zip_path: String,
    pub error: Option<String>,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}
