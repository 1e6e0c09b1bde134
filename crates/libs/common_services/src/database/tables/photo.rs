use chrono::{DateTime, Utc};
use serde::Serialize;

/// One successfully ingested image. Immutable except for deletion.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Photo {
    pub id: String,
    pub album_id: String,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}
