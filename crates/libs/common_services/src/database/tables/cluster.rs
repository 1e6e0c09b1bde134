use chrono::{DateTime, Utc};
use serde::Serialize;

/// One inferred identity group within an album. Created during clustering,
/// never mutated.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Cluster {
    pub id: String,
    pub album_id: String,
    pub thumbnail_url: String,
    pub created_at: DateTime<Utc>,
}

/// Many-to-many link between photos and clusters; (photo_id, cluster_id)
/// is unique.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PhotoClusterLink {
    pub photo_id: String,
    pub cluster_id: String,
    pub album_id: String,
}
