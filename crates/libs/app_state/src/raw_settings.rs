use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct RawSettings {
    pub ingestion: RawIngestionSettings,
    pub storage: RawStorageSettings,
    pub limits: LimitSettings,
    pub api: ApiSettings,
    pub logging: LoggingSettings,
    pub secrets: SecretSettings,
}

/// Controls which archive entries are ingested and how faces are grouped.
#[derive(Debug, Deserialize, Clone)]
pub struct RawIngestionSettings {
    /// Which file extensions are ingested as photos.
    pub photo_extensions: Vec<String>,
    /// Base URL of the face embedding sidecar.
    pub extractor_url: String,
    /// Cosine distance below which two faces count as the same person.
    pub cluster_threshold: f32,
    /// How long a processing lease stays valid without a progress write.
    pub lease_seconds: i64,
    /// How often the reaper sweeps for expired leases.
    pub reaper_interval_seconds: u64,
}

/// Where blobs live on disk and how their public URLs are formed.
#[derive(Debug, Deserialize, Clone)]
pub struct RawStorageSettings {
    pub blob_folder: PathBuf,
    pub public_base_url: String,
}

/// Hard limits enforced before any expensive work starts.
#[derive(Debug, Deserialize, Clone)]
pub struct LimitSettings {
    pub max_archive_bytes: u64,
    pub max_photos_per_album: usize,
    /// Timeout for on-demand network fetches (extractor calls).
    pub fetch_timeout_seconds: u64,
}

/// Configuration for the API server.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub host: String,
    pub port: u32,
    pub allowed_origins: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecretSettings {
    pub database_url: String,
    /// Process-wide salt for recovery code hashing. When unset, new albums
    /// are created open and no recovery code is minted.
    pub access_code_salt: Option<String>,
}
