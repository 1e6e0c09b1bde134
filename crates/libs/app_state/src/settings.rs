use crate::{
    ApiSettings, LimitSettings, LoggingSettings, RawIngestionSettings, RawSettings, SecretSettings,
};
use serde::Deserialize;
use std::path::{Path, PathBuf, absolute};

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub ingestion: IngestionSettings,
    pub storage: StorageSettings,
    pub limits: LimitSettings,
    pub api: ApiSettings,
    pub logging: LoggingSettings,
    pub secrets: SecretSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionSettings {
    pub photo_extensions: Vec<String>,
    pub extractor_url: String,
    pub cluster_threshold: f32,
    pub lease_seconds: i64,
    pub reaper_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub blob_folder: PathBuf,
    pub public_base_url: String,
}

impl From<RawSettings> for AppSettings {
    fn from(raw: RawSettings) -> Self {
        let blob_root = absolute(&raw.storage.blob_folder).expect("Invalid blob_folder");
        Self {
            ingestion: IngestionSettings::from(raw.ingestion),
            storage: StorageSettings {
                blob_folder: blob_root,
                public_base_url: raw.storage.public_base_url,
            },
            limits: raw.limits,
            api: raw.api,
            logging: raw.logging,
            secrets: raw.secrets,
        }
    }
}

impl From<RawIngestionSettings> for IngestionSettings {
    fn from(raw: RawIngestionSettings) -> Self {
        Self {
            photo_extensions: raw
                .photo_extensions
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            extractor_url: raw.extractor_url,
            cluster_threshold: raw.cluster_threshold,
            lease_seconds: raw.lease_seconds,
            reaper_interval_seconds: raw.reaper_interval_seconds,
        }
    }
}

impl IngestionSettings {
    /// Whether an archive entry name has a supported photo extension.
    #[must_use]
    pub fn is_photo_entry(&self, name: &str) -> bool {
        let Some(extension) = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
        else {
            return false;
        };
        self.photo_extensions.contains(&extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> IngestionSettings {
        IngestionSettings {
            photo_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            extractor_url: "http://localhost:9500".into(),
            cluster_threshold: 0.35,
            lease_seconds: 120,
            reaper_interval_seconds: 60,
        }
    }

    #[test]
    fn detects_supported_photo_entries() {
        let settings = settings();
        assert!(settings.is_photo_entry("holiday/IMG_0001.JPG"));
        assert!(settings.is_photo_entry("portrait.png"));
        assert!(!settings.is_photo_entry("notes.txt"));
        assert!(!settings.is_photo_entry("no_extension"));
    }
}
