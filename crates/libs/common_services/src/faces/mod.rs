//! Face embedding extraction behind a trait so the expensive model (or the
//! sidecar speaking for it) is constructed once per process and injected.

mod http_extractor;

pub use http_extractor::*;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("extractor request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("extractor returned status {status}: {text}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        text: String,
    },
}

#[async_trait]
pub trait FaceExtractor: Send + Sync {
    /// Returns one fixed-length embedding per detected face; an image with
    /// no faces yields an empty list.
    async fn extract_faces(&self, image_bytes: &[u8]) -> Result<Vec<Vec<f32>>, ExtractorError>;
}
