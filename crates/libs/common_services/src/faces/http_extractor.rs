use crate::faces::{ExtractorError, FaceExtractor};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct EmbedFacesResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Client for the face embedding sidecar.
pub struct HttpFaceExtractor {
    http_client: Client,
    base_url: String,
}

impl HttpFaceExtractor {
    /// Create the extractor client.
    ///
    /// # Panics
    /// if the HTTP client can't be built.
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FaceExtractor for HttpFaceExtractor {
    async fn extract_faces(&self, image_bytes: &[u8]) -> Result<Vec<Vec<f32>>, ExtractorError> {
        let url = format!("{}/faces/embed", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let parsed: EmbedFacesResponse = response.json().await?;
                Ok(parsed.embeddings)
            }
            status => {
                let text = response.text().await?;
                Err(ExtractorError::UnexpectedStatus { status, text })
            }
        }
    }
}
