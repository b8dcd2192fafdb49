//! Hosted image-model backend
//!
//! Calls an OpenAI-compatible `images/generations` endpoint and downloads
//! the returned image URL. The remote model supports a fixed set of square
//! sizes and one image per call.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::ImageModelConfig;
use crate::error::GenerationError;
use crate::generation::{GenerateOptions, GeneratedImage, ImageProvider};

const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

const SUPPORTED_SIZES: [&str; 3] = ["256x256", "512x512", "1024x1024"];
const FALLBACK_SIZE: &str = "1024x1024";

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageRecord>,
}

#[derive(Debug, Deserialize)]
struct ImageRecord {
    url: Option<String>,
}

pub struct ImageModelProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ImageModelProvider {
    pub fn new(config: &ImageModelConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .map_err(GenerationError::Transport)?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

/// Map a requested size onto one the remote model supports.
fn resolve_size(size: &str) -> &'static str {
    SUPPORTED_SIZES
        .iter()
        .find(|s| **s == size)
        .copied()
        .unwrap_or(FALLBACK_SIZE)
}

#[async_trait]
impl ImageProvider for ImageModelProvider {
    fn name(&self) -> &str {
        "image_model"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedImage, GenerationError> {
        let size = resolve_size(&options.size);
        // The remote model renders one image per call.
        let count = options.count.min(1);
        if options.count > 1 {
            tracing::debug!(requested = options.count, "image count clamped to 1");
        }

        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "n": count,
            "size": size,
        });

        let url = format!("{}/v1/images/generations", self.base_url);
        tracing::debug!(url = %url, model = %self.model, size, "requesting hosted image");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        let record = parsed.data.into_iter().next().ok_or(GenerationError::NoImages)?;
        let image_url = record.url.ok_or_else(|| {
            GenerationError::UnexpectedResponse("image record carried no url".to_string())
        })?;

        self.download(&image_url).await
    }
}

impl ImageModelProvider {
    async fn download(&self, url: &str) -> Result<GeneratedImage, GenerationError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: "Failed to download generated image".to_string(),
            });
        }

        let data = response.bytes().await?.to_vec();
        Ok(GeneratedImage::from_bytes(data))
    }
}
