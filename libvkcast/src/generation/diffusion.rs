//! Local Stable Diffusion backend
//!
//! Talks to an Automatic1111-compatible server over its `txt2img` route.
//! Image synthesis is slow, so this provider's client carries a much longer
//! timeout than the rest of the library.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::DiffusionConfig;
use crate::error::GenerationError;
use crate::generation::{parse_size, GenerateOptions, GeneratedImage, ImageProvider};

/// Synthesis can take minutes on CPU-bound servers.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

const NEGATIVE_PROMPT: &str = "blurry, low quality, cartoon, anime, ugly, bad anatomy";
const SAMPLER: &str = "DPM++ 2M Karras";
const CFG_SCALE: u32 = 7;

/// Sampling steps for `"standard"` quality; anything else gets the higher
/// step count.
const STANDARD_STEPS: u32 = 20;
const HIGH_STEPS: u32 = 30;

pub struct DiffusionProvider {
    http: reqwest::Client,
    endpoint: String,
}

impl DiffusionProvider {
    pub fn new(config: &DiffusionConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .map_err(GenerationError::Transport)?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

/// Build the txt2img request payload.
///
/// The negative prompt and sampler policy are fixed; size and quality come
/// from the options.
fn txt2img_payload(prompt: &str, options: &GenerateOptions) -> Result<Value, GenerationError> {
    let (width, height) = parse_size(&options.size)?;
    let steps = if options.quality == "standard" {
        STANDARD_STEPS
    } else {
        HIGH_STEPS
    };

    Ok(json!({
        "prompt": prompt,
        "negative_prompt": NEGATIVE_PROMPT,
        "width": width,
        "height": height,
        "steps": steps,
        "cfg_scale": CFG_SCALE,
        "sampler_name": SAMPLER,
        "seed": -1,
        "batch_size": options.count,
    }))
}

#[async_trait]
impl ImageProvider for DiffusionProvider {
    fn name(&self) -> &str {
        "diffusion"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedImage, GenerationError> {
        let payload = txt2img_payload(prompt, options)?;
        let url = format!("{}/sdapi/v1/txt2img", self.endpoint);

        tracing::debug!(url = %url, size = %options.size, "requesting diffusion render");

        let response = self.http.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        let encoded = result
            .get("images")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .and_then(Value::as_str)
            .ok_or(GenerationError::NoImages)?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        Ok(GeneratedImage::from_bytes(data))
    }
}
