//! Image generation providers and orchestration
//!
//! This module provides a unified trait for the interchangeable image
//! backends: a local diffusion server, a hosted image model, and a hosted
//! image model fronted by a prompt-rewriting chat call. The active provider
//! is chosen once, at construction, from [`GenerationConfig`]; there is no
//! runtime switching.
//!
//! Unlike the VK client, generation failures are raised as
//! [`GenerationError`] rather than folded into a result object. The
//! boundary layer that owns the uniform return contract wraps them there.
//!
//! # Examples
//!
//! ```no_run
//! use libvkcast::config::{DiffusionConfig, GenerationConfig};
//! use libvkcast::generation::{GenerateOptions, ImageGenerator};
//!
//! # async fn example() -> libvkcast::Result<()> {
//! let config = GenerationConfig::Diffusion(DiffusionConfig {
//!     endpoint: "http://127.0.0.1:7860".to_string(),
//! });
//! let generator = ImageGenerator::from_config(&config)?;
//!
//! let image = generator
//!     .generate("a glass vial on a mossy cliff edge", &GenerateOptions::default())
//!     .await?;
//! println!("{} bytes of {}", image.data.len(), image.format);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::types::ImageFormat;

pub mod diffusion;
pub mod enhanced;
pub mod image_model;

// Mock provider is available for all builds (not just tests) to support
// integration tests.
pub mod mock;

pub use diffusion::DiffusionProvider;
pub use enhanced::{ChatPromptEnhancer, EnhancedChatProvider, PromptEnhancer};
pub use image_model::ImageModelProvider;
pub use mock::{MockImageProvider, MockPromptEnhancer};

/// Knobs shared by every provider. Providers interpret `size` and `quality`
/// in their own terms and may clamp `count`.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Requested dimensions as `<width>x<height>`.
    pub size: String,
    /// `"standard"` or anything else for a higher-effort render.
    pub quality: String,
    /// Number of images to synthesize in one call.
    pub count: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
            count: 1,
        }
    }
}

impl GenerateOptions {
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// A generated raster image: raw bytes plus the sniffed container format.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

impl GeneratedImage {
    /// Wrap raw bytes, detecting the format from magic bytes. Providers that
    /// return unrecognizable data get PNG, the format every backend here
    /// defaults to.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or(ImageFormat::Png);
        Self { data, format }
    }

    /// Write the image bytes to the given path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GenerationError> {
        std::fs::write(path.as_ref(), &self.data)?;
        Ok(())
    }
}

/// Image generation backend trait
///
/// Each implementation turns a text prompt into one raster image. All
/// implementations are stateless across calls apart from configuration
/// captured at construction, so a provider can serve independent requests
/// concurrently.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Lowercase identifier for the backend (e.g. "diffusion").
    fn name(&self) -> &str;

    /// Generate an image from the prompt.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] describing the failing call. Errors are
    /// never retried here.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedImage, GenerationError>;
}

/// Orchestrator owning the active provider.
pub struct ImageGenerator {
    provider: Box<dyn ImageProvider>,
}

impl ImageGenerator {
    /// Build the provider selected by the configuration.
    ///
    /// Validates the active variant's fields; a missing field is a
    /// configuration error raised here, not a runtime failure later.
    pub fn from_config(config: &GenerationConfig) -> crate::Result<Self> {
        config.validate()?;

        let provider: Box<dyn ImageProvider> = match config {
            GenerationConfig::Diffusion(c) => Box::new(DiffusionProvider::new(c)?),
            GenerationConfig::EnhancedChat(c) => Box::new(EnhancedChatProvider::new(c)?),
            GenerationConfig::ImageModel(c) => Box::new(ImageModelProvider::new(c)?),
        };

        tracing::info!(provider = provider.name(), "image generator ready");
        Ok(Self { provider })
    }

    /// Wrap an already-built provider. Used by tests and by callers that
    /// construct providers directly.
    pub fn with_provider(provider: Box<dyn ImageProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate one image with the active provider.
    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedImage, GenerationError> {
        self.provider.generate(prompt, options).await
    }

    /// Generate an image and write it to `path`, returning the path back.
    pub async fn generate_and_save(
        &self,
        prompt: &str,
        path: impl Into<PathBuf>,
        options: &GenerateOptions,
    ) -> Result<PathBuf, GenerationError> {
        let path = path.into();
        let image = self.generate(prompt, options).await?;
        image.save(&path)?;
        tracing::info!(path = %path.display(), "generated image saved");
        Ok(path)
    }
}

/// Parse a `<width>x<height>` size string.
pub(crate) fn parse_size(size: &str) -> Result<(u32, u32), GenerationError> {
    let (width, height) = size.split_once('x').ok_or_else(|| {
        GenerationError::UnexpectedResponse(format!(
            "invalid size '{}', expected <width>x<height>",
            size
        ))
    })?;

    let width = width.parse().map_err(|_| {
        GenerationError::UnexpectedResponse(format!("invalid width in size '{}'", size))
    })?;
    let height = height.parse().map_err(|_| {
        GenerationError::UnexpectedResponse(format!("invalid height in size '{}'", size))
    })?;

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_options_defaults() {
        let options = GenerateOptions::default();
        assert_eq!(options.size, "1024x1024");
        assert_eq!(options.quality, "standard");
        assert_eq!(options.count, 1);
    }

    #[test]
    fn test_generate_options_builder() {
        let options = GenerateOptions::default()
            .size("512x768")
            .quality("hd")
            .count(2);
        assert_eq!(options.size, "512x768");
        assert_eq!(options.quality, "hd");
        assert_eq!(options.count, 2);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512x768").unwrap(), (512, 768));
        assert_eq!(parse_size("1024x1024").unwrap(), (1024, 1024));
    }

    #[test]
    fn test_parse_size_invalid() {
        assert!(parse_size("512").is_err());
        assert!(parse_size("ax b").is_err());
        assert!(parse_size("512x").is_err());
    }

    #[test]
    fn test_generated_image_sniffs_format() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let image = GeneratedImage::from_bytes(png);
        assert_eq!(image.format, ImageFormat::Png);
    }

    #[test]
    fn test_generated_image_unknown_bytes_default_png() {
        let image = GeneratedImage::from_bytes(vec![0, 1, 2, 3]);
        assert_eq!(image.format, ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_generator_dispatches_to_provider() {
        let provider = MockImageProvider::success("mock-diffusion");
        let calls = provider.calls();
        let generator = ImageGenerator::with_provider(Box::new(provider));

        let image = generator
            .generate("a vial of alpine air", &GenerateOptions::default())
            .await
            .unwrap();
        assert!(!image.data.is_empty());
        assert_eq!(calls.lock().unwrap().as_slice(), ["a vial of alpine air"]);
    }

    #[tokio::test]
    async fn test_generator_propagates_provider_failure() {
        let provider = MockImageProvider::failure("mock", "backend down");
        let generator = ImageGenerator::with_provider(Box::new(provider));

        let result = generator
            .generate("anything", &GenerateOptions::default())
            .await;
        match result {
            Err(GenerationError::Api { message, .. }) => {
                assert!(message.contains("backend down"));
            }
            other => panic!("Expected Api error, got {:?}", other.map(|i| i.format)),
        }
    }
}
