//! Mock generation backends for testing
//!
//! Configurable provider and enhancer that simulate successes and failures
//! without credentials or network access. Available to all builds so
//! integration tests can drive the orchestrator end to end.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::GenerationError;
use crate::generation::enhanced::PromptEnhancer;
use crate::generation::{GenerateOptions, GeneratedImage, ImageProvider};

/// PNG signature plus IHDR fragment, enough for format sniffing.
const PNG_STUB: [u8; 12] = [
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
];

/// Mock image provider for testing
pub struct MockImageProvider {
    name: String,
    error: Option<String>,
    /// Prompts passed to `generate`, for verification.
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockImageProvider {
    /// Create a mock provider that always succeeds.
    pub fn success(name: &str) -> Self {
        Self {
            name: name.to_string(),
            error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider that always fails with the given message.
    pub fn failure(name: &str, error: &str) -> Self {
        Self {
            name: name.to_string(),
            error: Some(error.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the recorded prompts.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<GeneratedImage, GenerationError> {
        self.calls.lock().unwrap().push(prompt.to_string());

        match &self.error {
            Some(message) => Err(GenerationError::Api {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(GeneratedImage::from_bytes(PNG_STUB.to_vec())),
        }
    }
}

/// Mock prompt enhancer for testing
pub struct MockPromptEnhancer {
    outcome: Result<String, String>,
}

impl MockPromptEnhancer {
    /// Create an enhancer that always returns the given rewrite.
    pub fn success(enhanced: &str) -> Self {
        Self {
            outcome: Ok(enhanced.to_string()),
        }
    }

    /// Create an enhancer that always fails with the given message.
    pub fn failure(error: &str) -> Self {
        Self {
            outcome: Err(error.to_string()),
        }
    }
}

#[async_trait]
impl PromptEnhancer for MockPromptEnhancer {
    async fn enhance(&self, _prompt: &str) -> Result<String, GenerationError> {
        match &self.outcome {
            Ok(enhanced) => Ok(enhanced.clone()),
            Err(message) => Err(GenerationError::Api {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageFormat;

    #[tokio::test]
    async fn test_mock_provider_records_prompts() {
        let provider = MockImageProvider::success("mock");
        provider
            .generate("first", &GenerateOptions::default())
            .await
            .unwrap();
        provider
            .generate("second", &GenerateOptions::default())
            .await
            .unwrap();

        let calls = provider.calls();
        assert_eq!(calls.lock().unwrap().as_slice(), ["first", "second"]);
    }

    #[tokio::test]
    async fn test_mock_provider_returns_png() {
        let provider = MockImageProvider::success("mock");
        let image = provider
            .generate("p", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(image.format, ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let provider = MockImageProvider::failure("mock", "out of VRAM");
        let result = provider.generate("p", &GenerateOptions::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_enhancer_outcomes() {
        let ok = MockPromptEnhancer::success("better");
        assert_eq!(ok.enhance("p").await.unwrap(), "better");

        let err = MockPromptEnhancer::failure("nope");
        assert!(err.enhance("p").await.is_err());
    }
}
