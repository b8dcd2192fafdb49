//! Prompt-enhanced image backend
//!
//! Asks a chat-completion model to rewrite the prompt before handing it to
//! the hosted image model. Enhancement is best-effort: if the rewrite call
//! fails for any reason the original prompt is used unchanged and the
//! failure is only visible at debug level.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::{EnhancedChatConfig, ImageModelConfig};
use crate::error::GenerationError;
use crate::generation::{GenerateOptions, GeneratedImage, ImageModelProvider, ImageProvider};

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

const ENHANCE_INSTRUCTION: &str = "You improve prompts for an image generation model. \
Rewrite the user's prompt in English, enriching it with concrete visual detail: \
subject, setting, lighting, composition. Reply with the rewritten prompt only.";

/// Rewrites an image prompt before generation.
#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    async fn enhance(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Chat-completions-backed enhancer.
pub struct ChatPromptEnhancer {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatPromptEnhancer {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .map_err(GenerationError::Transport)?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl PromptEnhancer for ChatPromptEnhancer {
    async fn enhance(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": ENHANCE_INSTRUCTION},
                {"role": "user", "content": prompt},
            ],
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
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

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                GenerationError::UnexpectedResponse("chat response carried no choices".to_string())
            })
    }
}

/// Image provider that enhances the prompt, then renders it with the hosted
/// image model.
pub struct EnhancedChatProvider {
    enhancer: Box<dyn PromptEnhancer>,
    inner: ImageModelProvider,
}

impl EnhancedChatProvider {
    pub fn new(config: &EnhancedChatConfig) -> crate::Result<Self> {
        let enhancer =
            ChatPromptEnhancer::new(&config.api_key, &config.base_url, &config.chat_model)?;
        let inner = ImageModelProvider::new(&ImageModelConfig {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.image_model.clone(),
        })?;

        Ok(Self {
            enhancer: Box::new(enhancer),
            inner,
        })
    }

    /// Assemble from parts. Used by tests to inject a failing enhancer.
    pub fn with_parts(enhancer: Box<dyn PromptEnhancer>, inner: ImageModelProvider) -> Self {
        Self { enhancer, inner }
    }

    /// Enhancement with silent fallback: a failed rewrite yields the
    /// original prompt and never surfaces to the caller.
    async fn enhanced_prompt(&self, prompt: &str) -> String {
        match self.enhancer.enhance(prompt).await {
            Ok(enhanced) => {
                tracing::debug!(original = prompt, enhanced = %enhanced, "prompt enhanced");
                enhanced
            }
            Err(e) => {
                tracing::debug!(error = %e, "prompt enhancement failed, using original prompt");
                prompt.to_string()
            }
        }
    }
}

#[async_trait]
impl ImageProvider for EnhancedChatProvider {
    fn name(&self) -> &str {
        "enhanced_chat"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedImage, GenerationError> {
        let prompt = self.enhanced_prompt(prompt).await;
        self.inner.generate(&prompt, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockPromptEnhancer;

    fn failing_provider_prompt_check() -> EnhancedChatProvider {
        let inner = ImageModelProvider::new(&ImageModelConfig {
            api_key: "k".to_string(),
            base_url: "http://unreachable.invalid".to_string(),
            model: "m".to_string(),
        })
        .unwrap();
        EnhancedChatProvider::with_parts(Box::new(MockPromptEnhancer::failure("quota hit")), inner)
    }

    #[test]
    fn test_chat_response_deserializes() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": "a better prompt"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "a better prompt");
    }

    #[tokio::test]
    async fn test_enhancement_failure_falls_back_to_original() {
        let provider = failing_provider_prompt_check();
        let prompt = provider.enhanced_prompt("a vial on a cliff").await;
        assert_eq!(prompt, "a vial on a cliff");
    }

    #[tokio::test]
    async fn test_enhancement_success_replaces_prompt() {
        let inner = ImageModelProvider::new(&ImageModelConfig {
            api_key: "k".to_string(),
            base_url: "http://unreachable.invalid".to_string(),
            model: "m".to_string(),
        })
        .unwrap();
        let provider = EnhancedChatProvider::with_parts(
            Box::new(MockPromptEnhancer::success("a vial on a cliff, golden hour")),
            inner,
        );

        let prompt = provider.enhanced_prompt("a vial on a cliff").await;
        assert_eq!(prompt, "a vial on a cliff, golden hour");
    }
}
