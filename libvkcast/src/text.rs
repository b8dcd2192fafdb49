//! Post copy generation
//!
//! Stateful prompt builder over an OpenAI-compatible chat-completions
//! backend. The caller sets a tone and a topic (and optionally a persona),
//! then asks for post copy or for an image-generation prompt. Missing
//! tone/topic is a local precondition error raised before any remote call.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::TextGenConfig;
use crate::error::{GenerationError, VkcastError};

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_PERSONA: &str = "You are an experienced social media copywriter. \
You write engaging, natural-sounding posts for a community page, matching the \
requested tone and topic. Keep the copy self-contained and free of hashtag spam.";

const IMAGE_PROMPT_INSTRUCTION: &str = "You write prompts for an image generation \
model. Produce a single English prompt describing a visually rich scene for the \
given topic. Reply with the prompt only.";

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

/// Chat-backed generator for post copy and image prompts.
pub struct TextGenerator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    persona: String,
    tone: Option<String>,
    topic: Option<String>,
}

impl TextGenerator {
    pub fn from_config(config: &TextGenConfig) -> crate::Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .map_err(GenerationError::Transport)?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            persona: DEFAULT_PERSONA.to_string(),
            tone: None,
            topic: None,
        })
    }

    /// Replace the default copywriter persona used as the system message.
    pub fn set_persona(&mut self, persona: impl Into<String>) {
        self.persona = persona.into();
    }

    pub fn set_tone(&mut self, tone: impl Into<String>) {
        self.tone = Some(tone.into());
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = Some(topic.into());
    }

    /// Generate post copy for the configured tone and topic.
    ///
    /// # Errors
    ///
    /// [`VkcastError::InvalidInput`] if tone or topic is unset; a
    /// [`GenerationError`] for any remote failure.
    pub async fn generate_post(&self) -> crate::Result<String> {
        let tone = self.tone.as_deref().ok_or_else(|| {
            VkcastError::InvalidInput("Tone must be set before generating a post".to_string())
        })?;
        let topic = self.topic.as_deref().ok_or_else(|| {
            VkcastError::InvalidInput("Topic must be set before generating a post".to_string())
        })?;

        let user = format!(
            "Write a social media post about \"{}\" using a {} tone.",
            topic, tone
        );
        let content = self.complete(&self.persona, &user).await?;
        Ok(content)
    }

    /// Generate an English image-generation prompt for the configured topic.
    ///
    /// # Errors
    ///
    /// [`VkcastError::InvalidInput`] if the topic is unset; a
    /// [`GenerationError`] for any remote failure.
    pub async fn generate_image_prompt(&self) -> crate::Result<String> {
        let topic = self.topic.as_deref().ok_or_else(|| {
            VkcastError::InvalidInput(
                "Topic must be set before generating an image prompt".to_string(),
            )
        })?;

        let user = format!(
            "Write an English image-generation prompt for a social media post about \"{}\".",
            topic
        );
        let content = self.complete(IMAGE_PROMPT_INSTRUCTION, &user).await?;
        Ok(content)
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::debug!(url = %url, model = %self.model, "requesting chat completion");

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
