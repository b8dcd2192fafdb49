//! Configuration management for Vkcast
//!
//! All credentials and provider settings arrive here already parsed; the
//! library has no environment-variable contract. Callers either build these
//! structs directly or load them from a TOML file with
//! [`Config::load_from_path`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub vk: VkConfig,
    pub text: Option<TextGenConfig>,
    pub image: Option<GenerationConfig>,
}

/// Credentials for the VK method API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VkConfig {
    pub access_token: String,
    /// Default community used when an operation gets no explicit override.
    pub community_id: Option<String>,
}

/// Settings for the chat-completion backend that writes post copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextGenConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Image generation backend selection.
///
/// Exactly one variant is active; its fields must be fully populated before
/// first use. A missing field is a configuration error, never a runtime
/// retry condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum GenerationConfig {
    /// Local Stable Diffusion server reached over its txt2img route.
    Diffusion(DiffusionConfig),
    /// Hosted chat API that first enriches the prompt, then renders it
    /// through the hosted image model.
    EnhancedChat(EnhancedChatConfig),
    /// Hosted image model called directly with the raw prompt.
    ImageModel(ImageModelConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffusionConfig {
    /// Base URL of the diffusion server, e.g. `http://127.0.0.1:7860`.
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedChatConfig {
    pub api_key: String,
    pub base_url: String,
    /// Chat model used to rewrite the prompt.
    pub chat_model: String,
    /// Image model the rewritten prompt is rendered with.
    pub image_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl Config {
    /// Load configuration from a TOML file at the given path.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }
}

impl VkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::MissingField("vk.access_token".to_string()).into());
        }
        Ok(())
    }
}

impl TextGenConfig {
    pub fn validate(&self) -> Result<()> {
        require(&self.api_key, "text.api_key")?;
        require(&self.base_url, "text.base_url")?;
        require(&self.model, "text.model")?;
        Ok(())
    }
}

impl GenerationConfig {
    /// Check that the active variant's fields are fully populated.
    pub fn validate(&self) -> Result<()> {
        match self {
            GenerationConfig::Diffusion(c) => require(&c.endpoint, "image.endpoint"),
            GenerationConfig::EnhancedChat(c) => {
                require(&c.api_key, "image.api_key")?;
                require(&c.base_url, "image.base_url")?;
                require(&c.chat_model, "image.chat_model")?;
                require(&c.image_model, "image.image_model")
            }
            GenerationConfig::ImageModel(c) => {
                require(&c.api_key, "image.api_key")?;
                require(&c.base_url, "image.base_url")?;
                require(&c.model, "image.model")
            }
        }
    }

    /// Lowercase tag naming the active provider variant.
    pub fn provider_name(&self) -> &'static str {
        match self {
            GenerationConfig::Diffusion(_) => "diffusion",
            GenerationConfig::EnhancedChat(_) => "enhanced_chat",
            GenerationConfig::ImageModel(_) => "image_model",
        }
    }
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField(field.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VkcastError;

    #[test]
    fn test_vk_config_validate_rejects_empty_token() {
        let config = VkConfig {
            access_token: "  ".to_string(),
            community_id: None,
        };
        match config.validate() {
            Err(VkcastError::Config(ConfigError::MissingField(field))) => {
                assert_eq!(field, "vk.access_token");
            }
            other => panic!("Expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_generation_config_validate_diffusion() {
        let config = GenerationConfig::Diffusion(DiffusionConfig {
            endpoint: "http://127.0.0.1:7860".to_string(),
        });
        assert!(config.validate().is_ok());

        let empty = GenerationConfig::Diffusion(DiffusionConfig {
            endpoint: "".to_string(),
        });
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_generation_config_validate_enhanced_chat_missing_model() {
        let config = GenerationConfig::EnhancedChat(EnhancedChatConfig {
            api_key: "sk-test".to_string(),
            base_url: "https://api.example.com".to_string(),
            chat_model: "".to_string(),
            image_model: "dall-e-3".to_string(),
        });
        match config.validate() {
            Err(VkcastError::Config(ConfigError::MissingField(field))) => {
                assert_eq!(field, "image.chat_model");
            }
            other => panic!("Expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_name() {
        let config = GenerationConfig::ImageModel(ImageModelConfig {
            api_key: "k".to_string(),
            base_url: "u".to_string(),
            model: "m".to_string(),
        });
        assert_eq!(config.provider_name(), "image_model");
    }

    #[test]
    fn test_config_parses_from_toml() {
        let raw = r#"
            [vk]
            access_token = "token123"
            community_id = "233444174"

            [text]
            api_key = "sk-text"
            base_url = "https://api.deepseek.com"
            model = "deepseek-chat"

            [image]
            provider = "diffusion"
            endpoint = "http://127.0.0.1:7860"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.vk.access_token, "token123");
        assert_eq!(config.vk.community_id.as_deref(), Some("233444174"));
        match config.image {
            Some(GenerationConfig::Diffusion(ref c)) => {
                assert_eq!(c.endpoint, "http://127.0.0.1:7860");
            }
            ref other => panic!("Expected diffusion variant, got {:?}", other),
        }
    }

    #[test]
    fn test_config_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vkcast.toml");
        std::fs::write(
            &path,
            "[vk]\naccess_token = \"t\"\ncommunity_id = \"100\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.vk.community_id.as_deref(), Some("100"));
        assert!(config.text.is_none());
        assert!(config.image.is_none());
    }

    #[test]
    fn test_config_load_missing_file() {
        let result = Config::load_from_path("/nonexistent/vkcast.toml");
        match result {
            Err(VkcastError::Config(ConfigError::ReadError(_))) => {}
            other => panic!("Expected ReadError, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_config_parses_enhanced_chat_variant() {
        let raw = r#"
            [vk]
            access_token = "t"

            [image]
            provider = "enhanced_chat"
            api_key = "sk-img"
            base_url = "https://api.openai.com"
            chat_model = "gpt-4o-mini"
            image_model = "dall-e-3"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        let image = config.image.unwrap();
        assert_eq!(image.provider_name(), "enhanced_chat");
        assert!(image.validate().is_ok());
    }
}
