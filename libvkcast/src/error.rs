//! Error types for Vkcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VkcastError>;

#[derive(Error, Debug)]
pub enum VkcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("VK API error: {0}")]
    Api(#[from] ApiError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failures of a single VK method call, one variant per funnel tier.
///
/// Every remote operation on [`VkClient`](crate::vk::VkClient) classifies its
/// failure into exactly one of these categories before either raising it or
/// folding it into an [`ApiResult`](crate::types::ApiResult) failure.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// Connection, DNS, or timeout failure before any HTTP status was seen.
    #[error("Network error: {0}")]
    Transport(String),

    /// Non-200 HTTP status from the remote endpoint.
    #[error("HTTP Error {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body was not valid JSON. `body` is truncated to 200 chars.
    #[error("JSON parse error: {reason}. Response: {body}")]
    Decode { reason: String, body: String },

    /// The remote API reported an error in an otherwise valid envelope.
    #[error("VK API Error: {0}")]
    Remote(String),

    /// Well-formed JSON with an unexpected structure (wrong shape, empty set).
    #[error("Unexpected response: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode image data: {0}")]
    Decode(String),

    #[error("No images in response")]
    NoImages,

    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),

    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),
}
