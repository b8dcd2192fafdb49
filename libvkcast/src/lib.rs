//! Vkcast - VK publishing and content generation core
//!
//! This library drives the multi-step workflows behind an SMM web app:
//! generating post copy and images, publishing or scheduling wall posts on
//! VK (with two-phase photo upload), and fetching engagement statistics.
//! The web layer supplies credentials and topic/tone parameters and gets
//! back either an [`ApiResult`](types::ApiResult) it can branch on or a
//! raised error it must wrap at the boundary.

pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod text;
pub mod types;
pub mod vk;

// Re-export commonly used types
pub use config::{Config, GenerationConfig, TextGenConfig, VkConfig};
pub use error::{ApiError, ConfigError, GenerationError, Result, VkcastError};
pub use generation::{GenerateOptions, GeneratedImage, ImageGenerator, ImageProvider};
pub use text::TextGenerator;
pub use types::{ApiResult, MediaHandle, PublishRequest, StatsRange};
pub use vk::VkClient;
