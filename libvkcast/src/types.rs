//! Core types for Vkcast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Uniform outcome of a remote API call.
///
/// Every result-returning operation on [`VkClient`](crate::vk::VkClient)
/// produces one of these instead of propagating errors, so the web layer can
/// branch on `success` alone and never crash on a remote failure. Exactly one
/// of `payload` / `error_message` is set; when `success` is false only
/// `error_message` carries information.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl<T> ApiResult<T> {
    /// Create a successful result carrying a payload.
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error_message: None,
        }
    }

    /// Create a failed result carrying a human-readable message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl<T, E: std::fmt::Display> From<std::result::Result<T, E>> for ApiResult<T> {
    fn from(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(payload) => ApiResult::ok(payload),
            Err(e) => ApiResult::fail(e.to_string()),
        }
    }
}

/// Reference to a photo uploaded to VK but not yet attached to a post.
///
/// Rendered as `photo<owner>_<id>`, the attachment syntax `wall.post`
/// expects. Produced by the upload pipeline, consumed once by a
/// publish/schedule call, then discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle {
    pub owner_id: i64,
    pub media_id: i64,
}

impl MediaHandle {
    pub fn new(owner_id: i64, media_id: i64) -> Self {
        Self { owner_id, media_id }
    }

    /// The bare `<owner>_<id>` form, without the `photo` type prefix.
    pub fn reference(&self) -> String {
        format!("{}_{}", self.owner_id, self.media_id)
    }
}

impl std::fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "photo{}_{}", self.owner_id, self.media_id)
    }
}

/// A wall post to publish or schedule.
///
/// `message` being non-empty is the caller's obligation; the client forwards
/// whatever it is given and lets VK reject it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub message: String,
    pub media_path: Option<PathBuf>,
    pub community_id: Option<String>,
    pub from_community: bool,
    pub scheduled_at: Option<i64>,
}

impl PublishRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            media_path: None,
            community_id: None,
            from_community: true,
            scheduled_at: None,
        }
    }

    /// Attach a local image file, uploaded before publishing.
    pub fn with_media(mut self, path: impl Into<PathBuf>) -> Self {
        self.media_path = Some(path.into());
        self
    }

    /// Publish to a community wall instead of the user's own.
    pub fn to_community(mut self, community_id: impl Into<String>) -> Self {
        self.community_id = Some(community_id.into());
        self
    }

    /// Post under the user's own name rather than the community's.
    pub fn as_user(mut self) -> Self {
        self.from_community = false;
        self
    }

    /// Defer publication to the given Unix timestamp.
    pub fn scheduled(mut self, publish_at: i64) -> Self {
        self.scheduled_at = Some(publish_at);
        self
    }
}

/// Payload of a successful publish or schedule call.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReceipt {
    pub post_id: i64,
    pub status: String,
}

/// Engagement counters for a single wall post. Missing counters are zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostStats {
    pub post_id: i64,
    pub likes: u64,
    pub reposts: u64,
    pub comments: u64,
    pub views: u64,
}

/// Optional date window for a stats query. Dates are `YYYY-MM-DD`;
/// unparsable dates are silently dropped from the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRange {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub interval: String,
}

impl Default for StatsRange {
    fn default() -> Self {
        Self {
            date_from: None,
            date_to: None,
            interval: "day".to_string(),
        }
    }
}

impl StatsRange {
    pub fn between(date_from: impl Into<String>, date_to: impl Into<String>) -> Self {
        Self {
            date_from: Some(date_from.into()),
            date_to: Some(date_to.into()),
            ..Default::default()
        }
    }

    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }
}

/// Visitor counters summed across all returned periods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisitorTotals {
    pub views: u64,
    pub visitors: u64,
    pub mobile_views: u64,
}

/// Activity counters summed across all returned periods.
///
/// VK reports shares in the `copies` field; the aggregate mirrors it into
/// `reposts` so callers see the familiar name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityTotals {
    pub likes: u64,
    pub comments: u64,
    pub reposts: u64,
    pub copies: u64,
}

/// Community stats aggregate plus the raw per-period records for traceability.
#[derive(Debug, Clone, Serialize)]
pub struct CommunityStatsOverview {
    pub visitors: VisitorTotals,
    pub activity: ActivityTotals,
    pub periods: Vec<serde_json::Value>,
}

/// Raster formats a generation provider may hand back
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Detect the format from the first bytes of the payload.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(Self::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"GIF8") {
            Some(Self::Gif)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else {
            None
        }
    }

    /// Get the MIME type string representation
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }

    /// Get the typical file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_result_ok_sets_only_payload() {
        let result = ApiResult::ok(42);
        assert!(result.success);
        assert_eq!(result.payload, Some(42));
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_api_result_fail_sets_only_error() {
        let result: ApiResult<u32> = ApiResult::fail("boom");
        assert!(!result.success);
        assert!(result.payload.is_none());
        assert_eq!(result.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_api_result_from_result() {
        let ok: ApiResult<i32> = Ok::<_, crate::error::ApiError>(7).into();
        assert!(ok.success);

        let err: ApiResult<i32> = Err::<i32, _>(crate::error::ApiError::Remote(
            "Access denied".to_string(),
        ))
        .into();
        assert!(!err.success);
        assert_eq!(
            err.error_message.as_deref(),
            Some("VK API Error: Access denied")
        );
    }

    #[test]
    fn test_api_result_serializes_error_field_name() {
        let result: ApiResult<u32> = ApiResult::fail("bad token");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], serde_json::json!(false));
        assert_eq!(json["error"], serde_json::json!("bad token"));
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_media_handle_display() {
        let handle = MediaHandle::new(-233444174, 55);
        assert_eq!(handle.to_string(), "photo-233444174_55");
        assert_eq!(handle.reference(), "-233444174_55");
    }

    #[test]
    fn test_publish_request_builder() {
        let request = PublishRequest::new("hello")
            .to_community("100")
            .with_media("/tmp/pic.png")
            .scheduled(1_700_000_000);

        assert_eq!(request.message, "hello");
        assert_eq!(request.community_id.as_deref(), Some("100"));
        assert_eq!(request.media_path, Some(PathBuf::from("/tmp/pic.png")));
        assert!(request.from_community);
        assert_eq!(request.scheduled_at, Some(1_700_000_000));
    }

    #[test]
    fn test_publish_request_as_user() {
        let request = PublishRequest::new("hi").as_user();
        assert!(!request.from_community);
    }

    #[test]
    fn test_stats_range_default_interval() {
        let range = StatsRange::default();
        assert_eq!(range.interval, "day");
        assert!(range.date_from.is_none());
    }

    #[test]
    fn test_stats_range_between() {
        let range = StatsRange::between("2024-01-01", "2024-02-01").interval("week");
        assert_eq!(range.date_from.as_deref(), Some("2024-01-01"));
        assert_eq!(range.date_to.as_deref(), Some("2024-02-01"));
        assert_eq!(range.interval, "week");
    }

    #[test]
    fn test_image_format_magic_bytes_png() {
        let data = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(ImageFormat::from_magic_bytes(&data), Some(ImageFormat::Png));
    }

    #[test]
    fn test_image_format_magic_bytes_jpeg() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(
            ImageFormat::from_magic_bytes(&data),
            Some(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn test_image_format_magic_bytes_webp() {
        let mut data = Vec::new();
        data.extend_from_slice(b"RIFF");
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(b"WEBP");
        assert_eq!(
            ImageFormat::from_magic_bytes(&data),
            Some(ImageFormat::WebP)
        );
    }

    #[test]
    fn test_image_format_unknown_bytes() {
        assert_eq!(ImageFormat::from_magic_bytes(b"<html>"), None);
    }

    #[test]
    fn test_image_format_mime_and_extension() {
        assert_eq!(ImageFormat::Png.as_mime(), "image/png");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::WebP.to_string(), "webp");
    }
}
