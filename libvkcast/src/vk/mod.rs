//! VK method-API client
//!
//! Typed access to the wall/photo/stats/users/groups methods. The client is
//! constructed once with an access token and an optional default community
//! and is stateless across calls; every operation accepts overrides.
//!
//! All result-returning operations route their failures through one
//! classification funnel ([`ApiError`]): non-200 status, undecodable body,
//! a VK-reported error envelope, or a transport failure. `user_groups` and
//! `upload_photo` instead propagate errors to the caller, matching the
//! behavior the web layer was built against.
//!
//! # Examples
//!
//! ```no_run
//! use libvkcast::vk::VkClient;
//! use libvkcast::types::PublishRequest;
//!
//! # async fn example() -> libvkcast::Result<()> {
//! let client = VkClient::new("access-token", Some("233444174".to_string()))?;
//!
//! let check = client.check_token().await;
//! if !check.success {
//!     eprintln!("token rejected: {:?}", check.error_message);
//! }
//!
//! let request = PublishRequest::new("Fresh air from the Andes, tagged and cased.");
//! let outcome = client.publish(&request).await;
//! if let Some(receipt) = outcome.payload {
//!     println!("post {} {}", receipt.post_id, receipt.status);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde_json::Value;

use crate::error::ApiError;
use crate::types::{
    ActivityTotals, ApiResult, CommunityStatsOverview, MediaHandle, PostStats, PublishReceipt,
    PublishRequest, StatsRange, VisitorTotals,
};

pub mod upload;

/// VK API version sent with every method call.
pub const API_VERSION: &str = "5.131";

const DEFAULT_BASE_URL: &str = "https://api.vk.com/method";

/// Timeout for text/stats/publish traffic. Image synthesis uses its own
/// long-timeout client in the generation module.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How much of an undecodable body is kept in the error message.
const BODY_SNIPPET_LEN: usize = 200;

/// Client for VK's method-call HTTP API.
pub struct VkClient {
    http: reqwest::Client,
    access_token: String,
    community_id: Option<String>,
    base_url: String,
}

impl VkClient {
    /// Create a client for the live VK endpoint.
    pub fn new(
        access_token: impl Into<String>,
        community_id: Option<String>,
    ) -> crate::Result<Self> {
        Self::with_base_url(access_token, community_id, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom method endpoint.
    pub fn with_base_url(
        access_token: impl Into<String>,
        community_id: Option<String>,
        base_url: impl Into<String>,
    ) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            access_token: access_token.into(),
            community_id,
            base_url: base_url.into(),
        })
    }

    /// The default community posts and stats fall back to.
    pub fn community_id(&self) -> Option<&str> {
        self.community_id.as_deref()
    }

    /// Issue one VK method call and classify any failure.
    ///
    /// Returns the unwrapped `response` value on success. Every operation on
    /// this client funnels through here so the four failure tiers are
    /// reported identically everywhere.
    pub(crate) async fn call_method(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, method);
        let mut query: Vec<(&str, String)> = vec![
            ("access_token", self.access_token.clone()),
            ("v", API_VERSION.to_string()),
        ];
        query.extend(params.iter().cloned());

        tracing::debug!(method, "calling VK method");

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if status != 200 {
            return Err(ApiError::Http { status, body });
        }

        unwrap_envelope(&body)
    }

    /// Verify the access token by fetching the calling user.
    ///
    /// Success payload is the first user record from `users.get`.
    pub async fn check_token(&self) -> ApiResult<Value> {
        match self.call_method("users.get", &[]).await {
            Ok(response) => match response.get(0) {
                Some(user) => ApiResult::ok(user.clone()),
                None => ApiResult::fail(
                    ApiError::Validation("users.get returned no user records".to_string())
                        .to_string(),
                ),
            },
            Err(e) => ApiResult::fail(e.to_string()),
        }
    }

    /// List the communities the token's user manages.
    ///
    /// # Errors
    ///
    /// Unlike the publish/stats operations this propagates the [`ApiError`]
    /// instead of folding it into an [`ApiResult`]; the caller wraps it at
    /// the boundary.
    pub async fn user_groups(&self) -> Result<Value, ApiError> {
        self.call_method(
            "groups.get",
            &[
                ("extended", "1".to_string()),
                ("fields", "id,name,screen_name,photo_50".to_string()),
            ],
        )
        .await
    }

    /// Publish a wall post, uploading the attached photo first when present.
    ///
    /// When the request carries `scheduled_at` the post is scheduled instead
    /// and the receipt reports `"scheduled"`. An upload failure never
    /// escapes: it is folded into a failure result with a wrapped message.
    pub async fn publish(&self, request: &PublishRequest) -> ApiResult<PublishReceipt> {
        let community = request
            .community_id
            .as_deref()
            .or(self.community_id.as_deref());

        let attachment = match &request.media_path {
            Some(path) => match self.upload_photo(path, community).await {
                Ok(handle) => {
                    tracing::info!(attachment = %handle, "photo uploaded");
                    Some(handle)
                }
                Err(e) => return ApiResult::fail(format!("Photo upload failed: {}", e)),
            },
            None => None,
        };

        let params = post_params(request, self.community_id.as_deref(), attachment.as_ref());
        let scheduled = request.scheduled_at.is_some();

        match self.call_method("wall.post", &params).await {
            Ok(response) => match response.get("post_id").and_then(Value::as_i64) {
                Some(post_id) => {
                    tracing::info!(post_id, scheduled, "wall post accepted");
                    ApiResult::ok(PublishReceipt {
                        post_id,
                        status: if scheduled { "scheduled" } else { "published" }.to_string(),
                    })
                }
                None => ApiResult::fail(
                    ApiError::Validation("wall.post response missing post_id".to_string())
                        .to_string(),
                ),
            },
            Err(e) => ApiResult::fail(e.to_string()),
        }
    }

    /// Schedule a wall post for the given Unix timestamp.
    ///
    /// Identical to [`publish`](Self::publish) with `publish_date` set;
    /// media and failures are handled the same way.
    pub async fn schedule(
        &self,
        request: &PublishRequest,
        publish_at: i64,
    ) -> ApiResult<PublishReceipt> {
        let request = request.clone().scheduled(publish_at);
        self.publish(&request).await
    }

    /// Fetch engagement counters for a single wall post.
    ///
    /// The post reference sent to VK is disambiguated three ways: an explicit
    /// community wins; a `post_id` that already embeds its owner (contains
    /// `_`) is used as-is; otherwise the client's default community is
    /// prepended.
    pub async fn post_stats(
        &self,
        post_id: &str,
        community_id: Option<&str>,
    ) -> ApiResult<PostStats> {
        let Some(posts) = post_reference(post_id, community_id, self.community_id.as_deref())
        else {
            return ApiResult::fail("No post id given");
        };

        tracing::debug!(posts = %posts, "requesting post stats");

        match self.call_method("wall.getById", &[("posts", posts)]).await {
            Ok(response) => match parse_post_stats(&response) {
                Ok(stats) => ApiResult::ok(stats),
                Err(e) => ApiResult::fail(e.to_string()),
            },
            Err(e) => ApiResult::fail(e.to_string()),
        }
    }

    /// Fetch community statistics, aggregated across all returned periods.
    ///
    /// Returns the summed visitor/activity counters together with the raw
    /// per-period records for traceability.
    pub async fn community_stats(
        &self,
        community_id: &str,
        range: &StatsRange,
        stats_filter: Option<&str>,
    ) -> ApiResult<CommunityStatsOverview> {
        let mut params = vec![("group_id", community_id.to_string())];
        params.extend(range_params(range));
        if let Some(filter) = stats_filter {
            params.push(("stats_groups", filter.to_string()));
        }

        match self.call_method("stats.get", &params).await {
            Ok(response) => match response.as_array() {
                Some(periods) => {
                    let (visitors, activity) = aggregate_periods(periods);
                    ApiResult::ok(CommunityStatsOverview {
                        visitors,
                        activity,
                        periods: periods.clone(),
                    })
                }
                None => ApiResult::fail(
                    ApiError::Validation(
                        "stats.get response is not an array of periods".to_string(),
                    )
                    .to_string(),
                ),
            },
            Err(e) => ApiResult::fail(e.to_string()),
        }
    }

    /// Fetch application statistics.
    ///
    /// The provider response is returned unmodified; unlike
    /// [`community_stats`](Self::community_stats) there is no aggregation.
    pub async fn app_stats(&self, app_id: &str, range: &StatsRange) -> ApiResult<Value> {
        let mut params = vec![("app_id", app_id.to_string())];
        params.extend(range_params(range));

        match self.call_method("stats.get", &params).await {
            Ok(response) => ApiResult::ok(response),
            Err(e) => ApiResult::fail(e.to_string()),
        }
    }
}

/// Decode a VK response body and unwrap its envelope.
///
/// Classifies an undecodable body, a `{"error": ...}` envelope, and a
/// missing `response` field into their respective [`ApiError`] tiers.
fn unwrap_envelope(body: &str) -> Result<Value, ApiError> {
    let data: Value = serde_json::from_str(body).map_err(|e| ApiError::Decode {
        reason: e.to_string(),
        body: truncate(body, BODY_SNIPPET_LEN),
    })?;

    if let Some(error) = data.get("error") {
        let message = error
            .get("error_msg")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ApiError::Remote(message));
    }

    match data.get("response") {
        Some(response) => Ok(response.clone()),
        None => Err(ApiError::Validation(
            "response envelope missing 'response' field".to_string(),
        )),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Build the `posts` parameter for `wall.getById`.
///
/// Returns `None` when no post id was given at all.
fn post_reference(
    post_id: &str,
    community_id: Option<&str>,
    default_community: Option<&str>,
) -> Option<String> {
    if post_id.is_empty() {
        return None;
    }
    if let Some(community) = community_id {
        return Some(format!("-{}_{}", community, post_id));
    }
    if post_id.contains('_') {
        // Already carries its owner, e.g. "233444174_55".
        return Some(format!("-{}", post_id));
    }
    match default_community {
        Some(community) => Some(format!("-{}_{}", community, post_id)),
        None => Some(format!("-{}", post_id)),
    }
}

/// Build the `wall.post` parameter list for a request.
fn post_params(
    request: &PublishRequest,
    default_community: Option<&str>,
    attachment: Option<&MediaHandle>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("message", request.message.clone())];

    let community = request.community_id.as_deref().or(default_community);
    if let Some(community) = community {
        params.push(("owner_id", format!("-{}", community)));
        if request.from_community {
            params.push(("from_group", "1".to_string()));
        }
    }

    if let Some(publish_at) = request.scheduled_at {
        params.push(("publish_date", publish_at.to_string()));
    }

    if let Some(handle) = attachment {
        params.push(("attachments", handle.to_string()));
    }

    params
}

/// Extract post counters from a `wall.getById` response.
///
/// The canonical response shape is a bare array of post records; the
/// `{items: [...]}` wrapper some endpoints use is rejected as structurally
/// unexpected.
fn parse_post_stats(response: &Value) -> Result<PostStats, ApiError> {
    let posts = response.as_array().ok_or_else(|| {
        ApiError::Validation("expected an array of posts in wall.getById response".to_string())
    })?;

    let post = posts.first().ok_or_else(|| {
        ApiError::Validation("post not found or not accessible".to_string())
    })?;

    Ok(PostStats {
        post_id: post.get("id").and_then(Value::as_i64).unwrap_or(0),
        likes: counter(post, "likes"),
        reposts: counter(post, "reposts"),
        comments: counter(post, "comments"),
        views: counter(post, "views"),
    })
}

fn counter(post: &Value, field: &str) -> u64 {
    post.get(field)
        .and_then(|v| v.get("count"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Interval and date-window parameters for `stats.get`.
///
/// Unparsable dates are skipped without surfacing an error, so a malformed
/// date simply widens the window to the provider default.
fn range_params(range: &StatsRange) -> Vec<(&'static str, String)> {
    let mut params = vec![("interval", range.interval.clone())];

    if let Some(ts) = range.date_from.as_deref().and_then(date_to_timestamp) {
        params.push(("timestamp_from", ts.to_string()));
    }
    if let Some(ts) = range.date_to.as_deref().and_then(date_to_timestamp) {
        params.push(("timestamp_to", ts.to_string()));
    }

    params
}

/// Convert a `YYYY-MM-DD` date to a Unix timestamp at midnight UTC.
fn date_to_timestamp(date: &str) -> Option<i64> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Sum visitor and activity counters across stats periods.
///
/// VK reports shares in `copies`; the sum lands in both `reposts` and
/// `copies` of the aggregate.
fn aggregate_periods(periods: &[Value]) -> (VisitorTotals, ActivityTotals) {
    let mut visitors = VisitorTotals::default();
    let mut activity = ActivityTotals::default();

    for period in periods {
        if let Some(v) = period.get("visitors") {
            visitors.views += v.get("views").and_then(Value::as_u64).unwrap_or(0);
            visitors.visitors += v.get("visitors").and_then(Value::as_u64).unwrap_or(0);
            visitors.mobile_views += v.get("mobile_views").and_then(Value::as_u64).unwrap_or(0);
        }
        if let Some(a) = period.get("activity") {
            let copies = a.get("copies").and_then(Value::as_u64).unwrap_or(0);
            activity.likes += a.get("likes").and_then(Value::as_u64).unwrap_or(0);
            activity.comments += a.get("comments").and_then(Value::as_u64).unwrap_or(0);
            activity.reposts += copies;
            activity.copies += copies;
        }
    }

    (visitors, activity)
}
