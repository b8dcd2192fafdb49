//! Two-phase photo upload
//!
//! VK attaches photos to wall posts in three remote steps: request an upload
//! endpoint, POST the binary as multipart form data, then save the uploaded
//! asset server-side. The pipeline is atomic from the caller's perspective;
//! a failure at any step discards all prior results. Upload is idempotent on
//! retry, so there is no resumability.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, VkcastError};
use crate::types::MediaHandle;
use crate::vk::VkClient;

/// Opaque tokens returned by the upload endpoint, consumed by `photos.save`.
#[derive(Debug, Deserialize)]
struct UploadTicket {
    photo: String,
    server: i64,
    hash: String,
}

impl VkClient {
    /// Upload a local photo and return the handle to attach it with.
    ///
    /// # Errors
    ///
    /// Propagates the failure of whichever step broke: an unreadable file is
    /// a [`VkcastError::InvalidInput`]; remote failures surface as
    /// [`VkcastError::Api`]. `publish`/`schedule` convert these into a
    /// failure result; direct callers must wrap them at the boundary.
    pub async fn upload_photo(
        &self,
        path: impl AsRef<Path>,
        community_id: Option<&str>,
    ) -> crate::Result<MediaHandle> {
        let path = path.as_ref();

        // Read before any remote call so an unreadable file fails fast.
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            VkcastError::InvalidInput(format!("Cannot read photo file {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_string());

        let upload_url = self.upload_server(community_id).await?;
        let ticket = self.send_photo(&upload_url, bytes, file_name).await?;
        let handle = self.save_photo(&ticket, community_id).await?;

        tracing::debug!(handle = %handle, "photo upload pipeline finished");
        Ok(handle)
    }

    /// Step 1: ask VK where to POST the binary.
    async fn upload_server(&self, community_id: Option<&str>) -> Result<String, ApiError> {
        let mut params = Vec::new();
        if let Some(community) = community_id {
            params.push(("group_id", community.to_string()));
        }

        let response = self.call_method("photos.getUploadServer", &params).await?;
        response
            .get("upload_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::Validation(
                    "upload server response missing 'upload_url'".to_string(),
                )
            })
    }

    /// Step 2: POST the file body to the upload endpoint.
    ///
    /// The endpoint answers outside the usual method envelope: a flat object
    /// with `photo`/`server`/`hash`, or an `error` field on failure.
    async fn send_photo(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        file_name: String,
    ) -> Result<UploadTicket, ApiError> {
        let form = reqwest::multipart::Form::new()
            .part("photo", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .http
            .post(upload_url)
            .multipart(form)
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

        let data: Value = serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            reason: e.to_string(),
            body: super::truncate(&body, super::BODY_SNIPPET_LEN),
        })?;

        if let Some(error) = data.get("error") {
            let message = error
                .get("error_msg")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ApiError::Remote(message));
        }

        let ticket: UploadTicket = serde_json::from_value(data).map_err(|e| {
            ApiError::Validation(format!("incomplete upload response: {}", e))
        })?;
        Ok(ticket)
    }

    /// Step 3: save the uploaded asset and compose its handle.
    async fn save_photo(
        &self,
        ticket: &UploadTicket,
        community_id: Option<&str>,
    ) -> Result<MediaHandle, ApiError> {
        let mut params = vec![
            ("photo", ticket.photo.clone()),
            ("server", ticket.server.to_string()),
            ("hash", ticket.hash.clone()),
        ];
        if let Some(community) = community_id {
            params.push(("group_id", community.to_string()));
        }

        let response = self.call_method("photos.save", &params).await?;
        let record = response.get(0).ok_or_else(|| {
            ApiError::Validation("photos.save returned no saved records".to_string())
        })?;

        let owner_id = record
            .get("owner_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                ApiError::Validation("saved photo record missing 'owner_id'".to_string())
            })?;
        let media_id = record.get("id").and_then(Value::as_i64).ok_or_else(|| {
            ApiError::Validation("saved photo record missing 'id'".to_string())
        })?;

        Ok(MediaHandle::new(owner_id, media_id))
    }
}
