//! HTTP client for the inference/training service.
//!
//! Thin wrapper over reqwest: JSON endpoints return typed responses, the
//! chunked endpoints (`/preprocess`, `/train`, `/stream`) return raw byte
//! streams that callers feed through `LineStreamReader`.

use crate::api::types::{
    PreprocessRequest, ProfileInfo, ProfilesResponse, SynthesisRequest, TrainRequest,
    UploadResponse,
};
use crate::error::{CloneCtlError, Result};
use futures_util::StreamExt;
use std::path::Path;

/// Boxed fallible byte stream, the common currency between the HTTP layer and
/// the line reader.
pub type ByteStream = futures_util::stream::BoxStream<'static, reqwest::Result<bytes::Bytes>>;

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for the given service base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Liveness probe against `GET /docs`.
    pub async fn probe(&self) -> Result<()> {
        let response = self
            .http
            .get(self.url("/docs"))
            .send()
            .await
            .map_err(|e| CloneCtlError::Transport {
                message: format!("failed to reach {}: {e}", self.base_url),
            })?;
        check_status(&response).await
    }

    /// Fetch the profile inventory from `GET /profiles`.
    pub async fn profiles(&self) -> Result<Vec<ProfileInfo>> {
        let response = self
            .http
            .get(self.url("/profiles"))
            .send()
            .await
            .map_err(transport_error)?;
        let response = into_checked(response).await?;
        let parsed: ProfilesResponse =
            response.json().await.map_err(|e| CloneCtlError::Transport {
                message: format!("invalid /profiles response: {e}"),
            })?;
        Ok(parsed.profiles)
    }

    /// Upload a recording via multipart `POST /upload`.
    pub async fn upload(&self, profile: &str, file: &Path) -> Result<UploadResponse> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| CloneCtlError::InvalidRequest {
                message: format!("'{}' has no file name", file.display()),
            })?;
        let data = tokio::fs::read(file).await?;

        let part = reqwest::multipart::Part::bytes(data).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("profile", profile.to_string())
            .part("file", part);

        let response = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let response = into_checked(response).await?;
        response.json().await.map_err(|e| CloneCtlError::Transport {
            message: format!("invalid /upload response: {e}"),
        })
    }

    /// Start preprocessing; returns the chunked progress-line stream.
    pub async fn preprocess(&self, request: &PreprocessRequest) -> Result<ByteStream> {
        self.open_stream("/preprocess", request).await
    }

    /// Start training; returns the chunked progress-line stream.
    pub async fn train(&self, request: &TrainRequest) -> Result<ByteStream> {
        self.open_stream("/train", request).await
    }

    /// Open the NDJSON synthesis stream (`POST /stream`).
    ///
    /// Validates the request locally first: an incomplete request fails fast
    /// without touching the network.
    pub async fn stream(&self, request: &SynthesisRequest) -> Result<ByteStream> {
        request.validate()?;
        self.open_stream("/stream", request).await
    }

    async fn open_stream<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ByteStream> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = into_checked(response).await?;
        Ok(response.bytes_stream().boxed())
    }
}

fn transport_error(e: reqwest::Error) -> CloneCtlError {
    CloneCtlError::Transport {
        message: e.to_string(),
    }
}

/// Map a non-success status to `HttpStatus`, consuming the body for context.
async fn into_checked(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(CloneCtlError::HttpStatus {
        status: status.as_u16(),
        message: truncate(&message, 200),
    })
}

async fn check_status(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(CloneCtlError::HttpStatus {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        })
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}
