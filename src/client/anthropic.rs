//! Anthropic Messages API client.
//!
//! A thin, non-streaming HTTP client. Key provider specifics:
//! - Auth travels in `x-api-key`, not a bearer token.
//! - `anthropic-version` is required on every call.
//! - System text is a top-level `system` parameter, not a message.
//! - `max_tokens` is required, not optional.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    FileMetadata, FileUploadRequest, MessagesRequest, MessagesResponse, ModelClient,
    TransportError,
};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "/v1/messages";
const FILES_PATH: &str = "/v1/files";

pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different host. Tests use this for mock servers.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        // Minimal production-friendly defaults (env-overridable).
        let timeout_secs = env::var("ADDON_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(
                env::var("ADDON_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(8),
            )
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            // Correlation id. The provider may ignore it, but applications can use it for linkage.
            .header("x-request-id", uuid::Uuid::new_v4().to_string())
    }

    /// Map a non-2xx response to `Error::Remote`, extracting the provider's
    /// error envelope (`{"error": {"type", "message"}}`) when present.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let class = body
            .pointer("/error/type")
            .and_then(Value::as_str)
            .unwrap_or("api_error")
            .to_string();
        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string();

        Err(Error::Remote {
            status: status.as_u16(),
            class,
            message,
        })
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn create_message(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        tracing::debug!(model = %request.model, messages = request.messages.len(), "calling Anthropic Messages API");

        let response = self
            .request(reqwest::Method::POST, MESSAGES_PATH)
            .json(request)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let response = Self::check_status(response).await?;
        let parsed = response
            .json::<MessagesResponse>()
            .await
            .map_err(TransportError::Http)?;
        Ok(parsed)
    }

    async fn upload_file(&self, upload: &FileUploadRequest) -> Result<FileMetadata> {
        let bytes = tokio::fs::read(&upload.file_path).await?;
        let filename = upload.effective_filename();
        tracing::debug!(file = %filename, size = bytes.len(), "uploading file");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("purpose", upload.purpose.clone());

        let response = self
            .request(reqwest::Method::POST, FILES_PATH)
            .multipart(form)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let response = Self::check_status(response).await?;
        let metadata = response
            .json::<FileMetadata>()
            .await
            .map_err(TransportError::Http)?;
        Ok(metadata)
    }
}
