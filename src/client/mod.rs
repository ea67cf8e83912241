//! Remote model client seam.
//!
//! The orchestrator talks to the Messages API through the [`ModelClient`]
//! trait so tests can drive the loop with a scripted mock. The production
//! implementation is [`AnthropicClient`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tools::ToolDefinition;
use crate::types::{ContentBlock, Message, Usage};
use crate::Result;

pub mod anthropic;
pub mod mock;

pub use anthropic::AnthropicClient;
pub use mock::MockModelClient;

/// One request/response exchange ("round") with the remote model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a full conversation and receive the model's next turn.
    async fn create_message(&self, request: &MessagesRequest) -> Result<MessagesResponse>;

    /// Upload a file for later reference from a document block.
    async fn upload_file(&self, upload: &FileUploadRequest) -> Result<FileMetadata>;
}

/// Request body for the Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Response body from the Messages API.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// A file to upload before analysis.
#[derive(Debug, Clone)]
pub struct FileUploadRequest {
    pub file_path: String,
    pub filename: Option<String>,
    pub purpose: String,
}

impl FileUploadRequest {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            filename: None,
            purpose: "analysis".to_string(),
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    /// Effective filename: explicit name, else the path's basename.
    pub fn effective_filename(&self) -> String {
        self.filename.clone().unwrap_or_else(|| {
            std::path::Path::new(&self.file_path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.file_path.clone())
        })
    }
}

/// Metadata returned by the file upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(rename = "type", default = "default_file_type")]
    pub file_type: String,
}

fn default_file_type() -> String {
    "file".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
