//! File analysis action.
//!
//! Uploads a file (or references an already-uploaded one) and asks the model
//! a question about it in a single round. The file travels as a `document`
//! content block alongside the question.

use serde::Serialize;
use tracing::{debug, error, info};

use super::{ActionResponse, TokensSchema};
use crate::client::{AnthropicClient, FileUploadRequest, MessagesRequest, ModelClient};
use crate::config::AddonConfig;
use crate::credentials::CredentialsRegistry;
use crate::types::{ContentBlock, Message, UsageInfo};
use crate::{Error, ErrorContext, Result};

/// Parameters for one file analysis call.
#[derive(Debug, Clone, Default)]
pub struct FileAnalysisParams {
    /// Question or instruction about the file
    pub message: String,
    /// File to upload and analyze
    pub file_upload: Option<FileUploadRequest>,
    /// ID of an already uploaded file
    pub file_id: Option<String>,
    /// Max tokens (overrides config default)
    pub max_tokens: Option<u32>,
    /// Temperature (overrides config default)
    pub temperature: Option<f64>,
}

impl FileAnalysisParams {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn file_upload(mut self, upload: FileUploadRequest) -> Self {
        self.file_upload = Some(upload);
        self
    }

    pub fn file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Information about an uploaded file.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    /// File ID
    pub id: String,
    /// Original filename
    pub filename: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// File type
    #[serde(rename = "type")]
    pub file_type: String,
}

/// File analysis output.
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysisOutput {
    /// The model's analysis of the file
    pub response: String,
    /// Information about the uploaded file, when an upload happened
    pub file_info: Option<FileInfo>,
    /// Model used
    pub model: String,
    pub usage: UsageInfo,
    pub stop_reason: Option<String>,
}

/// Run a file analysis against the production Anthropic client.
///
/// Exactly one of `file_upload` and `file_id` must be provided; violations
/// are programmer errors surfaced as `Err`, not structured 500s.
pub async fn file_analysis(
    config: &AddonConfig,
    credentials: &CredentialsRegistry,
    params: FileAnalysisParams,
) -> Result<ActionResponse<FileAnalysisOutput>> {
    validate_file_source(&params)?;
    debug!(message = %params.message.chars().take(100).collect::<String>(), "executing file_analysis");

    let client = match api_client(credentials) {
        Ok(client) => client,
        Err(e) => return Ok(failure_response(config, e)),
    };

    run_file_analysis(&client, config, params).await
}

/// Run a file analysis against any [`ModelClient`].
pub async fn run_file_analysis(
    client: &dyn ModelClient,
    config: &AddonConfig,
    params: FileAnalysisParams,
) -> Result<ActionResponse<FileAnalysisOutput>> {
    validate_file_source(&params)?;

    match analyze(client, config, params).await {
        Ok(output) => {
            info!(
                total_tokens = output.usage.total_tokens,
                "file analysis successful"
            );
            let tokens = TokensSchema::new(output.usage.output_tokens, output.usage.total_tokens);
            Ok(ActionResponse::success(
                output,
                tokens,
                "File analysis successful",
            ))
        }
        Err(e) => Ok(failure_response(config, e)),
    }
}

fn validate_file_source(params: &FileAnalysisParams) -> Result<()> {
    match (&params.file_upload, &params.file_id) {
        (None, None) => Err(Error::validation_with_context(
            "Either file_upload or file_id must be provided",
            ErrorContext::new().with_source("file_analysis"),
        )),
        (Some(_), Some(_)) => Err(Error::validation_with_context(
            "Cannot provide both file_upload and file_id",
            ErrorContext::new().with_source("file_analysis"),
        )),
        _ => Ok(()),
    }
}

fn api_client(credentials: &CredentialsRegistry) -> Result<AnthropicClient> {
    let api_key = credentials.get("anthropic_api_key").ok_or_else(|| {
        Error::configuration_with_context(
            "Anthropic API key not found in credentials",
            ErrorContext::new().with_source("file_analysis"),
        )
    })?;
    AnthropicClient::new(api_key)
}

fn failure_response(config: &AddonConfig, error: Error) -> ActionResponse<FileAnalysisOutput> {
    error!(error = %error, "file analysis failed");
    ActionResponse::failure(
        FileAnalysisOutput {
            response: format!("Error: {}", error),
            file_info: None,
            model: config.model.clone(),
            usage: UsageInfo::zero(),
            stop_reason: Some("error".to_string()),
        },
        format!("File analysis failed: {}", error),
    )
}

async fn analyze(
    client: &dyn ModelClient,
    config: &AddonConfig,
    params: FileAnalysisParams,
) -> Result<FileAnalysisOutput> {
    let mut file_info = None;
    let file_id = match (&params.file_upload, &params.file_id) {
        (Some(upload), _) => {
            debug!(path = %upload.file_path, "uploading file");
            if !std::path::Path::new(&upload.file_path).exists() {
                return Err(Error::validation_with_context(
                    format!("File not found: {}", upload.file_path),
                    ErrorContext::new()
                        .with_field_path("file_upload.file_path")
                        .with_source("file_analysis"),
                ));
            }

            let filename = upload.effective_filename();
            let metadata = client.upload_file(upload).await?;
            info!(file = %filename, id = %metadata.id, "file uploaded successfully");

            file_info = Some(FileInfo {
                id: metadata.id.clone(),
                filename,
                size_bytes: metadata.size_bytes,
                file_type: metadata.file_type,
            });
            metadata.id
        }
        (None, Some(file_id)) => file_id.clone(),
        (None, None) => unreachable!("validated by validate_file_source"),
    };

    let request = MessagesRequest {
        model: config.model.clone(),
        max_tokens: params.max_tokens.unwrap_or(config.max_tokens),
        messages: vec![Message::user_blocks(vec![
            ContentBlock::file_document(file_id),
            ContentBlock::text(params.message.clone()),
        ])],
        temperature: Some(params.temperature.unwrap_or(config.temperature)),
        system: None,
        tools: None,
    };

    let response = client.create_message(&request).await?;

    let text = response
        .content
        .iter()
        .find_map(|block| match block {
            ContentBlock::Text { text, .. } => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_default();

    Ok(FileAnalysisOutput {
        response: text,
        file_info,
        model: config.model.clone(),
        usage: UsageInfo::from_usage(&response.usage),
        stop_reason: response.stop_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_requires_exactly_one_source() {
        let neither = FileAnalysisParams::new("what is this?");
        assert!(validate_file_source(&neither).is_err());

        let both = FileAnalysisParams::new("what is this?")
            .file_upload(FileUploadRequest::new("/tmp/x.txt"))
            .file_id("file_123");
        assert!(validate_file_source(&both).is_err());

        let just_id = FileAnalysisParams::new("what is this?").file_id("file_123");
        assert!(validate_file_source(&just_id).is_ok());
    }
}
