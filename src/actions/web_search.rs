//! Web search action.
//!
//! A thin pass-through: one round with a search-oriented system prompt,
//! plus citation extraction from the returned text blocks.

use serde::Serialize;
use tracing::{debug, error, info};

use super::{ActionResponse, TokensSchema};
use crate::client::{AnthropicClient, MessagesRequest, ModelClient};
use crate::config::AddonConfig;
use crate::credentials::CredentialsRegistry;
use crate::types::{Citation, ContentBlock, Message, UsageInfo};
use crate::{Error, ErrorContext, Result};

const DEFAULT_SEARCH_SYSTEM_PROMPT: &str = "You have access to real-time web search. \
    Use it to find current, accurate information to answer the user's question. \
    Always cite your sources.";

/// Queries containing one of these are assumed to have needed fresh data
/// even when no citation came back.
const RECENCY_KEYWORDS: &[&str] = &["current", "latest", "recent", "2024", "2025", "today", "now"];

/// Parameters for one web search call.
#[derive(Debug, Clone, Default)]
pub struct WebSearchParams {
    /// Search query or question
    pub query: String,
    /// Max tokens (overrides config default)
    pub max_tokens: Option<u32>,
    /// Temperature (overrides config default)
    pub temperature: Option<f64>,
    /// System prompt (overrides the search default)
    pub system: Option<String>,
}

impl WebSearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Web search output.
#[derive(Debug, Clone, Serialize)]
pub struct WebSearchOutput {
    /// The model's response with web information
    pub response: String,
    /// Sources the model cited
    pub citations: Vec<Citation>,
    /// Whether a web search appears to have been performed
    pub search_performed: bool,
    /// Model used
    pub model: String,
    pub usage: UsageInfo,
    pub stop_reason: Option<String>,
}

/// Run a web search against the production Anthropic client.
pub async fn web_search(
    config: &AddonConfig,
    credentials: &CredentialsRegistry,
    params: WebSearchParams,
) -> ActionResponse<WebSearchOutput> {
    debug!(query = %params.query.chars().take(100).collect::<String>(), "executing web_search");

    let client = match api_client(credentials) {
        Ok(client) => client,
        Err(e) => return failure_response(config, e),
    };

    run_web_search(&client, config, params).await
}

/// Run a web search against any [`ModelClient`].
pub async fn run_web_search(
    client: &dyn ModelClient,
    config: &AddonConfig,
    params: WebSearchParams,
) -> ActionResponse<WebSearchOutput> {
    match search(client, config, params).await {
        Ok(output) => {
            info!(
                citations = output.citations.len(),
                total_tokens = output.usage.total_tokens,
                "web search successful"
            );
            let tokens = TokensSchema::new(output.usage.output_tokens, output.usage.total_tokens);
            ActionResponse::success(output, tokens, "Web search successful")
        }
        Err(e) => failure_response(config, e),
    }
}

fn api_client(credentials: &CredentialsRegistry) -> Result<AnthropicClient> {
    let api_key = credentials.get("anthropic_api_key").ok_or_else(|| {
        Error::configuration_with_context(
            "Anthropic API key not found in credentials",
            ErrorContext::new().with_source("web_search"),
        )
    })?;
    AnthropicClient::new(api_key)
}

fn failure_response(config: &AddonConfig, error: Error) -> ActionResponse<WebSearchOutput> {
    error!(error = %error, "web search failed");
    ActionResponse::failure(
        WebSearchOutput {
            response: format!("Error: {}", error),
            citations: Vec::new(),
            search_performed: false,
            model: config.model.clone(),
            usage: UsageInfo::zero(),
            stop_reason: Some("error".to_string()),
        },
        format!("Web search failed: {}", error),
    )
}

async fn search(
    client: &dyn ModelClient,
    config: &AddonConfig,
    params: WebSearchParams,
) -> Result<WebSearchOutput> {
    let request = MessagesRequest {
        model: config.model.clone(),
        max_tokens: params.max_tokens.unwrap_or(config.max_tokens),
        messages: vec![Message::user(params.query.clone())],
        temperature: Some(params.temperature.unwrap_or(config.temperature)),
        system: Some(
            params
                .system
                .unwrap_or_else(|| DEFAULT_SEARCH_SYSTEM_PROMPT.to_string()),
        ),
        tools: None,
    };

    let response = client.create_message(&request).await?;

    let mut text = String::new();
    let mut citations = Vec::new();
    for block in &response.content {
        if let ContentBlock::Text {
            text: block_text,
            citations: block_citations,
        } = block
        {
            text.push_str(block_text);
            if let Some(cites) = block_citations {
                citations.extend(cites.iter().cloned());
            }
        }
    }

    let mut search_performed = !citations.is_empty();
    if !search_performed {
        let query = params.query.to_lowercase();
        search_performed = RECENCY_KEYWORDS.iter().any(|kw| query.contains(kw));
    }

    Ok(WebSearchOutput {
        response: text,
        citations,
        search_performed,
        model: config.model.clone(),
        usage: UsageInfo::from_usage(&response.usage),
        stop_reason: response.stop_reason,
    })
}
