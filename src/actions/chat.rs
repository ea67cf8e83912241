//! Chat completion with tool-calling orchestration.
//!
//! The orchestrator drives rounds against the remote model: send the
//! conversation, interpret the returned content blocks, dispatch any
//! `tool_use` blocks through the execution adapter, merge the outcomes back
//! into the conversation, and loop until the model stops requesting tools.
//!
//! A retry round is special: the adapter has already appended its guidance
//! message to the conversation, so the round's assistant/tool-result pair is
//! not appended; resending a tool-result turn when no tool actually
//! completed would be malformed.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use super::{ActionResponse, TokensSchema};
use crate::client::{AnthropicClient, MessagesRequest, MessagesResponse, ModelClient};
use crate::config::AddonConfig;
use crate::context::RunContext;
use crate::observer::ToolObserver;
use crate::tools::execute::{execute_tool, ToolDispatch};
use crate::tools::{ToolDefinition, ToolRegistry};
use crate::types::{ContentBlock, Message, UsageInfo};
use crate::Result;

/// Parameters for one chat completion call.
#[derive(Debug, Clone, Default)]
pub struct ChatParams {
    /// User message to send
    pub message: String,
    /// Prior conversation history
    pub messages: Vec<Message>,
    /// Max tokens (overrides config default)
    pub max_tokens: Option<u32>,
    /// Temperature (overrides config default)
    pub temperature: Option<f64>,
    /// System prompt
    pub system: Option<String>,
}

impl ChatParams {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn history(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
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

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Chat completion output.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutput {
    /// The model's response text, text blocks concatenated in block order
    pub response: String,
    /// Model used
    pub model: String,
    /// Token usage across every round of the run
    pub usage: UsageInfo,
    /// Why the model stopped generating, from the final round
    pub stop_reason: Option<String>,
}

/// Run a chat completion against the production Anthropic client.
///
/// Never returns an error: any failure (missing API key, remote call
/// failure, anything else) is converted into a structured 500 response
/// with zeroed usage and an `"error"` stop reason.
pub async fn chat_completion(
    config: &AddonConfig,
    params: ChatParams,
    registry: Option<&ToolRegistry>,
    observer: Option<Arc<dyn ToolObserver>>,
    addon_id: Option<&str>,
) -> ActionResponse<ChatOutput> {
    debug!(message = %truncate(&params.message, 100), "executing chat_completion");

    let client = match config.api_key().and_then(AnthropicClient::new) {
        Ok(client) => client,
        Err(e) => return failure_response(config, e),
    };

    run_chat(&client, config, params, registry, observer, addon_id).await
}

/// Run a chat completion against any [`ModelClient`].
///
/// The seam used by tests and by hosts bringing their own transport; same
/// catch-all semantics as [`chat_completion`].
pub async fn run_chat(
    client: &dyn ModelClient,
    config: &AddonConfig,
    params: ChatParams,
    registry: Option<&ToolRegistry>,
    observer: Option<Arc<dyn ToolObserver>>,
    addon_id: Option<&str>,
) -> ActionResponse<ChatOutput> {
    match orchestrate(client, config, params, registry, observer, addon_id).await {
        Ok(output) => {
            info!(
                total_tokens = output.usage.total_tokens,
                "chat completion successful"
            );
            let total = output.usage.total_tokens;
            ActionResponse::success(
                output,
                TokensSchema::new(total, total),
                "Chat completion successful",
            )
        }
        Err(e) => failure_response(config, e),
    }
}

fn failure_response(config: &AddonConfig, error: crate::Error) -> ActionResponse<ChatOutput> {
    error!(error = %error, "chat completion failed");
    ActionResponse::failure(
        ChatOutput {
            response: format!("Error: {}", error),
            model: config.model.clone(),
            usage: UsageInfo::zero(),
            stop_reason: Some("error".to_string()),
        },
        format!("Chat completion failed: {}", error),
    )
}

async fn orchestrate(
    client: &dyn ModelClient,
    config: &AddonConfig,
    params: ChatParams,
    registry: Option<&ToolRegistry>,
    observer: Option<Arc<dyn ToolObserver>>,
    addon_id: Option<&str>,
) -> Result<ChatOutput> {
    let model = config.model.clone();
    let max_tokens = params.max_tokens.unwrap_or(config.max_tokens);
    let temperature = Some(params.temperature.unwrap_or(config.temperature));

    let advertised = advertised_tools(registry);
    if let Some(tools) = &advertised {
        debug!(
            tools = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "advertising tools to the model"
        );
    }

    let mut conversation = params.messages;
    conversation.push(Message::user(params.message));
    let mut ctx = RunContext::new(conversation);

    let make_request = |messages: &[Message]| MessagesRequest {
        model: model.clone(),
        max_tokens,
        messages: messages.to_vec(),
        temperature,
        system: params.system.clone(),
        tools: advertised.clone(),
    };

    let mut response = client.create_message(&make_request(&ctx.conversation)).await?;
    ctx.usage.add(&response.usage);
    let mut stop_reason = response.stop_reason.clone();
    let mut answer = String::new();

    loop {
        let round = process_round(
            &response,
            registry,
            &mut ctx,
            observer.as_ref(),
            addon_id,
            &mut answer,
        )
        .await;

        if round.tool_results.is_empty() && !round.should_retry {
            break;
        }

        if !round.should_retry {
            // Echo the model's turn, then answer it with the round's results.
            ctx.conversation
                .push(Message::assistant_blocks(response.content.clone()));
            ctx.conversation
                .push(Message::user_blocks(round.tool_results));
        }

        debug!(round = ctx.usage.rounds() + 1, "calling the model again");
        response = client.create_message(&make_request(&ctx.conversation)).await?;
        ctx.usage.add(&response.usage);
        stop_reason = response.stop_reason.clone();
    }

    Ok(ChatOutput {
        response: answer,
        model,
        usage: ctx.usage.into_info(),
        stop_reason,
    })
}

struct RoundOutcome {
    tool_results: Vec<ContentBlock>,
    should_retry: bool,
}

/// Interpret one response: accumulate text, dispatch tool-use blocks in
/// block order, one at a time.
async fn process_round(
    response: &MessagesResponse,
    registry: Option<&ToolRegistry>,
    ctx: &mut RunContext,
    observer: Option<&Arc<dyn ToolObserver>>,
    addon_id: Option<&str>,
    answer: &mut String,
) -> RoundOutcome {
    let mut tool_results = Vec::new();
    let mut should_retry = false;

    for block in &response.content {
        match block {
            ContentBlock::Text { text, .. } => answer.push_str(text),
            ContentBlock::ToolUse { id, name, input } => {
                let Some(registry) = registry else { continue };
                debug!(tool = %name, "dispatching tool use");

                match execute_tool(name, input, registry, ctx, observer, addon_id).await {
                    ToolDispatch::Success(value) => {
                        debug!(tool = %name, "tool executed successfully");
                        tool_results
                            .push(ContentBlock::tool_result(id.clone(), render_result(&value)));
                    }
                    ToolDispatch::RetryRequested => should_retry = true,
                    ToolDispatch::TerminalFailure(message) => {
                        error!(tool = %name, error = %message, "tool execution failed");
                        tool_results.push(ContentBlock::tool_result(
                            id.clone(),
                            format!("Error executing tool: {}", message),
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    RoundOutcome {
        tool_results,
        should_retry,
    }
}

fn advertised_tools(registry: Option<&ToolRegistry>) -> Option<Vec<ToolDefinition>> {
    let exported = registry?.export();
    if exported.is_empty() {
        return None;
    }
    let mut tools: Vec<ToolDefinition> = exported.into_values().collect();
    tools.sort_by(|a, b| a.name.cmp(&b.name));
    Some(tools)
}

/// String representation fed back to the model: strings verbatim, anything
/// else as compact JSON.
fn render_result(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_result_string_is_verbatim() {
        assert_eq!(render_result(&json!("plain")), "plain");
    }

    #[test]
    fn test_render_result_structured_is_json() {
        assert_eq!(render_result(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(render_result(&json!(5)), "5");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 100), "hi");
    }
}
