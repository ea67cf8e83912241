//! Tool execution adapter.
//!
//! Executes one `tool_use` request end to end: look up the function, repair
//! its arguments, invoke it, classify the result, and decide between
//! success, a retry round, and a terminal failure. Retry bookkeeping lives
//! in the per-run [`RunContext`]; a retry appends guidance for the model
//! directly to the conversation.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::coerce::coerce_tool_input;
use super::registry::ToolRegistry;
use super::ToolInput;
use crate::context::RunContext;
use crate::observer::{ToolObservation, ToolObserver};
use crate::types::Message;

/// Outcome of dispatching one tool-use block.
///
/// `RetryRequested` means guidance was appended to the conversation and the
/// orchestrator should run another round without producing a result block
/// for this invocation. Terminal variants end the block's participation in
/// the run.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDispatch {
    Success(Value),
    RetryRequested,
    TerminalFailure(String),
}

/// Success/failure verdict over a tool's raw return value.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub ok: bool,
    pub error_message: Option<String>,
}

impl Classified {
    pub fn success() -> Self {
        Self {
            ok: true,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_message: Some(message.into()),
        }
    }
}

/// Strategy deciding whether a tool's return value is a failure.
pub type Classifier = Arc<dyn Fn(&Value) -> Classified + Send + Sync>;

/// Default classifier: a numeric `code` field >= 400 is a failure with the
/// message taken from `message`; everything else, including the absence of
/// any code, is success.
pub fn classify_by_status(value: &Value) -> Classified {
    let code = value.get("code").and_then(Value::as_i64);
    match code {
        Some(code) if code >= 400 => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Tool execution completed with errors")
                .to_string();
            Classified::failure(message)
        }
        _ => Classified::success(),
    }
}

/// Execute one tool-use request with retry semantics.
pub(crate) async fn execute_tool(
    name: &str,
    raw_input: &Value,
    registry: &ToolRegistry,
    ctx: &mut RunContext,
    observer: Option<&Arc<dyn ToolObserver>>,
    addon_id: Option<&str>,
) -> ToolDispatch {
    let max_retries = registry.get_max_retries(name);
    let current_retry = ctx.retry_count(name);

    let Some(entry) = registry.get_entry(name) else {
        // Nothing to retry; terminal for this block, counter untouched.
        error!(tool = name, "requested tool is not registered");
        return ToolDispatch::TerminalFailure(format!("Tool {} not found", name));
    };

    let input: ToolInput = raw_input.as_object().cloned().unwrap_or_default();
    let parsed = coerce_tool_input(input, &entry.definition.input_schema, name);

    debug!(tool = name, retry = current_retry, "executing tool");
    let start = Instant::now();
    let invoked = (entry.function)(&parsed);
    let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    match invoked {
        Ok(result) => {
            let classified = (entry.classifier)(&result);

            report(
                observer,
                addon_id,
                ToolObservation {
                    tool_name: name.to_string(),
                    addon_id: addon_id.unwrap_or_default().to_string(),
                    input_parameters: parsed,
                    output_data: Some(wrap_output(&result)),
                    execution_time_ms,
                    success: classified.ok,
                    error_message: classified.error_message.clone(),
                    retry_attempt: current_retry,
                    max_retries,
                },
            )
            .await;

            if classified.ok {
                return ToolDispatch::Success(result);
            }

            let message = classified
                .error_message
                .unwrap_or_else(|| "Tool execution completed with errors".to_string());
            fail_or_retry(name, message, current_retry, max_retries, ctx)
        }
        Err(e) => {
            let message = e.to_string();

            report(
                observer,
                addon_id,
                ToolObservation {
                    tool_name: name.to_string(),
                    addon_id: addon_id.unwrap_or_default().to_string(),
                    input_parameters: parsed,
                    output_data: None,
                    execution_time_ms,
                    success: false,
                    error_message: Some(message.clone()),
                    retry_attempt: current_retry,
                    max_retries,
                },
            )
            .await;

            fail_or_retry(name, message, current_retry, max_retries, ctx)
        }
    }
}

fn fail_or_retry(
    name: &str,
    message: String,
    current_retry: u32,
    max_retries: u32,
    ctx: &mut RunContext,
) -> ToolDispatch {
    if current_retry >= max_retries {
        error!(tool = name, error = %message, "tool failed, retry budget exhausted");
        return ToolDispatch::TerminalFailure(message);
    }

    warn!(tool = name, retry = current_retry + 1, error = %message, "tool failed, retrying");
    ctx.record_retry(name);
    ctx.conversation.push(Message::user(format!(
        "The {} tool failed with error: {}. Please try again with corrected parameters.",
        name, message
    )));
    ToolDispatch::RetryRequested
}

/// Observer reporting is fire-and-forget: only when both an observer and an
/// addon id are present, and its own failures are swallowed.
async fn report(
    observer: Option<&Arc<dyn ToolObserver>>,
    addon_id: Option<&str>,
    observation: ToolObservation,
) {
    if let (Some(observer), Some(_)) = (observer, addon_id) {
        let _ = observer.notify(observation).await;
    }
}

/// Observers always receive an object: non-object outputs are wrapped.
fn wrap_output(result: &Value) -> Value {
    if result.is_object() {
        result.clone()
    } else {
        serde_json::json!({ "result": result })
    }
}
