//! Orchestration loop semantics, driven end-to-end against the scripted
//! mock client.

use std::sync::Arc;

use serde_json::json;

use anthropic_rooms_addon::actions::run_chat;
use anthropic_rooms_addon::{
    AddonConfig, ChatParams, ContentBlock, Error, InMemoryObserver, InputSchema, Message,
    MessageContent, MessagesResponse, MockModelClient, PropertySchema, Role, ToolDefinition,
    ToolObserver, ToolRegistry, Usage,
};

fn test_config() -> AddonConfig {
    AddonConfig::from_value(json!({
        "id": "test_addon",
        "type": "agent",
        "name": "test",
        "description": "Test addon",
        "secrets": {"anthropic_api_key": "test_key"},
        "model": "claude-3-5-sonnet-20241022",
        "max_tokens": 1024
    }))
    .unwrap()
}

fn text_response(text: &str, input_tokens: u64, output_tokens: u64, stop: &str) -> MessagesResponse {
    MessagesResponse {
        content: vec![ContentBlock::text(text)],
        usage: Usage {
            input_tokens,
            output_tokens,
        },
        stop_reason: Some(stop.to_string()),
        model: None,
    }
}

fn tool_use_response(
    id: &str,
    name: &str,
    input: serde_json::Value,
    input_tokens: u64,
    output_tokens: u64,
) -> MessagesResponse {
    MessagesResponse {
        content: vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
        usage: Usage {
            input_tokens,
            output_tokens,
        },
        stop_reason: Some("tool_use".to_string()),
        model: None,
    }
}

fn add_tool(max_retries: u32) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::new("add", "Add two numbers")
            .input_schema(
                InputSchema::object()
                    .property("a", PropertySchema::typed("integer"))
                    .property("b", PropertySchema::typed("integer")),
            )
            .max_retries(max_retries),
        Arc::new(|input| {
            let a = input
                .get("a")
                .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
                .ok_or_else(|| anyhow::anyhow!("parameter a is not a number"))?;
            let b = input
                .get("b")
                .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
                .ok_or_else(|| anyhow::anyhow!("parameter b is not a number"))?;
            Ok(json!(a + b))
        }),
    );
    registry
}

fn failing_tool(name: &str, max_retries: u32) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::new(name, "Always fails").max_retries(max_retries),
        Arc::new(|_| Err(anyhow::anyhow!("boom"))),
    );
    registry
}

fn text_of(message: &Message) -> Option<&str> {
    match &message.content {
        MessageContent::Text(text) => Some(text),
        _ => None,
    }
}

#[tokio::test]
async fn test_text_only_response_is_one_round() {
    let client = MockModelClient::new();
    client.queue_response(text_response("2+2 equals 4.", 12, 8, "end_turn"));

    let config = test_config();
    let response = run_chat(
        &client,
        &config,
        ChatParams::new("What's 2+2?"),
        None,
        None,
        None,
    )
    .await;

    assert_eq!(response.code, 200);
    assert_eq!(response.output.response, "2+2 equals 4.");
    assert_eq!(response.output.stop_reason.as_deref(), Some("end_turn"));
    assert_eq!(response.output.usage.input_tokens, 12);
    assert_eq!(response.output.usage.output_tokens, 8);
    assert_eq!(
        response.output.usage.total_tokens,
        response.output.usage.input_tokens + response.output.usage.output_tokens
    );
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_multiple_text_blocks_concatenate_in_order() {
    let client = MockModelClient::new();
    client.queue_response(MessagesResponse {
        content: vec![ContentBlock::text("Hello, "), ContentBlock::text("world.")],
        usage: Usage {
            input_tokens: 1,
            output_tokens: 2,
        },
        stop_reason: Some("end_turn".to_string()),
        model: None,
    });

    let response = run_chat(
        &client,
        &test_config(),
        ChatParams::new("hi"),
        None,
        None,
        None,
    )
    .await;

    assert_eq!(response.output.response, "Hello, world.");
}

#[tokio::test]
async fn test_tool_round_trip_with_string_scalar_args() {
    let client = MockModelClient::new();
    client.queue_response(tool_use_response(
        "toolu_1",
        "add",
        json!({"a": "2", "b": "3"}),
        10,
        5,
    ));
    client.queue_response(text_response("The answer is 5.", 20, 7, "end_turn"));

    let registry = add_tool(1);
    let response = run_chat(
        &client,
        &test_config(),
        ChatParams::new("add 2 and 3"),
        Some(&registry),
        None,
        None,
    )
    .await;

    assert_eq!(response.code, 200);
    assert_eq!(response.output.response, "The answer is 5.");
    assert_eq!(client.call_count(), 2);

    // Second request: original user turn, assistant echo, tool results.
    let second = &client.recorded_calls()[1];
    assert_eq!(second.messages.len(), 3);
    assert_eq!(second.messages[0].role, Role::User);
    assert_eq!(second.messages[1].role, Role::Assistant);
    assert_eq!(second.messages[2].role, Role::User);
    match &second.messages[2].content {
        MessageContent::Blocks(blocks) => match &blocks[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => {
                assert_eq!(tool_use_id, "toolu_1");
                assert_eq!(content, "5");
            }
            other => panic!("expected tool_result, got {:?}", other),
        },
        other => panic!("expected blocks, got {:?}", other),
    }

    // Usage summed across both rounds.
    assert_eq!(response.output.usage.input_tokens, 30);
    assert_eq!(response.output.usage.output_tokens, 12);
    assert_eq!(response.output.usage.total_tokens, 42);
}

#[tokio::test]
async fn test_tools_are_advertised_sorted_by_name() {
    let client = MockModelClient::new();
    client.queue_response(text_response("ok", 1, 1, "end_turn"));

    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::new("zeta", "Z"),
        Arc::new(|_| Ok(json!("z"))),
    );
    registry.register(
        ToolDefinition::new("alpha", "A"),
        Arc::new(|_| Ok(json!("a"))),
    );

    run_chat(
        &client,
        &test_config(),
        ChatParams::new("hi"),
        Some(&registry),
        None,
        None,
    )
    .await;

    let tools = client.recorded_calls()[0].tools.clone().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

#[tokio::test]
async fn test_no_registry_means_no_tools_and_no_dispatch() {
    let client = MockModelClient::new();
    // A tool_use block arrives but no registry is wired: nothing to dispatch,
    // the run terminates after one round.
    client.queue_response(tool_use_response("toolu_1", "add", json!({}), 5, 5));

    let response = run_chat(
        &client,
        &test_config(),
        ChatParams::new("hi"),
        None,
        None,
        None,
    )
    .await;

    assert_eq!(response.code, 200);
    assert_eq!(client.call_count(), 1);
    assert!(client.recorded_calls()[0].tools.is_none());
}

#[tokio::test]
async fn test_unknown_tool_yields_not_found_result_block() {
    let client = MockModelClient::new();
    client.queue_response(tool_use_response("toolu_9", "ghost", json!({}), 5, 5));
    client.queue_response(text_response("I could not run that tool.", 5, 5, "end_turn"));

    let registry = add_tool(1);
    let recorder = Arc::new(InMemoryObserver::new());
    let observer: Arc<dyn ToolObserver> = recorder.clone();

    let response = run_chat(
        &client,
        &test_config(),
        ChatParams::new("hi"),
        Some(&registry),
        Some(observer),
        Some("addon-1"),
    )
    .await;

    assert_eq!(response.code, 200);
    let second = &client.recorded_calls()[1];
    match &second.messages.last().unwrap().content {
        MessageContent::Blocks(blocks) => match &blocks[0] {
            ContentBlock::ToolResult { content, .. } => {
                assert_eq!(content, "Error executing tool: Tool ghost not found");
            }
            other => panic!("expected tool_result, got {:?}", other),
        },
        other => panic!("expected blocks, got {:?}", other),
    }
    // Not-found never reaches the observer and never touches retry state.
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_retry_budget_exhaustion_with_two_retries() {
    let client = MockModelClient::new();
    // Three consecutive failures for max_retries = 2: two retry rounds, then
    // a terminal error result block the model gets to answer.
    client.queue_response(tool_use_response("toolu_1", "flaky", json!({}), 10, 1));
    client.queue_response(tool_use_response("toolu_2", "flaky", json!({}), 10, 1));
    client.queue_response(tool_use_response("toolu_3", "flaky", json!({}), 10, 1));
    client.queue_response(text_response("The tool kept failing.", 10, 4, "end_turn"));

    let registry = failing_tool("flaky", 2);
    let response = run_chat(
        &client,
        &test_config(),
        ChatParams::new("try the tool"),
        Some(&registry),
        None,
        None,
    )
    .await;

    assert_eq!(response.code, 200);
    assert_eq!(response.output.response, "The tool kept failing.");
    assert_eq!(client.call_count(), 4);

    // Retry rounds resend the conversation without an assistant/tool-result
    // pair; only the guidance message is added each time.
    let guidance =
        "The flaky tool failed with error: boom. Please try again with corrected parameters.";
    let second = &client.recorded_calls()[1];
    assert_eq!(second.messages.len(), 2);
    assert_eq!(text_of(&second.messages[1]), Some(guidance));

    let third = &client.recorded_calls()[2];
    assert_eq!(third.messages.len(), 3);
    assert_eq!(text_of(&third.messages[2]), Some(guidance));

    // The terminal failure produces an error result block in the fourth call.
    let fourth = &client.recorded_calls()[3];
    assert_eq!(fourth.messages.len(), 5);
    assert_eq!(fourth.messages[3].role, Role::Assistant);
    match &fourth.messages[4].content {
        MessageContent::Blocks(blocks) => match &blocks[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => {
                assert_eq!(tool_use_id, "toolu_3");
                assert_eq!(content, "Error executing tool: boom");
            }
            other => panic!("expected tool_result, got {:?}", other),
        },
        other => panic!("expected blocks, got {:?}", other),
    }

    // Usage summed across all four rounds.
    assert_eq!(response.output.usage.input_tokens, 40);
    assert_eq!(response.output.usage.output_tokens, 7);
    assert_eq!(response.output.usage.total_tokens, 47);
}

#[tokio::test]
async fn test_observer_sees_every_attempt_with_rising_retry_count() {
    let client = MockModelClient::new();
    client.queue_response(tool_use_response("toolu_1", "flaky", json!({}), 1, 1));
    client.queue_response(tool_use_response("toolu_2", "flaky", json!({}), 1, 1));
    client.queue_response(text_response("done", 1, 1, "end_turn"));

    let registry = failing_tool("flaky", 1);
    let recorder = Arc::new(InMemoryObserver::new());
    let observer: Arc<dyn ToolObserver> = recorder.clone();

    run_chat(
        &client,
        &test_config(),
        ChatParams::new("go"),
        Some(&registry),
        Some(observer),
        Some("addon-7"),
    )
    .await;

    let seen = recorder.observations();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].retry_attempt, 0);
    assert_eq!(seen[1].retry_attempt, 1);
    assert!(seen.iter().all(|o| !o.success));
    assert!(seen.iter().all(|o| o.addon_id == "addon-7"));
    assert!(seen.iter().all(|o| o.max_retries == 1));
    assert!(seen.iter().all(|o| o.execution_time_ms >= 0.0));
}

#[tokio::test]
async fn test_prior_history_precedes_new_message() {
    let client = MockModelClient::new();
    client.queue_response(text_response("blue", 1, 1, "end_turn"));

    let params = ChatParams::new("and my favorite color?").history(vec![
        Message::user("My name is Sam."),
        Message::assistant("Nice to meet you, Sam."),
    ]);

    run_chat(&client, &test_config(), params, None, None, None).await;

    let first = &client.recorded_calls()[0];
    assert_eq!(first.messages.len(), 3);
    assert_eq!(text_of(&first.messages[0]), Some("My name is Sam."));
    assert_eq!(text_of(&first.messages[2]), Some("and my favorite color?"));
}

#[tokio::test]
async fn test_config_defaults_flow_into_request() {
    let client = MockModelClient::new();
    client.queue_response(text_response("ok", 1, 1, "end_turn"));

    run_chat(
        &client,
        &test_config(),
        ChatParams::new("hi").system("Be terse."),
        None,
        None,
        None,
    )
    .await;

    let first = &client.recorded_calls()[0];
    assert_eq!(first.model, "claude-3-5-sonnet-20241022");
    assert_eq!(first.max_tokens, 1024);
    assert_eq!(first.temperature, Some(0.7));
    assert_eq!(first.system.as_deref(), Some("Be terse."));
}

#[tokio::test]
async fn test_remote_failure_becomes_structured_500() {
    let client = MockModelClient::new();
    client.queue_error(Error::Remote {
        status: 529,
        class: "overloaded_error".to_string(),
        message: "Overloaded".to_string(),
    });

    let response = run_chat(
        &client,
        &test_config(),
        ChatParams::new("hi"),
        None,
        None,
        None,
    )
    .await;

    assert_eq!(response.code, 500);
    assert!(response.output.response.starts_with("Error:"));
    assert_eq!(response.output.stop_reason.as_deref(), Some("error"));
    assert_eq!(response.output.usage.total_tokens, 0);
    assert_eq!(response.output.model, "claude-3-5-sonnet-20241022");
    assert!(response.message.starts_with("Chat completion failed:"));
    assert_eq!(response.tokens.step_amount, 0);
}

#[tokio::test]
async fn test_remote_failure_mid_loop_is_caught() {
    let client = MockModelClient::new();
    client.queue_response(tool_use_response("toolu_1", "add", json!({"a": 1, "b": 2}), 5, 5));
    client.queue_error(Error::Remote {
        status: 500,
        class: "api_error".to_string(),
        message: "Internal server error".to_string(),
    });

    let registry = add_tool(1);
    let response = run_chat(
        &client,
        &test_config(),
        ChatParams::new("add"),
        Some(&registry),
        None,
        None,
    )
    .await;

    assert_eq!(response.code, 500);
    assert_eq!(response.output.usage.total_tokens, 0);
}

#[tokio::test]
async fn test_structured_tool_output_rendered_as_json() {
    let client = MockModelClient::new();
    client.queue_response(tool_use_response("toolu_1", "lookup", json!({}), 1, 1));
    client.queue_response(text_response("done", 1, 1, "end_turn"));

    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::new("lookup", "Look up a record"),
        Arc::new(|_| Ok(json!({"name": "Sam", "age": 7}))),
    );

    run_chat(
        &client,
        &test_config(),
        ChatParams::new("look it up"),
        Some(&registry),
        None,
        None,
    )
    .await;

    let second = &client.recorded_calls()[1];
    match &second.messages.last().unwrap().content {
        MessageContent::Blocks(blocks) => match &blocks[0] {
            ContentBlock::ToolResult { content, .. } => {
                let parsed: serde_json::Value = serde_json::from_str(content).unwrap();
                assert_eq!(parsed, json!({"name": "Sam", "age": 7}));
            }
            other => panic!("expected tool_result, got {:?}", other),
        },
        other => panic!("expected blocks, got {:?}", other),
    }
}
