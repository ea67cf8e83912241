//! # anthropic-rooms-addon
//!
//! Rooms addon exposing conversational AI capabilities backed by the
//! Anthropic Messages API: chat completion with tool calling, file analysis,
//! and web search.
//!
//! ## Overview
//!
//! The centerpiece is the tool-calling orchestration loop inside chat
//! completion: the model can request execution of host-registered functions,
//! the addon runs them, feeds results back, retries failed tools within a
//! per-tool budget, and loops until the model stops requesting tools.
//! Everything else (configuration validation, credential storage, the
//! search and file-analysis actions) is thin glue around the same client.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anthropic_rooms_addon::{Addon, ChatParams};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anthropic_rooms_addon::Result<()> {
//!     let mut addon = Addon::new();
//!     addon.load_config(json!({
//!         "id": "my-addon",
//!         "type": "agent",
//!         "name": "assistant",
//!         "description": "Anthropic-backed assistant",
//!         "secrets": {"anthropic_api_key": "sk-..."}
//!     }));
//!
//!     let reply = addon
//!         .chat_completion(ChatParams::new("What's 2+2?"))
//!         .await?;
//!     println!("{}", reply.output.response);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`addon`] | The addon facade: lifecycle, wiring, action entry points |
//! | [`actions`] | Chat completion orchestrator, file analysis, web search |
//! | [`tools`] | Tool definitions, registry, input repair, execution adapter |
//! | [`client`] | The `ModelClient` seam, Anthropic HTTP client, scripted mock |
//! | [`config`] | Addon configuration loading and validation |
//! | [`credentials`] | Credential registry with keyring/env fallback |
//! | [`observer`] | Fire-and-forget tool execution observer hook |
//! | [`types`] | Messages, content blocks, usage accounting |

pub mod actions;
pub mod addon;
pub mod client;
pub mod config;
pub mod context;
pub mod credentials;
pub mod observer;
pub mod tools;
pub mod types;

// Re-export main types for convenience
pub use actions::{
    ActionResponse, ChatOutput, ChatParams, FileAnalysisOutput, FileAnalysisParams, FileInfo,
    TokensSchema, WebSearchOutput, WebSearchParams,
};
pub use addon::Addon;
pub use client::{AnthropicClient, MessagesRequest, MessagesResponse, MockModelClient, ModelClient};
pub use config::AddonConfig;
pub use credentials::CredentialsRegistry;
pub use observer::{InMemoryObserver, NoopObserver, ToolObservation, ToolObserver};
pub use tools::{
    InputSchema, PropertySchema, ToolDefinition, ToolDispatch, ToolFn, ToolGroupConfig,
    ToolRegistry,
};
pub use types::{Citation, ContentBlock, Message, MessageContent, Role, Usage, UsageInfo};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
