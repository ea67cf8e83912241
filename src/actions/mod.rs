//! Addon actions and their shared response envelope.

use serde::{Deserialize, Serialize};

pub mod chat;
pub mod file_analysis;
pub mod web_search;

pub use chat::{chat_completion, run_chat, ChatOutput, ChatParams};
pub use file_analysis::{
    file_analysis, run_file_analysis, FileAnalysisOutput, FileAnalysisParams, FileInfo,
};
pub use web_search::{run_web_search, web_search, WebSearchOutput, WebSearchParams};

/// Token accounting in the host's wire casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensSchema {
    #[serde(rename = "stepAmount")]
    pub step_amount: u64,
    #[serde(rename = "totalCurrentAmount")]
    pub total_current_amount: u64,
}

impl TokensSchema {
    pub fn new(step_amount: u64, total_current_amount: u64) -> Self {
        Self {
            step_amount,
            total_current_amount,
        }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }
}

/// Envelope returned by every action: the typed output plus token
/// accounting, a human-readable status message, and an HTTP-like code
/// (200 on success, 500 on any caught failure).
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse<T> {
    pub output: T,
    pub tokens: TokensSchema,
    pub message: String,
    pub code: u16,
}

impl<T> ActionResponse<T> {
    pub fn success(output: T, tokens: TokensSchema, message: impl Into<String>) -> Self {
        Self {
            output,
            tokens,
            message: message.into(),
            code: 200,
        }
    }

    pub fn failure(output: T, message: impl Into<String>) -> Self {
        Self {
            output,
            tokens: TokensSchema::zero(),
            message: message.into(),
            code: 500,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code < 400
    }
}
