//! Conversation message format for the Anthropic Messages API

use serde::{Deserialize, Serialize};

/// A single conversation message.
///
/// System text is not a message role here; the Messages API takes it as a
/// top-level `system` parameter on the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
        }
    }

    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message content (can be a string or an array of content blocks)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text(text.into())
    }

    pub fn blocks(blocks: Vec<ContentBlock>) -> Self {
        MessageContent::Blocks(blocks)
    }
}

/// Content block (model output, tool results, file attachments)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        citations: Option<Vec<Citation>>,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    #[serde(rename = "document")]
    Document { source: DocumentSource },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text {
            text: text.into(),
            citations: None,
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
        }
    }

    pub fn file_document(file_id: impl Into<String>) -> Self {
        ContentBlock::Document {
            source: DocumentSource {
                source_type: "file".to_string(),
                file_id: file_id.into(),
            },
        }
    }
}

/// Source of a document block: an already-uploaded file referenced by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub file_id: String,
}

/// A web source the model cited in a text block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_serializes_as_plain_string() {
        let msg = Message::user("hello");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["role"], "user");
        assert_eq!(v["content"], "hello");
    }

    #[test]
    fn test_block_content_round_trip() {
        let msg = Message::user_blocks(vec![ContentBlock::tool_result("toolu_1", "42")]);
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["content"][0]["type"], "tool_result");
        assert_eq!(v["content"][0]["tool_use_id"], "toolu_1");

        let back: Message = serde_json::from_value(v).unwrap();
        match back.content {
            MessageContent::Blocks(blocks) => assert_eq!(blocks.len(), 1),
            _ => panic!("expected blocks"),
        }
    }

    #[test]
    fn test_tool_use_block_deserializes() {
        let v = serde_json::json!({
            "type": "tool_use",
            "id": "toolu_abc",
            "name": "add",
            "input": {"a": 2, "b": 3}
        });
        let block: ContentBlock = serde_json::from_value(v).unwrap();
        match block {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "toolu_abc");
                assert_eq!(name, "add");
                assert_eq!(input["a"], 2);
            }
            _ => panic!("expected tool_use"),
        }
    }

    #[test]
    fn test_text_block_with_citations() {
        let v = serde_json::json!({
            "type": "text",
            "text": "According to the docs",
            "citations": [{"title": "Docs", "url": "https://example.com"}]
        });
        let block: ContentBlock = serde_json::from_value(v).unwrap();
        match block {
            ContentBlock::Text { citations, .. } => {
                let cites = citations.unwrap();
                assert_eq!(cites.len(), 1);
                assert_eq!(cites[0].title, "Docs");
                assert!(cites[0].snippet.is_none());
            }
            _ => panic!("expected text"),
        }
    }
}
