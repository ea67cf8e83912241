//! Core type definitions (messages, content blocks, usage).

pub mod message;
pub mod usage;

pub use message::{Citation, ContentBlock, DocumentSource, Message, MessageContent, Role};
pub use usage::{Usage, UsageAccumulator, UsageInfo};
