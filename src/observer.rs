//! Tool execution observer hook.
//!
//! Hosts can watch tool executions (timing, success, retries) without being
//! able to affect them: reporting is fire-and-forget and a failing observer
//! never aborts a run.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::ToolInput;
use crate::Result;

/// One observed tool execution.
#[derive(Debug, Clone)]
pub struct ToolObservation {
    pub tool_name: String,
    pub addon_id: String,
    pub input_parameters: ToolInput,
    /// The tool's raw output; non-object outputs are wrapped as
    /// `{"result": ...}`. Absent when the tool raised.
    pub output_data: Option<Value>,
    pub execution_time_ms: f64,
    pub success: bool,
    pub error_message: Option<String>,
    pub retry_attempt: u32,
    pub max_retries: u32,
}

/// Destination for tool execution reports.
#[async_trait]
pub trait ToolObserver: Send + Sync {
    async fn notify(&self, observation: ToolObservation) -> Result<()>;
}

/// Default observer: discards everything.
pub struct NoopObserver;

#[async_trait]
impl ToolObserver for NoopObserver {
    async fn notify(&self, _observation: ToolObservation) -> Result<()> {
        Ok(())
    }
}

/// In-memory recording observer for testing.
#[derive(Default)]
pub struct InMemoryObserver {
    observations: Arc<Mutex<Vec<ToolObservation>>>,
}

impl InMemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observations(&self) -> Vec<ToolObservation> {
        self.observations.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.observations.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.observations.lock().unwrap().clear();
    }
}

#[async_trait]
impl ToolObserver for InMemoryObserver {
    async fn notify(&self, observation: ToolObservation) -> Result<()> {
        self.observations.lock().unwrap().push(observation);
        Ok(())
    }
}
