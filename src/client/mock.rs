//! Queue-based mock client for testing.
//!
//! [`MockModelClient`] lets tests control exactly what responses and errors
//! the remote model returns, without touching the network. Every call records
//! its request for later assertion.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    FileMetadata, FileUploadRequest, MessagesRequest, MessagesResponse, ModelClient,
};
use crate::{Error, Result};

/// A scripted fake implementing [`ModelClient`].
///
/// Push responses with [`queue_response`](Self::queue_response) and errors
/// with [`queue_error`](Self::queue_error); each `create_message` call pops
/// from the front.
///
/// # Panics
///
/// `create_message` panics if the response queue is empty; an empty queue in
/// a test means the orchestrator made more round-trips than the test
/// scripted.
#[derive(Default)]
pub struct MockModelClient {
    responses: Mutex<VecDeque<Result<MessagesResponse>>>,
    uploads: Mutex<VecDeque<Result<FileMetadata>>>,
    calls: Mutex<Vec<MessagesRequest>>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_response(&self, response: MessagesResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: Error) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_upload(&self, metadata: FileMetadata) {
        self.uploads.lock().unwrap().push_back(Ok(metadata));
    }

    /// Requests seen so far, in call order.
    pub fn recorded_calls(&self) -> Vec<MessagesRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn create_message(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockModelClient: response queue is empty")
    }

    async fn upload_file(&self, _upload: &FileUploadRequest) -> Result<FileMetadata> {
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockModelClient: upload queue is empty")
    }
}
