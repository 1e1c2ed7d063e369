//! Mock LLM client for testing.
//!
//! Replays a scripted list of responses and records every request, so agent
//! behavior can be tested without API calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{GateError, Result};
use crate::llm::tools::{ToolDefinition, EXECUTE_QUERY_TOOL};
use crate::llm::types::{LlmResponse, Message, ToolCall};
use crate::llm::LlmClient;

/// Text returned once the script runs out.
pub const MOCK_FALLBACK_TEXT: &str = "I don't have anything more to try.";

/// Mock LLM client that returns canned responses in order.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<LlmResponse>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    calls_issued: Mutex<usize>,
}

impl MockLlmClient {
    /// Creates a new mock client with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an `execute_query` tool call carrying `query`.
    pub fn with_query(self, query: impl Into<String>) -> Self {
        let arguments = serde_json::json!({ "query": query.into() }).to_string();
        let id = self.next_call_id();
        self.push(Ok(LlmResponse::with_tool_calls(
            "",
            vec![ToolCall::new(id, EXECUTE_QUERY_TOOL, arguments)],
        )))
    }

    /// Queues a plain-text reply.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(LlmResponse::text(text)))
    }

    /// Queues an arbitrary response.
    pub fn with_response(self, response: LlmResponse) -> Self {
        self.push(Ok(response))
    }

    /// Queues a transport error.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Err(GateError::llm(message)))
    }

    /// Returns a handle to the message lists this client has received.
    pub fn requests(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        Arc::clone(&self.requests)
    }

    fn next_call_id(&self) -> String {
        let mut issued = match self.calls_issued.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *issued += 1;
        format!("mock_call_{}", *issued)
    }

    fn push(self, response: Result<LlmResponse>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response);
        }
        self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete_with_tools(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }

        let next = self
            .script
            .lock()
            .map_err(|_| GateError::internal("mock script poisoned"))?
            .pop_front();

        next.unwrap_or_else(|| Ok(LlmResponse::text(MOCK_FALLBACK_TEXT)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_script() {
        let client = MockLlmClient::new()
            .with_query("SELECT COUNT(*) FROM sqlite_master")
            .with_text("There are 11 tables.");
        let messages = vec![Message::user("How many tables are there?")];

        let first = client.complete_with_tools(&messages, &[]).await.unwrap();
        assert_eq!(first.tool_calls[0].name, "execute_query");
        assert_eq!(first.tool_calls[0].id, "mock_call_1");
        assert!(first.tool_calls[0].arguments.contains("sqlite_master"));

        let second = client.complete_with_tools(&messages, &[]).await.unwrap();
        assert_eq!(second.content, "There are 11 tables.");

        let third = client.complete_with_tools(&messages, &[]).await.unwrap();
        assert_eq!(third.content, MOCK_FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let client = MockLlmClient::new();
        let requests = client.requests();

        client
            .complete_with_tools(&[Message::user("hi")], &[])
            .await
            .unwrap();

        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_error() {
        let client = MockLlmClient::new().with_error("Rate limited");
        let err = client.complete_with_tools(&[], &[]).await.unwrap_err();
        assert!(matches!(err, GateError::Llm(_)));
    }

    #[tokio::test]
    async fn test_mock_call_ids_are_unique() {
        let client = MockLlmClient::new().with_query("SELECT 1").with_query("SELECT 2");
        let a = client.complete_with_tools(&[], &[]).await.unwrap();
        let b = client.complete_with_tools(&[], &[]).await.unwrap();
        assert_ne!(a.tool_calls[0].id, b.tool_calls[0].id);
    }
}
