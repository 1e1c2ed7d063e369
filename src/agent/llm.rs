//! Language-model agent.
//!
//! Drives an [`LlmClient`] through a tool-calling conversation: the model
//! calls `execute_query`, the candidate goes through the gateway, and the
//! gateway's text comes back as that call's tool result.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Agent;
use crate::db::Schema;
use crate::error::Result;
use crate::llm::{
    build_messages, execute_query_definition, parse_llm_response, LlmClient, Message,
    PromptRules, ToolCall, ToolDefinition, EXECUTE_QUERY_TOOL,
};
use crate::llm::tools::parse_execute_query_input;
use crate::query::ERROR_PREFIX;

/// Tool result for calls beyond the first in one model turn.
const SKIPPED_CALL_TEXT: &str = "Error: Only one query runs per attempt; this call was skipped.";

/// Agent backed by a language model with tool calling.
pub struct LlmAgent {
    client: Box<dyn LlmClient>,
    schema: Schema,
    rules: PromptRules,
    tools: Vec<ToolDefinition>,
    messages: Vec<Message>,
    /// Calls from the last model turn still waiting for a tool result.
    pending_calls: Vec<ToolCall>,
}

impl LlmAgent {
    /// Creates an agent for a database with the given schema.
    pub fn new(client: Box<dyn LlmClient>, schema: Schema, rules: PromptRules) -> Self {
        Self {
            client,
            schema,
            rules,
            tools: vec![execute_query_definition()],
            messages: Vec::new(),
            pending_calls: Vec::new(),
        }
    }

    /// Returns the conversation so far.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Answers the pending tool calls: `text` for the first, a skip notice for the rest.
    ///
    /// Returns false if there was no pending call to answer.
    fn answer_pending_calls(&mut self, text: &str) -> bool {
        let mut calls = std::mem::take(&mut self.pending_calls).into_iter();
        let Some(first) = calls.next() else {
            return false;
        };
        self.messages.push(Message::tool_result(first.id, text));
        for skipped in calls {
            self.messages
                .push(Message::tool_result(skipped.id, SKIPPED_CALL_TEXT));
        }
        true
    }

    /// Picks the candidate query out of a tool call's arguments.
    ///
    /// Unusable arguments are passed on as-is; the validator rejects them and
    /// the model sees why.
    fn candidate_from_call(call: &ToolCall) -> String {
        if call.name != EXECUTE_QUERY_TOOL {
            warn!(tool = %call.name, "Model called an unknown tool");
            return call.arguments.clone();
        }
        match parse_execute_query_input(&call.arguments) {
            Ok(input) => input.query,
            Err(reason) => {
                debug!(%reason, "Unparseable tool arguments");
                call.arguments.clone()
            }
        }
    }
}

#[async_trait]
impl Agent for LlmAgent {
    async fn propose(&mut self, request: &str, feedback: Option<&str>) -> Result<String> {
        if self.messages.is_empty() {
            self.messages = build_messages(&self.schema, &self.rules, request);
        }

        if let Some(feedback) = feedback {
            if !self.answer_pending_calls(feedback) {
                // The model answered in plain text last time; reply in kind.
                self.messages.push(Message::user(format!(
                    "The query failed. Revise it and call {EXECUTE_QUERY_TOOL} again.\n{feedback}"
                )));
            }
        }

        let response = self
            .client
            .complete_with_tools(&self.messages, &self.tools)
            .await?;

        if response.has_tool_calls() {
            let candidate = Self::candidate_from_call(&response.tool_calls[0]);
            self.messages.push(Message::assistant_tool_calls(
                response.content,
                response.tool_calls.clone(),
            ));
            self.pending_calls = response.tool_calls;
            return Ok(candidate);
        }

        let parsed = parse_llm_response(&response.content);
        let candidate = parsed.candidate_query().to_string();
        self.messages.push(Message::assistant(response.content));
        Ok(candidate)
    }

    async fn summarize(&mut self, rows: &str) -> Result<String> {
        if !self.answer_pending_calls(rows) {
            self.messages
                .push(Message::user(format!("The query returned:\n{rows}")));
        }

        let response = self
            .client
            .complete_with_tools(&self.messages, &self.tools)
            .await?;

        let answer = response.content.trim();
        if answer.is_empty() || answer.starts_with(ERROR_PREFIX) {
            return Ok(rows.to_string());
        }
        self.messages.push(Message::assistant(answer));
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, MockLlmClient, Role};

    fn rules() -> PromptRules {
        PromptRules {
            attempt_cap: 5,
            row_limit: 5,
            forbidden_keywords: vec!["DROP".to_string()],
        }
    }

    #[tokio::test]
    async fn test_tool_call_becomes_candidate() {
        let client = MockLlmClient::new().with_query("SELECT COUNT(*) FROM sqlite_master");
        let mut agent = LlmAgent::new(Box::new(client), Schema::new(), rules());

        let candidate = agent.propose("How many tables are there?", None).await.unwrap();

        assert_eq!(candidate, "SELECT COUNT(*) FROM sqlite_master");
        assert_eq!(agent.messages()[0].role, Role::System);
        assert_eq!(agent.messages()[1].content, "How many tables are there?");
        assert_eq!(agent.messages()[2].tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn test_feedback_is_sent_as_tool_result() {
        let client = MockLlmClient::new()
            .with_query("SELECT * FROM nonexistent")
            .with_query("SELECT Name FROM artists");
        let requests = client.requests();
        let mut agent = LlmAgent::new(Box::new(client), Schema::new(), rules());

        agent.propose("q", None).await.unwrap();
        let second = agent
            .propose("q", Some("Error: no such table: nonexistent"))
            .await
            .unwrap();

        assert_eq!(second, "SELECT Name FROM artists");
        let requests = requests.lock().unwrap();
        let last = requests[1].last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("mock_call_1"));
        assert_eq!(last.content, "Error: no such table: nonexistent");
    }

    #[tokio::test]
    async fn test_text_reply_uses_fenced_sql() {
        let client = MockLlmClient::new()
            .with_text("Try this:\n```sql\nSELECT Title FROM albums\n```")
            .with_text("DROP TABLE albums");
        let requests = client.requests();
        let mut agent = LlmAgent::new(Box::new(client), Schema::new(), rules());

        assert_eq!(
            agent.propose("q", None).await.unwrap(),
            "SELECT Title FROM albums"
        );
        assert_eq!(
            agent.propose("q", Some("Error: x")).await.unwrap(),
            "DROP TABLE albums"
        );

        let requests = requests.lock().unwrap();
        let last = requests[1].last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.content.ends_with("Error: x"));
    }

    #[tokio::test]
    async fn test_extra_calls_are_answered() {
        let calls = vec![
            ToolCall::new("a", "execute_query", r#"{"query":"SELECT 1"}"#),
            ToolCall::new("b", "execute_query", r#"{"query":"SELECT 2"}"#),
        ];
        let client = MockLlmClient::new()
            .with_response(LlmResponse::with_tool_calls("", calls))
            .with_text("Done");
        let requests = client.requests();
        let mut agent = LlmAgent::new(Box::new(client), Schema::new(), rules());

        assert_eq!(agent.propose("q", None).await.unwrap(), "SELECT 1");
        assert_eq!(agent.summarize("1\n1").await.unwrap(), "Done");

        let requests = requests.lock().unwrap();
        let sent = &requests[1];
        assert_eq!(sent[sent.len() - 2].tool_call_id.as_deref(), Some("a"));
        assert_eq!(sent[sent.len() - 1].content, SKIPPED_CALL_TEXT);
    }

    #[tokio::test]
    async fn test_bad_arguments_pass_through() {
        let client = MockLlmClient::new().with_response(LlmResponse::with_tool_calls(
            "",
            vec![ToolCall::new("a", "execute_query", "{not json")],
        ));
        let mut agent = LlmAgent::new(Box::new(client), Schema::new(), rules());

        assert_eq!(agent.propose("q", None).await.unwrap(), "{not json");
    }

    #[tokio::test]
    async fn test_summarize_falls_back_to_rows() {
        let client = MockLlmClient::new()
            .with_query("SELECT 1")
            .with_text("   ");
        let mut agent = LlmAgent::new(Box::new(client), Schema::new(), rules());

        agent.propose("q", None).await.unwrap();
        assert_eq!(agent.summarize("1\n1").await.unwrap(), "1\n1");
    }
}
