//! LLM tool definitions for function calling.
//!
//! Tools are declared statically and registered in a [`ToolTable`]; the table
//! answers every call with text and never faults back to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::query::{Gateway, ERROR_PREFIX};

/// Name under which the query tool is registered.
pub const EXECUTE_QUERY_TOOL: &str = "execute_query";

/// Tool definition for LLM function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A callable tool with a fixed signature: JSON arguments in, text out.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the definition advertised to the LLM.
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool. Failures are reported as `Error: ` text.
    async fn call(&self, arguments: &str) -> String;
}

/// Statically registered tools, looked up by name.
#[derive(Default)]
pub struct ToolTable {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolTable {
    /// Creates an empty tool table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its definition's name, replacing any previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
    }

    /// Returns the definitions of all registered tools.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Calls the named tool.
    pub async fn call(&self, name: &str, arguments: &str) -> String {
        match self.tools.get(name) {
            Some(tool) => {
                debug!(tool = name, "Calling tool");
                tool.call(arguments).await
            }
            None => format!("{ERROR_PREFIX}Unknown tool '{name}'."),
        }
    }
}

/// Input parameters for the execute_query tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteQueryInput {
    pub query: String,
}

/// Returns the definition of the execute_query tool.
pub fn execute_query_definition() -> ToolDefinition {
    ToolDefinition {
        name: EXECUTE_QUERY_TOOL.to_string(),
        description: "Execute a READ-ONLY SQLite SELECT query and return results.".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "One SELECT statement"
                }
            },
            "required": ["query"]
        }),
    }
}

/// Parses execute_query arguments.
pub fn parse_execute_query_input(arguments: &str) -> Result<ExecuteQueryInput, String> {
    serde_json::from_str(arguments).map_err(|e| format!("Invalid tool arguments: {e}"))
}

/// The `execute_query` tool, backed by a gateway.
pub struct ExecuteQueryTool {
    gateway: Arc<Gateway>,
}

impl ExecuteQueryTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for ExecuteQueryTool {
    fn definition(&self) -> ToolDefinition {
        execute_query_definition()
    }

    async fn call(&self, arguments: &str) -> String {
        match parse_execute_query_input(arguments) {
            Ok(input) => self.gateway.execute_query(&input.query).await,
            Err(message) => format!("{ERROR_PREFIX}{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockDatabaseClient;
    use crate::query::QueryExecutor;
    use crate::safety::{QueryValidator, ValidatorOptions};

    fn table() -> ToolTable {
        let gateway = Gateway::new(
            QueryValidator::new(ValidatorOptions::default()).unwrap(),
            QueryExecutor::new(Box::new(MockDatabaseClient::new())),
        );
        let mut table = ToolTable::new();
        table.register(Arc::new(ExecuteQueryTool::new(Arc::new(gateway))));
        table
    }

    #[test]
    fn test_definitions() {
        let definitions = table().definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "execute_query");
        assert_eq!(definitions[0].parameters["required"][0], "query");
    }

    #[tokio::test]
    async fn test_call_execute_query() {
        let text = table()
            .call("execute_query", r#"{"query": "SELECT 1"}"#)
            .await;
        assert_eq!(text, "result\nMock result for: SELECT 1 LIMIT 5");
    }

    #[tokio::test]
    async fn test_call_rejected_query() {
        let text = table()
            .call("execute_query", r#"{"query": "DELETE FROM albums"}"#)
            .await;
        assert!(text.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let text = table().call("drop_everything", "{}").await;
        assert_eq!(text, "Error: Unknown tool 'drop_everything'.");
    }

    #[tokio::test]
    async fn test_bad_arguments() {
        let text = table().call("execute_query", "not json").await;
        assert!(text.starts_with("Error: Invalid tool arguments"));

        let text = table().call("execute_query", r#"{"sql": "SELECT 1"}"#).await;
        assert!(text.starts_with("Error: Invalid tool arguments"));
    }
}
