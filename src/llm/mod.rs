//! LLM integration for sqlgate.
//!
//! Provides the client trait, an OpenAI-compatible implementation, the tool
//! table and the prompt the agent runs under.

pub mod factory;
pub mod mock;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod tools;
pub mod types;

pub use factory::create_client;
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::{parse_llm_response, ParsedResponse};
pub use prompt::{build_messages, build_system_prompt, PromptRules};
pub use tools::{
    execute_query_definition, ExecuteQueryTool, Tool, ToolDefinition, ToolTable,
    EXECUTE_QUERY_TOOL,
};
pub use types::{LlmResponse, Message, Role, ToolCall};

use async_trait::async_trait;
use std::str::FromStr;

use crate::error::Result;

/// Trait for LLM clients that support function calling.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion that may request tool calls.
    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse>;

    /// Generates a plain-text completion.
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        Ok(self.complete_with_tools(messages, &[]).await?.content)
    }
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Groq's hosted models
    #[default]
    Groq,
    /// OpenAI (GPT-4o, etc.)
    OpenAi,
    /// Local Ollama instance, through its OpenAI-compatible endpoint
    Ollama,
    /// Mock client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }

    /// Returns the model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Groq => "moonshotai/kimi-k2-instruct-0905",
            Self::OpenAi => "gpt-4o",
            Self::Ollama => "llama3.2:3b",
            Self::Mock => "mock",
        }
    }

    /// Returns the API base URL used when none is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenAi => openai::OPENAI_BASE_URL,
            Self::Ollama => "http://localhost:11434/v1",
            Self::Mock => "",
        }
    }

    /// Returns the environment variable holding the API key, if one is needed.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            Self::Groq => Some("GROQ_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Ollama | Self::Mock => None,
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
