//! Agent collaborators.
//!
//! An agent turns a user request, plus feedback from earlier attempts, into
//! the next candidate query. It is trusted to be present, not to be safe:
//! everything it proposes goes through the gateway.

mod llm;
mod scripted;

pub use llm::LlmAgent;
pub use scripted::ScriptedAgent;

use async_trait::async_trait;

use crate::error::Result;

/// Proposes queries for a request and phrases the final answer.
#[async_trait]
pub trait Agent: Send {
    /// Returns the next candidate query.
    ///
    /// `feedback` is `None` on the first call of a session and afterwards the
    /// tool text of the previous attempt (an `Error: ` string).
    async fn propose(&mut self, request: &str, feedback: Option<&str>) -> Result<String>;

    /// Turns the rows of the successful attempt into the final answer.
    async fn summarize(&mut self, rows: &str) -> Result<String> {
        Ok(rows.to_string())
    }
}
