//! The guarded query gateway.
//!
//! Pairs a validator with an executor and exposes the string-in,
//! string-out boundary the agent talks to.

use serde::Serialize;
use tracing::info;

use crate::db::Schema;
use crate::error::Result;
use crate::safety::{QueryValidator, ValidationVerdict};

use super::executor::{ExecutionOutcome, QueryExecutor};

/// Prefix marking a failed tool call. Agents key their retry logic on it.
pub const ERROR_PREFIX: &str = "Error: ";

/// What happened to one raw query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayReply {
    /// The validator's decision.
    pub verdict: ValidationVerdict,
    /// Present only when the query was accepted and executed.
    pub outcome: Option<ExecutionOutcome>,
}

impl GatewayReply {
    /// Returns true if the query was accepted and ran successfully.
    pub fn is_success(&self) -> bool {
        self.outcome.as_ref().is_some_and(ExecutionOutcome::is_success)
    }

    /// Renders the reply as tool output: the rows, or `Error: <reason>`.
    pub fn to_tool_text(&self) -> String {
        if let Some(error) = self.verdict.rejection() {
            return format!("{ERROR_PREFIX}{error}");
        }
        match &self.outcome {
            Some(ExecutionOutcome::Success { rows, .. }) => rows.clone(),
            Some(ExecutionOutcome::Failure { error }) => format!("{ERROR_PREFIX}{error}"),
            None => format!("{ERROR_PREFIX}query was not executed"),
        }
    }
}

/// Validator plus executor for one session.
pub struct Gateway {
    validator: QueryValidator,
    executor: QueryExecutor,
}

impl Gateway {
    /// Creates a gateway from its two halves.
    pub fn new(validator: QueryValidator, executor: QueryExecutor) -> Self {
        Self {
            validator,
            executor,
        }
    }

    /// Returns the validator.
    pub fn validator(&self) -> &QueryValidator {
        &self.validator
    }

    /// Validates `raw` and, if accepted, executes it.
    ///
    /// The executor is never invoked for a rejected query.
    pub async fn attempt(&self, raw: &str) -> GatewayReply {
        let verdict = self.validator.validate(raw);
        let outcome = match verdict.normalized() {
            Some(query) => {
                info!(query = %query, "Executing query");
                Some(self.executor.execute(query).await)
            }
            None => None,
        };

        GatewayReply { verdict, outcome }
    }

    /// The tool-boundary call: rows as text, or `Error: ` followed by the reason.
    pub async fn execute_query(&self, raw: &str) -> String {
        self.attempt(raw).await.to_tool_text()
    }

    /// Introspects the database schema for the agent's prompt.
    pub async fn schema(&self) -> Result<Schema> {
        self.executor.schema().await
    }

    /// Closes the underlying connection.
    pub async fn close(&self) -> Result<()> {
        self.executor.close().await
    }
}
