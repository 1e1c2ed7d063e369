//! Execution of validated queries.
//!
//! The executor is the only component that talks to the database on behalf
//! of the agent. It accepts nothing but a [`NormalizedQuery`] and turns every
//! driver fault into an [`ExecutionOutcome::Failure`].

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::{DatabaseClient, Schema};
use crate::error::{GateError, Result};
use crate::safety::NormalizedQuery;

/// Default per-statement timeout.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a validated query failed to run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExecutionError {
    /// The driver raised a fault; carries its diagnostic text.
    #[error("{0}")]
    DriverFault(String),

    /// The statement did not finish within the timeout.
    #[error("Query timed out after {} seconds", .0.as_secs_f64())]
    Timeout(Duration),
}

impl From<GateError> for ExecutionError {
    fn from(error: GateError) -> Self {
        match error {
            GateError::Query(message) => Self::DriverFault(message),
            other => Self::DriverFault(other.to_string()),
        }
    }
}

/// Result of one executor call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The query ran; `rows` is the rendered result set.
    Success { rows: String, row_count: usize },
    /// The query failed at the database.
    Failure { error: ExecutionError },
}

impl ExecutionOutcome {
    /// Returns true if the query ran successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the rendered rows on success.
    pub fn rows(&self) -> Option<&str> {
        match self {
            Self::Success { rows, .. } => Some(rows),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the failure reason, if any.
    pub fn error(&self) -> Option<&ExecutionError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// Runs validated queries against one database client.
///
/// Each session gets its own executor and so its own connection.
pub struct QueryExecutor {
    db: Box<dyn DatabaseClient>,
    statement_timeout: Duration,
}

impl QueryExecutor {
    /// Creates an executor with the default statement timeout.
    pub fn new(db: Box<dyn DatabaseClient>) -> Self {
        Self {
            db,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    /// Sets the per-statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Returns the per-statement timeout.
    pub fn statement_timeout(&self) -> Duration {
        self.statement_timeout
    }

    /// Executes one validated statement. Never fails; faults become `Failure`.
    pub async fn execute(&self, query: &NormalizedQuery) -> ExecutionOutcome {
        // Timing out only stops waiting: SQLite keeps running the statement on
        // its worker, so the next call may wait on the pool until it ends.
        let result =
            tokio::time::timeout(self.statement_timeout, self.db.execute_query(query.as_str()))
                .await;

        match result {
            Ok(Ok(query_result)) => {
                debug!(
                    rows = query_result.row_count,
                    elapsed_ms = query_result.execution_time.as_millis() as u64,
                    truncated = query_result.was_truncated,
                    "Query executed"
                );
                ExecutionOutcome::Success {
                    rows: query_result.to_table_text(),
                    row_count: query_result.row_count,
                }
            }
            Ok(Err(e)) => {
                let error = ExecutionError::from(e);
                debug!(error = %error, "Query failed");
                ExecutionOutcome::Failure { error }
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.statement_timeout.as_secs_f64(),
                    "Query timed out"
                );
                ExecutionOutcome::Failure {
                    error: ExecutionError::Timeout(self.statement_timeout),
                }
            }
        }
    }

    /// Introspects the schema of the underlying database.
    pub async fn schema(&self) -> Result<Schema> {
        self.db.introspect_schema().await
    }

    /// Closes the underlying connection.
    pub async fn close(&self) -> Result<()> {
        self.db.close().await
    }
}
