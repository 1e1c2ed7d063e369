//! Mock database clients for testing.
//!
//! Provide scripted results without a database file, so the gateway and the
//! retry loop can be exercised headlessly.

use super::{ColumnInfo, DatabaseClient, QueryResult, Schema, Value};
use crate::error::{GateError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock database client that returns predefined results.
///
/// Scripted results are handed out in order; once they run out every query
/// gets the default one-row result. Every executed statement is recorded.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    scripted: Mutex<VecDeque<Result<QueryResult>>>,
    executed: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Queues a result for the next unanswered query.
    pub fn with_result(self, result: QueryResult) -> Self {
        self.push(Ok(result))
    }

    /// Queues a driver error for the next unanswered query.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Err(GateError::query(message)))
    }

    /// Makes every query sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle to the list of statements this client has executed.
    pub fn executed_queries(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }

    fn push(self, result: Result<QueryResult>) -> Self {
        if let Ok(mut scripted) = self.scripted.lock() {
            scripted.push_back(result);
        }
        self
    }

    fn default_result(sql: &str) -> QueryResult {
        QueryResult::with_data(
            vec![ColumnInfo::new("result", "TEXT")],
            vec![vec![Value::String(format!("Mock result for: {sql}"))]],
        )
        .with_execution_time(Duration::from_millis(1))
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .scripted
            .lock()
            .map_err(|_| GateError::internal("mock result queue poisoned"))?
            .pop_front();

        next.unwrap_or_else(|| Ok(Self::default_result(sql)))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database client whose every query fails with the same driver message.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a failing client with the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Err(GateError::connection(self.message.clone()))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(GateError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
