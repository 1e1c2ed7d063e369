//! Error types for sqlgate.
//!
//! Defines the crate-wide error enum used for collaborator faults
//! (configuration, connection, LLM transport). Validation and execution
//! failures have their own types and are turned into feedback text instead.

use thiserror::Error;

/// Faults of the collaborators around the gateway.
///
/// None of these is ever shown to the agent as feedback; they end the run.
#[derive(Error, Debug)]
pub enum GateError {
    /// The database file could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A driver failure outside an attempt, e.g. during introspection.
    #[error("Query error: {0}")]
    Query(String),

    /// The model endpoint failed or answered with something unusable.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Bad config file, database URI or flag value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A session invariant was broken.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short label used as the `category` field in logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Query(_) => "query",
            Self::Llm(_) => "llm",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias using GateError.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_connection() {
        let err = GateError::connection("unable to open database file: Chinook.db");
        assert_eq!(
            err.to_string(),
            "Connection error: unable to open database file: Chinook.db"
        );
        assert_eq!(err.category(), "connection");
    }

    #[test]
    fn test_error_display_llm() {
        let err = GateError::llm("Rate limited. Please wait.");
        assert_eq!(err.to_string(), "LLM error: Rate limited. Please wait.");
        assert_eq!(err.category(), "llm");
    }

    #[test]
    fn test_error_display_config() {
        let err = GateError::config("invalid scheme 'postgres'");
        assert_eq!(
            err.to_string(),
            "Configuration error: invalid scheme 'postgres'"
        );
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_error_display_internal() {
        let err = GateError::internal("attempt cap exceeded");
        assert_eq!(err.to_string(), "Internal error: attempt cap exceeded");
        assert_eq!(err.category(), "internal");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GateError>();
    }
}
