//! Guarded query execution for sqlgate.
//!
//! This module isolates execution of validated SQL and the tool-boundary
//! gateway from the session loop that drives them.

pub mod executor;
pub mod gateway;

pub use executor::{ExecutionError, ExecutionOutcome, QueryExecutor, DEFAULT_STATEMENT_TIMEOUT};
pub use gateway::{Gateway, GatewayReply, ERROR_PREFIX};
