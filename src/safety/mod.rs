//! Query safety validation module.
//!
//! Decides whether an untrusted, agent-generated query is a single read-only
//! statement and normalizes it so that it always carries a row limit.
//! Validation is lexical: it does not see through string literals or comments,
//! so a keyword inside a literal is rejected and an obfuscated one may pass.
//! The optional strict parse and the read-only connection are the second and
//! third lines of defence.

mod parser;
mod validator;

pub use parser::check_read_only_statement;
pub use validator::QueryValidator;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default number of rows appended as `LIMIT` when a query has none.
pub const DEFAULT_ROW_LIMIT: u32 = 5;

/// Keywords that may not appear anywhere in an accepted query.
pub const DEFAULT_FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "ALTER", "DROP", "CREATE", "REPLACE", "TRUNCATE",
];

/// Leading keywords an accepted query may start with.
pub const DEFAULT_READ_ONLY_PREFIXES: &[&str] = &["SELECT"];

/// Tunable validation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Row limit appended to queries without a trailing `LIMIT` clause.
    pub default_row_limit: u32,

    /// Denylisted keywords, matched case-insensitively as whole words.
    pub forbidden_keywords: Vec<String>,

    /// Allowed leading keywords, matched case-insensitively.
    pub read_only_prefixes: Vec<String>,

    /// Also parse the normalized query with sqlparser before accepting it.
    pub strict_parse: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            default_row_limit: DEFAULT_ROW_LIMIT,
            forbidden_keywords: DEFAULT_FORBIDDEN_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            read_only_prefixes: DEFAULT_READ_ONLY_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            strict_parse: false,
        }
    }
}

/// Reason a query was rejected.
///
/// The `Display` text is what the agent sees after the `Error: ` prefix.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// More than one statement was submitted.
    #[error("Multiple statements are not allowed.")]
    MultiStatement,

    /// The statement does not begin with an allowed read-only keyword.
    #[error("Only {} queries are allowed.", .allowed.join("/"))]
    NotReadOnly { allowed: Vec<String> },

    /// A denylisted keyword appears somewhere in the statement.
    #[error("Query contains forbidden operations: {keyword}.")]
    ForbiddenKeyword { keyword: String },

    /// Strict mode only: the normalized query does not parse.
    #[error("Query could not be parsed: {reason}")]
    Unparseable { reason: String },
}

/// A validated query: one read-only statement ending in a row limit.
///
/// Only [`QueryValidator`] can produce one, which is what keeps raw agent
/// text away from the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedQuery(String);

impl NormalizedQuery {
    /// Returns the normalized SQL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of validating one raw query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationVerdict {
    /// Safe to execute, in normalized form.
    Accepted { query: NormalizedQuery },
    /// Refused, with the reason fed back to the agent.
    Rejected { error: ValidationError },
}

impl ValidationVerdict {
    /// Returns true if the query was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Returns the normalized query if accepted.
    pub fn normalized(&self) -> Option<&NormalizedQuery> {
        match self {
            Self::Accepted { query } => Some(query),
            Self::Rejected { .. } => None,
        }
    }

    /// Returns the rejection reason if rejected.
    pub fn rejection(&self) -> Option<&ValidationError> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { error } => Some(error),
        }
    }
}

impl From<std::result::Result<NormalizedQuery, ValidationError>> for ValidationVerdict {
    fn from(result: std::result::Result<NormalizedQuery, ValidationError>) -> Self {
        match result {
            Ok(query) => Self::Accepted { query },
            Err(error) => Self::Rejected { error },
        }
    }
}
