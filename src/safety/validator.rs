//! Lexical query validation and normalization.

use regex::Regex;

use crate::error::{GateError, Result};

use super::{
    check_read_only_statement, NormalizedQuery, ValidationError, ValidationVerdict,
    ValidatorOptions,
};

/// Matches a trailing `LIMIT n`, `LIMIT n, m` or `LIMIT n OFFSET m`.
const LIMIT_TAIL_PATTERN: &str = r"(?i)\blimit\s+\d+(?:\s*,\s*\d+|\s+offset\s+\d+)?\s*$";

/// Validates raw query text against a [`ValidatorOptions`] policy.
///
/// Pure: no I/O, and the same input always yields the same verdict.
#[derive(Debug, Clone)]
pub struct QueryValidator {
    options: ValidatorOptions,
    forbidden: Option<Regex>,
    limit_tail: Regex,
}

impl QueryValidator {
    /// Creates a validator for the given options.
    pub fn new(options: ValidatorOptions) -> Result<Self> {
        let keywords: Vec<String> = options
            .forbidden_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();

        let forbidden = if keywords.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)\b({})\b", keywords.join("|"));
            Some(Regex::new(&pattern).map_err(|e| {
                GateError::config(format!("Invalid forbidden keyword list: {e}"))
            })?)
        };

        let limit_tail = Regex::new(LIMIT_TAIL_PATTERN)
            .map_err(|e| GateError::internal(format!("Invalid limit pattern: {e}")))?;

        Ok(Self {
            options,
            forbidden,
            limit_tail,
        })
    }

    /// Returns the options this validator enforces.
    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validates and normalizes a raw query.
    pub fn validate(&self, raw: &str) -> ValidationVerdict {
        let verdict: ValidationVerdict = self.normalize(raw).into();
        if let Some(error) = verdict.rejection() {
            tracing::debug!(reason = %error, "Query rejected");
        }
        verdict
    }

    fn normalize(&self, raw: &str) -> std::result::Result<NormalizedQuery, ValidationError> {
        let trimmed = raw.trim();

        // A denylisted keyword is reported as such wherever it appears, even in
        // text that would also fail the statement-count or prefix checks.
        if let Some(keyword) = self.find_forbidden(trimmed) {
            return Err(ValidationError::ForbiddenKeyword { keyword });
        }

        // One trailing semicolon is tolerated; any other one means a second statement.
        let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
        if body.contains(';') {
            return Err(ValidationError::MultiStatement);
        }
        // A trailing comment would swallow an appended LIMIT.
        let statement = strip_trailing_comments(body.trim());

        if !self.starts_read_only(statement) {
            return Err(ValidationError::NotReadOnly {
                allowed: self.allowed_prefixes(),
            });
        }

        let normalized = if self.limit_tail.is_match(statement) {
            statement.to_string()
        } else {
            format!("{} LIMIT {}", statement, self.options.default_row_limit)
        };

        if self.options.strict_parse {
            check_read_only_statement(&normalized, &self.allowed_prefixes())?;
        }

        Ok(NormalizedQuery(normalized))
    }

    fn starts_read_only(&self, statement: &str) -> bool {
        let keyword = leading_keyword(statement);
        !keyword.is_empty()
            && self
                .options
                .read_only_prefixes
                .iter()
                .any(|prefix| prefix.trim().eq_ignore_ascii_case(keyword))
    }

    fn find_forbidden(&self, statement: &str) -> Option<String> {
        self.forbidden
            .as_ref()?
            .find(statement)
            .map(|m| m.as_str().to_ascii_uppercase())
    }

    fn allowed_prefixes(&self) -> Vec<String> {
        self.options
            .read_only_prefixes
            .iter()
            .map(|p| p.trim().to_ascii_uppercase())
            .collect()
    }
}

/// Drops comments and whitespace after the last token of code.
///
/// Quoted text (`'..'`, `".."`, `` `..` ``, `[..]`) is skipped, so comment
/// markers inside literals are left alone. An unterminated `/*` runs to the
/// end of input, as it does in SQLite.
fn strip_trailing_comments(statement: &str) -> &str {
    let bytes = statement.as_bytes();
    let mut code_end = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = statement[i..].find('\n').map_or(bytes.len(), |n| i + n);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = statement[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
            }
            open @ (b'\'' | b'"' | b'`' | b'[') => {
                let close = if open == b'[' { b']' } else { open };
                i = bytes[i + 1..]
                    .iter()
                    .position(|&b| b == close)
                    .map_or(bytes.len(), |n| i + 1 + n + 1);
                code_end = i;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                i += 1;
                code_end = i;
            }
        }
    }

    &statement[..code_end]
}

/// Returns the first identifier-like word of the statement.
fn leading_keyword(statement: &str) -> &str {
    let end = statement
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(statement.len());
    &statement[..end]
}
