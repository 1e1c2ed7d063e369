//! Response parsing for LLM outputs.
//!
//! Models that ignore the tool interface sometimes answer with a query in a
//! markdown code block instead; this extracts it.

/// Result of parsing an LLM response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Any explanatory text before or after the SQL.
    pub text: String,
    /// Extracted SQL query, if found.
    pub sql: Option<String>,
}

impl ParsedResponse {
    /// Creates a new parsed response with only text (no SQL).
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: None,
        }
    }

    /// Creates a new parsed response with SQL and optional text.
    pub fn with_sql(text: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: Some(sql.into()),
        }
    }

    /// The query to hand to the gateway: the extracted SQL, else the text.
    pub fn candidate_query(&self) -> &str {
        self.sql.as_deref().unwrap_or(&self.text)
    }
}

/// A fenced code block located in a response.
struct Fence<'a> {
    lang: &'a str,
    body: &'a str,
    start: usize,
    end: usize,
}

/// Collects the complete fenced code blocks of `text`, in order.
fn fences(text: &str) -> Vec<Fence<'_>> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find("```") {
        let start = cursor + offset;
        let info_start = start + 3;
        let Some(newline) = text[info_start..].find('\n') else {
            break;
        };
        let body_start = info_start + newline + 1;
        let Some(close) = text[body_start..].find("```") else {
            break;
        };
        let body_end = body_start + close;

        found.push(Fence {
            lang: text[info_start..info_start + newline].trim(),
            body: &text[body_start..body_end],
            start,
            end: body_end + 3,
        });
        cursor = body_end + 3;
    }

    found
}

/// Parses an LLM response to extract SQL from markdown code blocks.
///
/// A block tagged `sql` or `sqlite` wins over an untagged one; blocks in
/// other languages are ignored. If several qualify, the first is used.
pub fn parse_llm_response(response: &str) -> ParsedResponse {
    let blocks = fences(response);
    let chosen = blocks
        .iter()
        .find(|f| f.lang.eq_ignore_ascii_case("sql") || f.lang.eq_ignore_ascii_case("sqlite"))
        .or_else(|| blocks.iter().find(|f| f.lang.is_empty()));

    match chosen {
        Some(fence) => {
            let text = format!(
                "{}{}",
                response[..fence.start].trim_end(),
                response[fence.end..].trim_start()
            );
            ParsedResponse::with_sql(text.trim(), fence.body.trim())
        }
        None => ParsedResponse::text_only(response.trim()),
    }
}
