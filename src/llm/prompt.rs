//! Prompt construction for LLM requests.
//!
//! Builds the system prompt with the database schema and the query rules.

use crate::db::Schema;
use crate::llm::types::Message;

/// System prompt template for the SQL analyst.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You're a careful SQLite analyst.
Authoritative schema (do not invent columns / tables):
{schema}

Rules:
- Think step-by-step.
- When you need data, call the tool [execute_query] with one SELECT query.
- Read-only only; no {forbidden}.
- Limit to {row_limit} rows of output unless the user explicitly asks otherwise.
- If the tool returns 'Error:', revise the SQL and try again.
- Limit number of attempts to {attempts}.
- If you are not successful after {attempts} attempts, return a note to the user.
- Prefer explicit column lists; avoid SELECT *."#;

/// Values substituted into the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRules {
    /// Maximum attempts per request.
    pub attempt_cap: usize,
    /// Default row limit.
    pub row_limit: u32,
    /// Keywords the gateway refuses.
    pub forbidden_keywords: Vec<String>,
}

/// Builds the system prompt with the database schema injected.
pub fn build_system_prompt(schema: &Schema, rules: &PromptRules) -> String {
    let forbidden = rules
        .forbidden_keywords
        .iter()
        .map(|k| k.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join("/");

    SYSTEM_PROMPT_TEMPLATE
        .replace("{schema}", &schema.format_for_llm())
        .replace("{forbidden}", &forbidden)
        .replace("{row_limit}", &rules.row_limit.to_string())
        .replace("{attempts}", &rules.attempt_cap.to_string())
}

/// Builds the opening messages of a session.
pub fn build_messages(schema: &Schema, rules: &PromptRules, request: &str) -> Vec<Message> {
    vec![
        Message::system(build_system_prompt(schema, rules)),
        Message::user(request),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Column, Table};
    use crate::llm::types::Role;

    fn rules() -> PromptRules {
        PromptRules {
            attempt_cap: 5,
            row_limit: 5,
            forbidden_keywords: vec!["insert".to_string(), "DROP".to_string()],
        }
    }

    fn schema() -> Schema {
        Schema {
            tables: vec![Table {
                name: "Artist".to_string(),
                columns: vec![Column::new("ArtistId", "INTEGER").nullable(false)],
                primary_key: vec!["ArtistId".to_string()],
            }],
            foreign_keys: vec![],
        }
    }

    #[test]
    fn test_system_prompt_contains_schema_and_rules() {
        let prompt = build_system_prompt(&schema(), &rules());

        assert!(prompt.contains("Table: Artist"));
        assert!(prompt.contains("ArtistId: INTEGER (PK, NOT NULL)"));
        assert!(prompt.contains("no INSERT/DROP."));
        assert!(prompt.contains("Limit to 5 rows"));
        assert!(prompt.contains("Limit number of attempts to 5."));
        assert!(prompt.contains("'Error:'"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_build_messages() {
        let messages = build_messages(&schema(), &rules(), "How many artists are there?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "How many artists are there?");
    }
}
