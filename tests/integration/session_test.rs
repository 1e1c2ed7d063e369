//! Retry loop integration tests.
//!
//! Drives whole sessions against the fixture database with scripted and
//! mock-LLM agents.

use pretty_assertions::assert_eq;
use sqlgate::agent::{LlmAgent, ScriptedAgent};
use sqlgate::error::GateError;
use sqlgate::llm::{MockLlmClient, PromptRules, Role};
use sqlgate::safety::ValidatorOptions;
use sqlgate::session::{RetryController, SessionStatus};

use super::{count_rows, fixture_database, sqlite_gateway};

fn rules() -> PromptRules {
    let options = ValidatorOptions::default();
    PromptRules {
        attempt_cap: 5,
        row_limit: options.default_row_limit,
        forbidden_keywords: options.forbidden_keywords,
    }
}

#[tokio::test]
async fn test_success_stops_further_attempts() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;
    let controller = RetryController::new(gateway).with_attempt_cap(5);
    let mut agent = ScriptedAgent::new([
        "SELECT * FROM nonexistent",
        "DROP TABLE albums",
        "SELECT COUNT(*) AS n FROM albums",
        "SELECT 1",
    ]);
    let log = agent.feedback_log();

    let session = controller
        .run_session(&mut agent, "How many albums are there?")
        .await
        .unwrap();

    assert_eq!(session.status(), SessionStatus::Succeeded);
    assert_eq!(session.attempts().len(), 3);
    assert_eq!(session.answer(), Some("n\n3"));
    assert!(session.attempts()[1].outcome.is_none());

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0], None);
    assert!(log[1].as_deref().unwrap().contains("no such table"));
    assert_eq!(
        log[2].as_deref(),
        Some("Error: Query contains forbidden operations: DROP.")
    );
    assert_eq!(count_rows(&path, "albums").await, 3);
}

#[tokio::test]
async fn test_exhaustion_uses_exact_cap() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;
    let controller = RetryController::new(gateway).with_attempt_cap(4);
    let mut agent = ScriptedAgent::new(["SELECT Nope FROM artists"]);

    let session = controller.run_session(&mut agent, "q").await.unwrap();

    assert_eq!(session.status(), SessionStatus::ExhaustedRetries);
    assert_eq!(session.attempts().len(), 4);
    assert!(session.answer().is_none());
    let note = session.final_message().unwrap();
    assert!(note.contains("within 4 attempts"), "{note}");
    assert!(note.contains("no such column"), "{note}");

    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json["status"], "exhausted_retries");
    assert_eq!(json["attempts"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_llm_agent_recovers_from_error() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;
    let schema = gateway.schema().await.unwrap();
    let client = MockLlmClient::new()
        .with_query("SELECT COUNT(*) FROM tables")
        .with_query("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table'")
        .with_text("There are 2 tables.");
    let requests = client.requests();
    let mut agent = LlmAgent::new(Box::new(client), schema, rules());
    let controller = RetryController::new(gateway);

    let session = controller
        .run_session(&mut agent, "How many tables are there?")
        .await
        .unwrap();

    assert_eq!(session.status(), SessionStatus::Succeeded);
    assert_eq!(session.attempts().len(), 2);
    assert_eq!(session.answer(), Some("There are 2 tables."));

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests[0][0].content.contains("Table: artists"));

    let retry = requests[1].last().unwrap();
    assert_eq!(retry.role, Role::Tool);
    assert!(retry.content.starts_with("Error: "), "{}", retry.content);

    let rows = requests[2].last().unwrap();
    assert_eq!(rows.role, Role::Tool);
    assert_eq!(rows.content, "n\n2");
}

#[tokio::test]
async fn test_llm_failure_is_an_error() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;
    let client = MockLlmClient::new()
        .with_query("SELECT * FROM nonexistent")
        .with_error("rate limited");
    let mut agent = LlmAgent::new(Box::new(client), gateway.schema().await.unwrap(), rules());
    let controller = RetryController::new(gateway);

    let err = controller.run_session(&mut agent, "q").await.unwrap_err();

    assert!(matches!(err, GateError::Llm(_)));
}
