//! Gateway integration tests.
//!
//! Runs raw queries through validation and execution against a real
//! SQLite file opened read-only.

use pretty_assertions::assert_eq;
use sqlgate::db::{DatabaseClient, SqliteClient, EMPTY_RESULT_TEXT};
use sqlgate::error::GateError;
use sqlgate::llm::{ExecuteQueryTool, ToolTable, EXECUTE_QUERY_TOOL};
use sqlgate::query::ExecutionOutcome;
use sqlgate::safety::{ValidationError, ValidatorOptions};
use std::sync::Arc;

use super::{count_rows, fixture_database, sqlite_gateway};

#[tokio::test]
async fn test_count_tables() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;

    let text = gateway
        .execute_query("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table'")
        .await;

    assert_eq!(text, "n\n2");
}

#[tokio::test]
async fn test_default_limit_is_applied() {
    let (_dir, path) = fixture_database().await;
    let options = ValidatorOptions {
        default_row_limit: 2,
        ..ValidatorOptions::default()
    };
    let gateway = sqlite_gateway(&path, options).await;

    let reply = gateway
        .attempt("SELECT Name FROM artists ORDER BY ArtistId")
        .await;

    assert_eq!(
        reply.verdict.normalized().unwrap().as_str(),
        "SELECT Name FROM artists ORDER BY ArtistId LIMIT 2"
    );
    assert_eq!(reply.to_tool_text(), "Name\nAC/DC\nAccept");
}

#[tokio::test]
async fn test_trailing_comment_keeps_limit() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;

    for raw in [
        "SELECT a.Name FROM artists a, artists b, albums c -- all rows",
        "SELECT a.Name FROM artists a, artists b, albums c /* all rows",
    ] {
        let reply = gateway.attempt(raw).await;
        assert_eq!(
            reply.verdict.normalized().unwrap().as_str(),
            "SELECT a.Name FROM artists a, artists b, albums c LIMIT 5"
        );
        match reply.outcome {
            Some(ExecutionOutcome::Success { row_count, .. }) => assert_eq!(row_count, 5),
            other => panic!("Expected success for {raw}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_join_with_explicit_limit() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;

    let text = gateway
        .execute_query(
            "SELECT ar.Name, COUNT(al.AlbumId) AS n \
             FROM artists ar JOIN albums al ON al.ArtistId = ar.ArtistId \
             GROUP BY ar.Name ORDER BY n DESC LIMIT 1",
        )
        .await;

    assert_eq!(text, "Name | n\nAccept | 2");
}

#[tokio::test]
async fn test_empty_result() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;

    let reply = gateway
        .attempt("SELECT Name FROM artists WHERE ArtistId = 99")
        .await;

    assert!(reply.is_success());
    assert_eq!(reply.to_tool_text(), EMPTY_RESULT_TEXT);
}

#[tokio::test]
async fn test_missing_table_is_reported() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;

    let reply = gateway.attempt("SELECT * FROM nonexistent").await;

    assert!(reply.verdict.is_accepted());
    assert!(matches!(reply.outcome, Some(ExecutionOutcome::Failure { .. })));
    let text = reply.to_tool_text();
    assert!(text.starts_with("Error: "), "{text}");
    assert!(text.contains("no such table"), "{text}");
}

#[tokio::test]
async fn test_forbidden_statement_never_runs() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;

    let reply = gateway.attempt("DROP TABLE albums").await;

    assert_eq!(
        reply.verdict.rejection(),
        Some(&ValidationError::ForbiddenKeyword {
            keyword: "DROP".to_string()
        })
    );
    assert!(reply.outcome.is_none());
    assert_eq!(reply.to_tool_text(), "Error: Query contains forbidden operations: DROP.");
    assert_eq!(count_rows(&path, "albums").await, 3);
}

#[tokio::test]
async fn test_multiple_statements_rejected() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;

    let text = gateway
        .execute_query("SELECT 1; SELECT Name FROM artists")
        .await;

    assert_eq!(text, "Error: Multiple statements are not allowed.");
}

#[tokio::test]
async fn test_connection_refuses_writes() {
    let (_dir, path) = fixture_database().await;
    let client = SqliteClient::connect(&path).await.unwrap();

    let err = client
        .execute_query("UPDATE artists SET Name = 'x'")
        .await
        .unwrap_err();

    assert!(matches!(err, GateError::Query(_)));
    assert!(err.to_string().contains("readonly"), "{err}");
    client.close().await.unwrap();

    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;
    assert_eq!(
        gateway
            .execute_query("SELECT Name FROM artists WHERE ArtistId = 1")
            .await,
        "Name\nAC/DC"
    );
}

#[tokio::test]
async fn test_schema_through_gateway() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;

    let schema = gateway.schema().await.unwrap();

    assert_eq!(schema.table_names(), vec!["albums", "artists"]);
    let text = schema.format_for_llm();
    assert!(text.contains("Table: albums"));
    assert!(text.contains("albums.ArtistId -> artists.ArtistId"));
}

#[tokio::test]
async fn test_tool_table_dispatch() {
    let (_dir, path) = fixture_database().await;
    let gateway = sqlite_gateway(&path, ValidatorOptions::default()).await;
    let mut tools = ToolTable::new();
    tools.register(Arc::new(ExecuteQueryTool::new(Arc::clone(&gateway))));

    let text = tools
        .call(
            EXECUTE_QUERY_TOOL,
            r#"{"query": "SELECT Title FROM albums WHERE AlbumId = 3"}"#,
        )
        .await;
    assert_eq!(text, "Title\nRestless and Wild");

    let text = tools.call(EXECUTE_QUERY_TOOL, "not json").await;
    assert!(text.starts_with("Error: Invalid tool arguments"), "{text}");

    gateway.close().await.unwrap();
}

#[tokio::test]
async fn test_strict_mode_rejects_unparseable() {
    let (_dir, path) = fixture_database().await;
    let options = ValidatorOptions {
        strict_parse: true,
        ..ValidatorOptions::default()
    };
    let gateway = sqlite_gateway(&path, options).await;

    let reply = gateway.attempt("SELECT (Name FROM artists").await;

    assert!(matches!(
        reply.verdict.rejection(),
        Some(ValidationError::Unparseable { .. })
    ));
    assert!(reply.outcome.is_none());
}
