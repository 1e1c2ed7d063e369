//! Integration tests for sqlgate.

pub mod gateway_test;
pub mod session_test;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlgate::config::DatabaseConfig;
use sqlgate::db;
use sqlgate::query::{Gateway, QueryExecutor};
use sqlgate::safety::{QueryValidator, ValidatorOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

/// Creates a small music database and returns its directory and path.
pub async fn fixture_database() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("music.db");

    let writer = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true),
        )
        .await
        .unwrap();
    for statement in [
        "CREATE TABLE artists (ArtistId INTEGER PRIMARY KEY, Name TEXT NOT NULL)",
        "CREATE TABLE albums (AlbumId INTEGER PRIMARY KEY, Title TEXT NOT NULL, \
         ArtistId INTEGER NOT NULL REFERENCES artists(ArtistId))",
        "INSERT INTO artists VALUES (1, 'AC/DC'), (2, 'Accept'), (3, 'Aerosmith')",
        "INSERT INTO albums VALUES (1, 'For Those About To Rock', 1), \
         (2, 'Balls to the Wall', 2), (3, 'Restless and Wild', 2)",
    ] {
        sqlx::query(statement).execute(&writer).await.unwrap();
    }
    writer.close().await;

    (dir, path)
}

/// The `sqlite:///` URI naming an absolute path.
pub fn database_url(path: &Path) -> String {
    format!("sqlite:///{}", path.display())
}

/// Opens a gateway on the fixture through the configured connect path.
pub async fn sqlite_gateway(path: &Path, options: ValidatorOptions) -> Arc<Gateway> {
    let config = DatabaseConfig {
        url: database_url(path),
        ..DatabaseConfig::default()
    };
    let client = db::connect(&config).await.unwrap();
    let executor = QueryExecutor::new(client).with_statement_timeout(config.statement_timeout());
    Arc::new(Gateway::new(QueryValidator::new(options).unwrap(), executor))
}

/// Counts the rows of `table` through a separate connection.
pub async fn count_rows(path: &Path, table: &str) -> i64 {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(path).read_only(true))
        .await
        .unwrap();
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&pool)
        .await
        .unwrap();
    pool.close().await;
    count
}
