//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// A guarded, read-only SQL gateway for language-model agents.
#[derive(Parser, Debug)]
#[command(name = "sqlgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Database URI (e.g. sqlite:///Chinook.db)
    #[arg(short, long, global = true, env = "SQLGATE_DATABASE_URL")]
    pub database: Option<String>,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// LLM provider (groq, openai, ollama, mock)
    #[arg(long, global = true)]
    pub llm: Option<String>,

    /// Model name, overriding the provider default
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Maximum attempts per request
    #[arg(long, global = true)]
    pub attempts: Option<usize>,

    /// Rows appended as LIMIT when a query has none
    #[arg(long, global = true)]
    pub row_limit: Option<u32>,

    /// Also parse queries with a SQL parser before accepting them
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask a question in natural language
    Ask {
        /// The question
        question: String,

        /// Print the whole session as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one query through the gateway and print the tool text
    Query {
        /// The SQL query
        sql: String,
    },
    /// Validate a query without running it
    Check {
        /// The SQL query
        sql: String,
    },
    /// Print the schema as the model sees it
    Schema,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, using the default if not specified.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies flag values on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.database {
            config.database.url = url.clone();
        }
        if let Some(provider) = &self.llm {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(attempts) = self.attempts {
            config.session.attempt_cap = attempts;
        }
        if let Some(row_limit) = self.row_limit {
            config.validator.default_row_limit = row_limit;
        }
        if self.strict {
            config.validator.strict_parse = true;
        }
    }
}
