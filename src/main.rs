//! sqlgate - a guarded, read-only SQL gateway for language-model agents.

use std::process::ExitCode;
use std::sync::Arc;

use sqlgate::agent::LlmAgent;
use sqlgate::cli::{Cli, Command};
use sqlgate::config::Config;
use sqlgate::db;
use sqlgate::error::{GateError, Result};
use sqlgate::llm::{self, ExecuteQueryTool, PromptRules, ToolTable, EXECUTE_QUERY_TOOL};
use sqlgate::logging::init_stderr_logging;
use sqlgate::query::{Gateway, QueryExecutor, ERROR_PREFIX};
use sqlgate::safety::{QueryValidator, ValidationVerdict};
use sqlgate::session::{RetryController, SessionStatus};
use tracing::{error, info, warn};

/// Exit code for a session that ended without a result.
const EXIT_UNANSWERED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    init_stderr_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(category = e.category(), "{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config);
    config.check()?;

    let validator = QueryValidator::new(config.validator.clone())?;

    if let Command::Check { sql } = &cli.command {
        return Ok(match validator.validate(sql) {
            ValidationVerdict::Accepted { query } => {
                println!("{query}");
                ExitCode::SUCCESS
            }
            ValidationVerdict::Rejected { error } => {
                println!("{ERROR_PREFIX}{error}");
                ExitCode::from(EXIT_UNANSWERED)
            }
        });
    }

    let client = db::connect(&config.database).await?;
    let executor =
        QueryExecutor::new(client).with_statement_timeout(config.database.statement_timeout());
    let gateway = Arc::new(Gateway::new(validator, executor));

    let result = dispatch(&cli.command, &config, Arc::clone(&gateway)).await;

    if let Err(e) = gateway.close().await {
        warn!(error = %e, "Failed to close database connection");
    }
    result
}

async fn dispatch(command: &Command, config: &Config, gateway: Arc<Gateway>) -> Result<ExitCode> {
    match command {
        Command::Schema => {
            let schema = gateway.schema().await?;
            print!("{}", schema.format_for_llm());
            Ok(ExitCode::SUCCESS)
        }
        Command::Query { sql } => {
            let mut tools = ToolTable::new();
            tools.register(Arc::new(ExecuteQueryTool::new(Arc::clone(&gateway))));
            let arguments = serde_json::json!({ "query": sql }).to_string();
            let text = tools.call(EXECUTE_QUERY_TOOL, &arguments).await;
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask { question, json } => ask(question, *json, config, gateway).await,
        Command::Check { .. } => Err(GateError::internal("check runs without a connection")),
    }
}

async fn ask(question: &str, json: bool, config: &Config, gateway: Arc<Gateway>) -> Result<ExitCode> {
    let schema = gateway.schema().await?;
    let llm_client = llm::create_client(&config.llm, None)?;
    let rules = PromptRules {
        attempt_cap: config.session.attempt_cap,
        row_limit: config.validator.default_row_limit,
        forbidden_keywords: config.validator.forbidden_keywords.clone(),
    };
    let mut agent = LlmAgent::new(llm_client, schema, rules);

    let controller = RetryController::new(gateway)
        .with_attempt_cap(config.session.attempt_cap)
        .with_deadline(config.session.deadline());
    let session = controller.run_session(&mut agent, question).await?;

    if json {
        let text = serde_json::to_string_pretty(&session)
            .map_err(|e| GateError::internal(format!("Failed to serialize session: {e}")))?;
        println!("{text}");
    } else if let Some(message) = session.final_message() {
        println!("{message}");
    }

    Ok(match session.status() {
        SessionStatus::Succeeded => ExitCode::SUCCESS,
        _ => ExitCode::from(EXIT_UNANSWERED),
    })
}
