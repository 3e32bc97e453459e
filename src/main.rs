//! Growth advisor CLI entry point.
//!
//! Provides `chat` for an interactive session over stdin/stdout and `check`
//! for verifying credentials and backend reachability.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{info, warn};

use growth_advisor::adapters::cli::{run_session, RenderMode};
use growth_advisor::agent::Advisor;
use growth_advisor::config::Config;
use growth_advisor::credentials::load_credentials;
use growth_advisor::logging;
use growth_advisor::providers::openai::OpenAiCompatProvider;
use growth_advisor::providers::{check_model, LlmProvider};
use growth_advisor::search::tavily::TavilyClient;
use growth_advisor::search::SearchProvider;

/// Personalised SaaS growth advice with live market search.
#[derive(Parser)]
#[command(name = "growth-advisor", version, about)]
struct Cli {
    /// Config file (default: `$GROWTH_ADVISOR_CONFIG` or `./growth-advisor.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Chat with the advisor over stdin/stdout.
    Chat {
        /// Session identifier the conversation is stored under.
        #[arg(long, default_value = "cli")]
        session: String,
        /// Emit events as JSON lines instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Verify credentials and backend reachability, then exit.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    let _logging_guard = match &config.logging.logs_dir {
        Some(dir) => Some(logging::init_production(dir, &config.logging.level)?),
        None => {
            logging::init_cli(&config.logging.level);
            None
        }
    };

    match cli.command {
        Command::Chat { session, json } => handle_chat(&config, &session, json).await,
        Command::Check => handle_check(&config).await,
    }
}

/// Run an interactive session until EOF or `/quit`.
async fn handle_chat(config: &Config, session: &str, json: bool) -> anyhow::Result<()> {
    let credentials = load_credentials(config)?;
    let advisor = Advisor::from_config(config, &credentials)?;

    let mode = if json { RenderMode::Json } else { RenderMode::Text };
    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();

    info!(session, "chat session started");
    run_session(&advisor, session, input, &mut output, mode)
        .await
        .context("chat session I/O failed")?;
    Ok(())
}

/// Startup verification: credentials (fatal), search (warning), model (fatal).
async fn handle_check(config: &Config) -> anyhow::Result<()> {
    // Step 1: Credentials.
    let credentials = load_credentials(config)?;
    let model_key = credentials.require(&config.generation.api_key_env)?;
    let search_key = credentials.require(&config.search.api_key_env)?;
    info!("credentials present");

    // Step 2: Search. Failure only degrades answers to the non-search path.
    let search = TavilyClient::new(&config.search, search_key)?;
    match search.search("test connection").await {
        Ok(results) => info!(results = results.len(), "search backend reachable"),
        Err(e) => warn!(error = %e, "search backend unreachable, advice will skip live search"),
    }

    // Step 3: Model.
    let llm = OpenAiCompatProvider::new(
        config.generation.base_url.clone(),
        config.generation.model.clone(),
        model_key,
    );
    let response = check_model(&llm)
        .await
        .with_context(|| format!("model {} is not reachable", llm.model_id()))?;
    info!(model = %response.model, "model reachable");

    info!("all checks passed");
    Ok(())
}
