//! sqlsage - score SQL queries against a schema, or generate them from
//! plain-English intents.
//!
//! Exit codes: 0 on success, 2 when the query or intent cannot be handled
//! (malformed query, unsupported intent, invalid configuration), 1 for any
//! other failure such as an unreadable file.

mod config;
mod logging;
mod output;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlsage_analyzer::{Mode, SqlAssistant};
use sqlsage_core::AssistError;

use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "sqlsage",
    version,
    about = "Heuristic SQL query optimizer and natural-language query generator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format for reports
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Analyzer configuration file (TOML)
    #[arg(long, global = true, env = "SQLSAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log engine progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write log events to stderr as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score a query and suggest improvements
    Optimize {
        /// Schema DDL file
        #[arg(long)]
        schema: PathBuf,

        /// File holding the query, or `-` for stdin
        #[arg(long, default_value = "-")]
        query: PathBuf,
    },
    /// Build a query from a plain-English request
    Generate {
        /// Schema DDL file
        #[arg(long)]
        schema: PathBuf,

        /// What the query should return, e.g. "top 5 users by spend"
        #[arg(long)]
        intent: String,
    },
    /// List the analysis rules and whether they are enabled
    Rules,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = logging::LoggingConfig::for_verbosity(cli.verbose).with_json(cli.log_json);
    if let Err(e) = logging::init(logging) {
        eprintln!("warning: failed to initialize logging: {e:#}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

/// 2 for errors about the query, intent or configuration itself
fn exit_status(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<AssistError>().is_some() { 2 } else { 1 }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = config::load(cli.config.as_deref())?;
    let assistant = SqlAssistant::new(config);

    let report = match &cli.command {
        Command::Rules => {
            print!("{}", output::render_rules(assistant.engine()));
            return Ok(());
        }
        Command::Optimize { schema, query } => {
            let schema_text = read_file(schema)?;
            let query_text = read_input(query)?;
            assistant.run(Mode::Optimize, &schema_text, &query_text)?
        }
        Command::Generate { schema, intent } => {
            let schema_text = read_file(schema)?;
            assistant.run(Mode::Generate, &schema_text, intent)?
        }
    };

    println!("{}", output::render(&report, cli.format)?);
    Ok(())
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Reads `path`, or stdin when it is `-`
fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read query from stdin")?;
        Ok(text)
    } else {
        read_file(path)
    }
}
