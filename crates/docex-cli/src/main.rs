//! docex - bulk structured extraction from PDF documents
//!
//! Sends every PDF in a folder to a language model provider and collects the
//! extracted summary and topics into a CSV table, resuming interrupted runs.
//! `sample` repeats the extraction of a single file and `evaluate` scores a
//! result table against a labelled reference.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "docex")]
#[command(about = "Bulk structured extraction from PDF documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./docex.toml or ~/.config/docex/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Extract summary and topics from every PDF in a folder
    Process(cmd::process::ProcessArgs),
    /// Extract one PDF repeatedly to check output consistency
    Sample(cmd::sample::SampleArgs),
    /// Score a result CSV against a labelled reference CSV
    Evaluate(cmd::evaluate::EvaluateArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    // Progress context (TTY auto-detect)
    let progress = Arc::new(docex_core::ProgressContext::new());

    // Per-file lines are useful on both TTY and non-TTY; the bar draws below them
    let multi = progress.is_tty().then(|| progress.multi());
    if let Err(e) = docex_core::init_logging(false, cli.debug, multi) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(cli, &progress) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, progress: &docex_core::SharedProgress) -> Result<ExitCode> {
    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Process(args) => cmd::process::run(args, &config, progress),
        Command::Sample(args) => cmd::sample::run(args, &config),
        Command::Evaluate(args) => cmd::evaluate::run(args, &config, progress.is_tty()),
        Command::Config => {
            print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let key_state = |key: &Option<String>| if key.is_some() { "configured" } else { "not set" };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Output directory",
        &config.output.dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Concurrency",
        &config.defaults.concurrency.to_string(),
    ]);
    table.add_row(vec!["Retries", &config.defaults.retries.to_string()]);
    table.add_row(vec![
        "Backoff",
        &format!("{}ms (cap {}ms)", config.retry.base_ms, config.retry.cap_ms),
    ]);
    table.add_row(vec![
        "Checkpoint every",
        &format!("{} files", config.defaults.checkpoint_every),
    ]);
    table.add_row(vec![
        "Drain timeout",
        &format!("{}s", config.shutdown.drain_timeout_secs),
    ]);
    table.add_row(vec![
        "Request timeout",
        &format!("{}s", config.http.request_timeout_secs),
    ]);
    table.add_row(vec!["OpenAI base URL", &config.openai.base_url]);
    table.add_row(vec!["OpenAI API key", key_state(&config.openai.api_key)]);
    table.add_row(vec!["Gemini base URL", &config.gemini.base_url]);
    table.add_row(vec!["Gemini API key", key_state(&config.gemini.api_key)]);

    eprintln!("\n{table}");
}
