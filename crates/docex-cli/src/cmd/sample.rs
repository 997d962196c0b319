//! Sample subcommand - extract one PDF several times and show every output

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use docex_core::{ExtractionRequest, ReasoningEffort, SampleReport};
use docex_providers::ProviderKind;

use super::{EffortArg, ProviderArg, parse_temperature, provider_settings};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// PDF file to extract
    #[arg(long)]
    pub file: PathBuf,

    /// Model name passed to the provider
    #[arg(short, long)]
    pub model: String,

    /// Model provider
    #[arg(short, long, value_enum, default_value = "openai")]
    pub provider: ProviderArg,

    /// Reasoning effort (OpenAI o3 models only)
    #[arg(long, value_enum)]
    pub reasoning_effort: Option<EffortArg>,

    /// Sampling temperature (0.0-2.0)
    #[arg(short, long, value_parser = parse_temperature)]
    pub temperature: Option<f64>,

    /// Number of extraction attempts (1-10)
    #[arg(short = 'n', long, alias = "sample", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..=10))]
    pub count: u32,
}

fn validate(args: &SampleArgs) -> Result<()> {
    if args.reasoning_effort.is_some() {
        anyhow::ensure!(
            args.provider == ProviderArg::Openai,
            "--reasoning-effort is only supported by the openai provider"
        );
        anyhow::ensure!(
            args.model.contains("o3"),
            "--reasoning-effort is only supported by o3 models, got {}",
            args.model
        );
    }
    anyhow::ensure!(
        args.file.is_file(),
        "File not found: {}",
        args.file.display()
    );
    Ok(())
}

fn request(args: &SampleArgs) -> ExtractionRequest {
    ExtractionRequest {
        files: vec![args.file.clone()],
        model: args.model.clone(),
        temperature: args.temperature,
        reasoning_effort: args.reasoning_effort.map(ReasoningEffort::from),
    }
}

/// Every attempt as pretty JSON, under a numbered heading
fn render(report: &SampleReport) -> Result<String> {
    let mut out = String::new();
    for run in &report.runs {
        let json = serde_json::to_string_pretty(&run.extraction)
            .context("Failed to serialize extraction")?;
        out.push_str(&format!(
            "--- Attempt {} ({:.1}s) ---\n{json}\n",
            run.attempt,
            run.elapsed.as_secs_f64()
        ));
    }
    Ok(out)
}

pub fn run(args: SampleArgs, config: &Config) -> Result<ExitCode> {
    validate(&args)?;
    let settings = provider_settings(ProviderKind::from(args.provider), config)?;
    let provider = docex_providers::build_provider(&settings)
        .context("Failed to create model provider")?;
    let request = request(&args);

    log::info!("File: {}", args.file.display());
    log::info!("Provider: {} / model: {}", provider.name(), args.model);
    if let Some(effort) = request.reasoning_effort {
        log::info!("Reasoning effort: {}", effort.as_str());
    }
    if let Some(temperature) = request.temperature {
        log::info!("Temperature: {temperature}");
    }
    log::info!("Attempts: {}", args.count);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let report = runtime.block_on(docex_core::sample(&*provider, &request, args.count))?;

    print!("{}", render(&report)?);
    log::info!(
        "Sampling completed: {} attempt(s), {} distinct output(s)",
        report.runs.len(),
        report.distinct_outputs()
    );
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use docex_core::{Extraction, SampleRun};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SampleArgs,
    }

    fn parse(argv: &[&str]) -> Result<SampleArgs, clap::Error> {
        Harness::try_parse_from(std::iter::once("docex").chain(argv.iter().copied()))
            .map(|h| h.args)
    }

    fn pdf() -> (TempDir, String) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.7 test").unwrap();
        let path = path.to_string_lossy().into_owned();
        (dir, path)
    }

    #[test]
    fn defaults_to_one_attempt() {
        let args = parse(&["--file", "a.pdf", "--model", "gpt-4.1"]).unwrap();
        assert_eq!(args.count, 1);
        assert_eq!(args.provider, ProviderArg::Openai);
        assert_eq!(request(&args).files, vec![PathBuf::from("a.pdf")]);
    }

    #[test]
    fn count_range_enforced() {
        let base = ["--file", "a.pdf", "--model", "m"];
        let with = |extra: &[&str]| {
            let argv: Vec<&str> = base.iter().chain(extra).copied().collect();
            parse(&argv)
        };
        assert_eq!(with(&["--count", "10"]).unwrap().count, 10);
        assert_eq!(with(&["--sample", "4"]).unwrap().count, 4);
        assert!(with(&["-n", "0"]).is_err());
        assert!(with(&["-n", "11"]).is_err());
        assert!(parse(&["--model", "m"]).is_err());
    }

    #[test]
    fn reasoning_effort_needs_openai_o3() {
        let (_dir, file) = pdf();
        let ok = parse(&["--file", &file, "-m", "o3-mini", "--reasoning-effort", "high"]).unwrap();
        assert!(validate(&ok).is_ok());
        assert_eq!(request(&ok).reasoning_effort, Some(ReasoningEffort::High));

        let gemini = parse(&[
            "--file", &file, "-m", "o3", "-p", "gemini", "--reasoning-effort", "low",
        ])
        .unwrap();
        assert!(validate(&gemini).unwrap_err().to_string().contains("openai"));

        let gpt = parse(&["--file", &file, "-m", "gpt-4.1", "--reasoning-effort", "low"]).unwrap();
        assert!(validate(&gpt).unwrap_err().to_string().contains("o3"));
    }

    #[test]
    fn missing_file_rejected() {
        let args = parse(&["--file", "/nonexistent/report.pdf", "-m", "gpt-4.1"]).unwrap();
        assert!(validate(&args).unwrap_err().to_string().contains("File not found"));
    }

    #[test]
    fn missing_credential_is_fatal() {
        let (_dir, file) = pdf();
        let args = parse(&["--file", &file, "-m", "gemini-2.5-pro", "-p", "gemini"]).unwrap();
        let mut config = Config::default();
        config.gemini.api_key = None;
        let err = run(args, &config).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn render_numbers_each_attempt() {
        let report = SampleReport {
            runs: vec![
                SampleRun {
                    attempt: 1,
                    extraction: Extraction {
                        summary: "Memo".to_string(),
                        topics: vec!["hr".to_string()],
                    },
                    elapsed: Duration::from_millis(1500),
                },
                SampleRun {
                    attempt: 2,
                    extraction: Extraction {
                        summary: "Memo".to_string(),
                        topics: vec![],
                    },
                    elapsed: Duration::from_millis(900),
                },
            ],
        };
        let out = render(&report).unwrap();
        assert!(out.contains("--- Attempt 1 (1.5s) ---"));
        assert!(out.contains("--- Attempt 2 (0.9s) ---"));
        assert!(out.contains("\"summary\": \"Memo\""));
        assert!(out.contains("\"topics\": []"));
    }
}
