//! Evaluate subcommand - score a result table against a labelled reference

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Result CSV to score; a bare file name is looked up in the output directory
    #[arg(long)]
    pub actual: PathBuf,

    /// Reference CSV with the expected summaries and topics
    #[arg(long, default_value = "expected.csv")]
    pub expected: PathBuf,
}

/// Bare file names live in `output_dir`; anything with a directory part is
/// taken as given
fn locate(output_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || path.components().count() > 1 {
        path.to_path_buf()
    } else {
        output_dir.join(path)
    }
}

pub fn run(args: EvaluateArgs, config: &Config, tty: bool) -> Result<ExitCode> {
    let actual = locate(&config.output.dir, &args.actual);
    let expected = locate(&config.output.dir, &args.expected);
    log::info!("Actual: {}", actual.display());
    log::info!("Expected: {}", expected.display());

    let evaluation = docex_core::compare(
        &docex_core::load_rows(&expected)?,
        &docex_core::load_rows(&actual)?,
    );
    if tty {
        evaluation.print();
    } else {
        evaluation.log();
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: EvaluateArgs,
    }

    fn parse(argv: &[&str]) -> Result<EvaluateArgs, clap::Error> {
        Harness::try_parse_from(std::iter::once("docex").chain(argv.iter().copied()))
            .map(|h| h.args)
    }

    #[test]
    fn bare_names_resolve_into_output_dir() {
        let out = Path::new("outputs");
        assert_eq!(
            locate(out, Path::new("results.csv")),
            PathBuf::from("outputs/results.csv")
        );
        assert_eq!(
            locate(out, Path::new("runs/results.csv")),
            PathBuf::from("runs/results.csv")
        );
        assert_eq!(
            locate(out, Path::new("/tmp/results.csv")),
            PathBuf::from("/tmp/results.csv")
        );
    }

    #[test]
    fn actual_is_required() {
        assert!(parse(&[]).is_err());
        let args = parse(&["--actual", "r.csv"]).unwrap();
        assert_eq!(args.expected, PathBuf::from("expected.csv"));
    }

    #[test]
    fn scores_tables_in_output_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("expected.csv"),
            "File Name,Summary,Topics\na.pdf,Memo,\"hr, policy\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("results.csv"),
            "File Name,Summary,Topics,Processed At\na.pdf,Memo,\"policy, hr\",t\n",
        )
        .unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().to_path_buf();

        let args = parse(&["--actual", "results.csv"]).unwrap();
        assert_eq!(run(args, &config, false).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn missing_reference_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("results.csv"), "File Name,Summary,Topics\n").unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().to_path_buf();

        let args = parse(&["--actual", "results.csv"]).unwrap();
        let err = run(args, &config, false).unwrap_err();
        assert!(format!("{err:#}").contains("expected.csv"));
    }
}
