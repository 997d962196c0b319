//! Logging setup: `log` facade over env_logger, bridged through indicatif

use std::fmt;

use indicatif::MultiProgress;
use log::Level;

/// Dependencies whose info-level chatter drowns the per-file log lines
const NOISY_MODULES: [&str; 3] = ["hyper", "reqwest", "rustls"];

const RESET: &str = "\x1b[0m";

/// Fixed-width label so messages line up
fn label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

fn ansi(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m",
        Level::Warn => "\x1b[33m",
        Level::Info => "\x1b[32m",
        Level::Debug => "\x1b[36m",
        Level::Trace => "\x1b[35m",
    }
}

/// `[LEVEL] message`, with the label colored on a terminal
fn render(level: Level, args: &fmt::Arguments<'_>, color: bool) -> String {
    if color {
        format!("[{}{}{RESET}] {args}", ansi(level), label(level))
    } else {
        format!("[{}] {args}", label(level))
    }
}

/// Default filter for the chosen verbosity; `RUST_LOG` still wins
fn default_filter(quiet: bool, debug: bool) -> &'static str {
    match (debug, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    }
}

fn builder(quiet: bool, debug: bool) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    for module in NOISY_MODULES {
        builder.filter_module(module, log::LevelFilter::Warn);
    }
    builder.parse_env(env_logger::Env::default().default_filter_or(default_filter(quiet, debug)));
    builder
}

/// Routes records through `MultiProgress::suspend` so lines never tear the bar.
///
/// env_logger still owns filtering.
pub struct IndicatifLogger {
    filter: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(filter: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { filter, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.filter.matches(record) {
            return;
        }
        let line = render(record.level(), record.args(), true);
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {}
}

/// Install the global logger.
///
/// With a `MultiProgress` (TTY) records go through [`IndicatifLogger`];
/// otherwise plain `[LEVEL] message` lines for log aggregation.
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
) -> Result<(), log::SetLoggerError> {
    use std::io::Write;

    let Some(multi) = multi else {
        return builder(quiet, debug)
            .format(|buf, record| writeln!(buf, "{}", render(record.level(), record.args(), false)))
            .try_init();
    };

    let filter = builder(quiet, debug).build();
    let max_level = filter.filter();
    log::set_boxed_logger(Box::new(IndicatifLogger::new(filter, multi.clone())))?;
    log::set_max_level(max_level);
    Ok(())
}
