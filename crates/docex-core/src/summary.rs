//! End-of-run summary, printed as a table on a TTY or logged otherwise

use std::path::PathBuf;
use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

/// Outcome of one batch run
#[derive(Clone, Debug, Default)]
pub struct Summary {
    /// PDF files found in the input folder
    pub discovered: usize,
    /// Files submitted in this run after the resume filter
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Every failed file recorded in the ledger, earlier runs included
    pub failed_files: Vec<String>,
    pub elapsed: Duration,
    /// `None` when nothing was scheduled
    pub output: Option<PathBuf>,
    pub progress_file: PathBuf,
    pub interrupted: bool,
    pub progress_cleared: bool,
}

impl Summary {
    /// Nothing left to do: either an empty folder or a finished batch
    pub fn is_noop(&self) -> bool {
        self.pending == 0
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Discovered", self.discovered.to_string()),
            ("Scheduled", self.pending.to_string()),
            ("Succeeded", self.succeeded.to_string()),
            ("Failed", self.failed.to_string()),
            ("Total time", format!("{:.2}s", self.elapsed.as_secs_f64())),
        ];
        if let Some(output) = &self.output {
            rows.push(("Output", output.display().to_string()));
        }
        if self.interrupted {
            rows.push(("Status", "interrupted".to_string()));
        }
        rows
    }

    /// TTY output
    pub fn print(&self) {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Processing summary").fg(Color::Cyan),
                Cell::new("Value").fg(Color::Cyan),
            ]);
        for (label, value) in self.rows() {
            table.add_row(vec![Cell::new(label), Cell::new(value)]);
        }
        eprintln!("\n{table}");
        self.print_failures();
    }

    /// Non-TTY output
    pub fn log(&self) {
        log::info!("=== Processing Summary ===");
        for (label, value) in self.rows() {
            log::info!("{label}: {value}");
        }
        self.print_failures();
    }

    fn print_failures(&self) {
        if self.failed_files.is_empty() {
            return;
        }
        log::warn!("Failed files:");
        for file in &self.failed_files {
            log::warn!("  - {file}");
        }
        log::warn!(
            "Failed files are skipped on rerun; pass --retry-failed to submit them again \
             (progress kept in {})",
            self.progress_file.display()
        );
    }
}
