//! Scoring a result table against a hand-labelled reference table
//!
//! Rows are matched by file name. A matched row is perfect when its summary is
//! identical and its topics are the same set, in any order.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

/// One row of a result or reference table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoredRow {
    pub file_name: String,
    pub summary: String,
    pub topics: BTreeSet<String>,
}

impl ScoredRow {
    pub fn new(file_name: &str, summary: &str, topics_cell: &str) -> Self {
        Self {
            file_name: file_name.trim().to_string(),
            summary: summary.trim().to_string(),
            topics: split_topics(topics_cell),
        }
    }
}

fn split_topics(cell: &str) -> BTreeSet<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Read `File Name`, `Summary` and `Topics` columns; other columns are ignored
pub fn load_rows(path: &Path) -> Result<Vec<ScoredRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .with_context(|| format!("{} has no \"{name}\" column", path.display()))
    };
    let (name_col, summary_col, topics_col) =
        (column("File Name")?, column("Summary")?, column("Topics")?);

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("{}: bad row {}", path.display(), line + 2))?;
        let field = |i: usize| record.get(i).unwrap_or("");
        if field(name_col).trim().is_empty() {
            continue;
        }
        rows.push(ScoredRow::new(
            field(name_col),
            field(summary_col),
            field(topics_col),
        ));
    }
    Ok(rows)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difference {
    Summary,
    Topics,
}

impl std::fmt::Display for Difference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Summary => write!(f, "Summary mismatch"),
            Self::Topics => write!(f, "Topics mismatch"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub file_name: String,
    pub differences: Vec<Difference>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Every row of the result table, unmatched ones included
    pub evaluated: usize,
    pub perfect: usize,
    pub mismatches: Vec<Mismatch>,
    /// Result rows with no reference row
    pub unmatched: Vec<String>,
}

impl Evaluation {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total evaluated files", self.evaluated.to_string()),
            ("Perfect matches", self.perfect.to_string()),
            ("Mismatches", self.mismatches.len().to_string()),
            ("Not in reference", self.unmatched.len().to_string()),
        ]
    }

    /// TTY output
    pub fn print(&self) {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Evaluation summary").fg(Color::Cyan),
                Cell::new("Value").fg(Color::Cyan),
            ]);
        for (label, value) in self.rows() {
            table.add_row(vec![Cell::new(label), Cell::new(value)]);
        }
        eprintln!("\n{table}");
        self.log_details();
    }

    /// Non-TTY output
    pub fn log(&self) {
        log::info!("=== Evaluation Summary ===");
        for (label, value) in self.rows() {
            log::info!("{label}: {value}");
        }
        self.log_details();
    }

    fn log_details(&self) {
        if !self.mismatches.is_empty() {
            log::warn!("Mismatched files:");
            for m in &self.mismatches {
                let diffs: Vec<String> = m.differences.iter().map(|d| d.to_string()).collect();
                log::warn!("  - {}: {}", m.file_name, diffs.join(", "));
            }
        }
        for name in &self.unmatched {
            log::debug!("No reference row for {name}");
        }
    }
}

/// Match `actual` rows to `expected` rows by file name and score them
pub fn compare(expected: &[ScoredRow], actual: &[ScoredRow]) -> Evaluation {
    let reference: HashMap<&str, &ScoredRow> = expected
        .iter()
        .map(|row| (row.file_name.as_str(), row))
        .collect();

    let mut evaluation = Evaluation {
        evaluated: actual.len(),
        ..Default::default()
    };
    for row in actual {
        let Some(wanted) = reference.get(row.file_name.as_str()) else {
            evaluation.unmatched.push(row.file_name.clone());
            continue;
        };

        let mut differences = Vec::new();
        if row.summary != wanted.summary {
            differences.push(Difference::Summary);
        }
        if row.topics != wanted.topics {
            differences.push(Difference::Topics);
        }

        if differences.is_empty() {
            evaluation.perfect += 1;
        } else {
            evaluation.mismatches.push(Mismatch {
                file_name: row.file_name.clone(),
                differences,
            });
        }
    }
    evaluation
}
