//! Streaming CSV result sink

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::ledger::file_safe;
use crate::provider::Extraction;

/// Output table header
pub const HEADER: [&str; 4] = ["File Name", "Summary", "Topics", "Processed At"];

/// One output row
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionRecord {
    pub file_name: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

impl ExtractionRecord {
    /// Row for a successful extraction, stamped now
    pub fn new(file_name: impl Into<String>, extraction: Extraction) -> Self {
        Self {
            file_name: file_name.into(),
            summary: extraction.summary,
            topics: extraction.topics,
            processed_at: Utc::now(),
        }
    }

    pub fn topics_cell(&self) -> String {
        self.topics.join(", ")
    }

    pub fn processed_at_cell(&self) -> String {
        self.processed_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[derive(Debug)]
pub enum SinkError {
    Io(io::Error),
    Csv(csv::Error),
    /// Write attempted after `close()`; a bug in the caller
    Closed,
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Csv(e) => write!(f, "CSV: {e}"),
            Self::Closed => write!(f, "write to closed result sink"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Closed => None,
        }
    }
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for SinkError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

/// Append-only CSV writer, flushed after every row.
///
/// Rows land in completion order. The sink is the only writer to its file.
pub struct CsvSink<W: Write = File> {
    writer: Option<csv::Writer<W>>,
    path: PathBuf,
    row_count: usize,
}

impl<W: Write> std::fmt::Debug for CsvSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("path", &self.path)
            .field("row_count", &self.row_count)
            .field("closed", &self.writer.is_none())
            .finish()
    }
}

impl CsvSink {
    /// Create (truncate) the output file and write the header
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Self::from_writer(file, path)
    }
}

impl<W: Write> CsvSink<W> {
    /// Write the header to `inner`; `path` only labels the sink
    pub fn from_writer(inner: W, path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(HEADER)?;
        writer.flush()?;

        Ok(Self {
            writer: Some(writer),
            path: path.into(),
            row_count: 0,
        })
    }

    pub fn write(&mut self, record: &ExtractionRecord) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        writer.write_record([
            record.file_name.as_str(),
            record.summary.as_str(),
            record.topics_cell().as_str(),
            record.processed_at_cell().as_str(),
        ])?;
        writer.flush()?;
        self.row_count += 1;
        Ok(())
    }

    /// Flush and release the file. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<usize, SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(self.row_count)
    }

    /// Close on a path that is already failing; a flush error is logged, not returned
    pub fn close_or_log(&mut self) {
        if let Err(e) = self.close() {
            log::error!("Failed to close {}: {e}", self.path.display());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `<output_dir>/results-<model>-<unix millis>.csv`
pub fn default_output_path(output_dir: &Path, model: &str, now: DateTime<Utc>) -> PathBuf {
    output_dir.join(format!(
        "results-{}-{}.csv",
        file_safe(model),
        now.timestamp_millis()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(name: &str, topics: &[&str]) -> ExtractionRecord {
        ExtractionRecord {
            file_name: name.to_string(),
            summary: "Quarterly results, with caveats".to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            processed_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap(),
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn open_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/results.csv");
        let mut sink = CsvSink::open(&path).unwrap();
        sink.close().unwrap();
        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], HEADER);
    }

    #[test]
    fn rows_are_flushed_before_close() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        let mut sink = CsvSink::open(&path).unwrap();
        sink.write(&record("a.pdf", &["tax", "audit"])).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "a.pdf");
        assert_eq!(rows[1][1], "Quarterly results, with caveats");
        assert_eq!(rows[1][2], "tax, audit");
        assert_eq!(rows[1][3], "2025-06-01T12:30:00.000Z");
        assert_eq!(sink.row_count(), 1);
    }

    #[test]
    fn empty_topics_render_empty_cell() {
        assert_eq!(record("a.pdf", &[]).topics_cell(), "");
    }

    #[test]
    fn close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::open(&dir.path().join("r.csv")).unwrap();
        sink.write(&record("a.pdf", &["x"])).unwrap();
        assert_eq!(sink.close().unwrap(), 1);
        assert_eq!(sink.close().unwrap(), 1);
        assert!(sink.is_closed());
    }

    #[test]
    fn write_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::open(&dir.path().join("r.csv")).unwrap();
        sink.close().unwrap();
        let err = sink.write(&record("a.pdf", &["x"])).unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }

    /// Accepts `budget` bytes, then fails every write
    struct ShortWriter {
        budget: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.len() > self.budget {
                return Err(io::Error::other("disk full"));
            }
            self.budget -= buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_surfaces() {
        let mut sink = CsvSink::from_writer(ShortWriter { budget: 64 }, "full.csv").unwrap();
        assert!(sink.write(&record("a.pdf", &["tax"])).is_err());
        assert_eq!(sink.row_count(), 0);
    }

    #[test]
    fn close_or_log_releases_failing_writer() {
        let mut sink = CsvSink::from_writer(ShortWriter { budget: 64 }, "full.csv").unwrap();
        assert!(sink.write(&record("a.pdf", &["tax"])).is_err());
        sink.close_or_log();
        assert!(sink.is_closed());
        assert!(matches!(
            sink.write(&record("b.pdf", &[])),
            Err(SinkError::Closed)
        ));
    }

    #[test]
    fn close_reports_pending_flush_error() {
        let mut sink = CsvSink::from_writer(ShortWriter { budget: 64 }, "full.csv").unwrap();
        assert!(sink.write(&record("a.pdf", &["tax"])).is_err());
        assert!(sink.close().is_err());
        assert!(sink.is_closed());
    }

    #[test]
    fn open_on_directory_fails() {
        let dir = TempDir::new().unwrap();
        assert!(CsvSink::open(dir.path()).is_err());
    }

    #[test]
    fn default_output_path_is_timestamped() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let path = default_output_path(Path::new("outputs"), "gpt-4.1", now);
        assert_eq!(
            path,
            Path::new("outputs/results-gpt-4.1-1700000000123.csv")
        );
    }
}
