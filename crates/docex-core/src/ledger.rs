//! Crash-resumable progress ledger
//!
//! Tracks which work items reached a terminal state so that a rerun over the
//! same folder skips them. The snapshot is a small JSON file rewritten
//! atomically (tmp -> rename) on every checkpoint.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::WorkItem;

/// Persisted progress of one run configuration.
///
/// `completed` and `failed` are kept disjoint by construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingProgress {
    completed: BTreeSet<String>,
    failed: BTreeSet<String>,
    total_files: usize,
    start_time: DateTime<Utc>,
    last_update: DateTime<Utc>,
}

impl ProcessingProgress {
    pub fn fresh() -> Self {
        let now = Utc::now();
        Self {
            completed: BTreeSet::new(),
            failed: BTreeSet::new(),
            total_files: 0,
            start_time: now,
            last_update: now,
        }
    }

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn failed(&self) -> &BTreeSet<String> {
        &self.failed
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    pub fn set_total_files(&mut self, total: usize) {
        self.total_files = total;
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Item already completed or failed in some run
    pub fn is_terminal(&self, filename: &str) -> bool {
        self.completed.contains(filename) || self.failed.contains(filename)
    }

    /// A success supersedes an earlier failure of the same item
    pub fn record_success(&mut self, filename: &str) {
        self.failed.remove(filename);
        self.completed.insert(filename.to_string());
    }

    /// Ignored when the item already completed
    pub fn record_failure(&mut self, filename: &str) {
        if !self.completed.contains(filename) {
            self.failed.insert(filename.to_string());
        }
    }

    /// Drop all failures so they are scheduled again. Returns how many.
    pub fn forget_failed(&mut self) -> usize {
        let n = self.failed.len();
        self.failed.clear();
        n
    }

    pub fn is_disjoint(&self) -> bool {
        self.completed.is_disjoint(&self.failed)
    }

    /// Repair a hand-edited file listing an item in both sets
    fn normalize(&mut self) {
        let overlap: Vec<String> = self.completed.intersection(&self.failed).cloned().collect();
        for name in overlap {
            log::warn!("{name} listed as both completed and failed, keeping completed");
            self.failed.remove(&name);
        }
    }
}

impl Default for ProcessingProgress {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Work still to do: `discovered - completed - failed`, in discovery order
pub fn pending(progress: &ProcessingProgress, discovered: Vec<WorkItem>) -> Vec<WorkItem> {
    let pending: Vec<WorkItem> = discovered
        .into_iter()
        .filter(|item| !progress.is_terminal(&item.filename))
        .collect();
    log::debug!("{} items pending after resume filter", pending.len());
    pending
}

/// On-disk home of a [`ProcessingProgress`]
#[derive(Clone, Debug)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<output_dir>/progress-<model>.json`
    pub fn default_path(output_dir: &Path, model: &str) -> PathBuf {
        output_dir.join(format!("progress-{}.json", file_safe(model)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Load the snapshot, falling back to fresh progress when the file is
    /// missing or unreadable
    pub fn load(&self) -> ProcessingProgress {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ProcessingProgress::fresh();
            }
            Err(e) => {
                log::warn!(
                    "Failed to read progress file {}: {e}",
                    self.path.display()
                );
                return ProcessingProgress::fresh();
            }
        };

        match serde_json::from_str::<ProcessingProgress>(&content) {
            Ok(mut progress) => {
                progress.normalize();
                log::info!(
                    "Loaded progress: {} completed, {} failed",
                    progress.completed.len(),
                    progress.failed.len()
                );
                progress
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse progress file {}: {e}",
                    self.path.display()
                );
                ProcessingProgress::fresh()
            }
        }
    }

    /// Stamp `lastUpdate` and persist the full snapshot
    pub fn save(&self, progress: &mut ProcessingProgress) -> Result<()> {
        progress.last_update = Utc::now();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(progress).context("Failed to serialize progress")?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json).with_context(|| format!("Cannot write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Cannot replace {}", self.path.display()))?;
        Ok(())
    }

    /// Remove the snapshot. A missing file is not an error.
    pub fn clear(&self) -> std::io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Model names like `models/gemini-2.5-pro` must not create directories
pub(crate) fn file_safe(name: &str) -> String {
    name.replace(['/', '\\', ':'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn items(names: &[&str]) -> Vec<WorkItem> {
        names
            .iter()
            .map(|n| WorkItem::new(Path::new("docs"), *n))
            .collect()
    }

    #[test]
    fn load_missing_returns_fresh() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));
        let progress = store.load();
        assert!(progress.completed().is_empty());
        assert!(progress.failed().is_empty());
        assert_eq!(progress.total_files(), 0);
    }

    #[test]
    fn load_malformed_returns_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, b"{ not json").unwrap();
        let progress = ProgressStore::new(&path).load();
        assert!(progress.completed().is_empty());
        // The broken file is left alone until the next save
        assert!(path.exists());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join("nested/deeper/progress.json"));
        let mut progress = ProcessingProgress::fresh();
        progress.set_total_files(3);
        progress.record_success("a.pdf");
        progress.record_failure("b.pdf");
        store.save(&mut progress).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, progress);
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn saved_json_uses_camel_case() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));
        let mut progress = ProcessingProgress::fresh();
        progress.record_success("a.pdf");
        store.save(&mut progress).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["completed"], serde_json::json!(["a.pdf"]));
        assert_eq!(raw["failed"], serde_json::json!([]));
        assert_eq!(raw["totalFiles"], 0);
        assert!(raw["startTime"].is_string());
        assert!(raw["lastUpdate"].is_string());
    }

    #[test]
    fn loads_external_progress_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(
            &path,
            r#"{
  "completed": ["doc1.pdf", "doc1.pdf"],
  "failed": ["doc3.pdf"],
  "totalFiles": 3,
  "startTime": "2025-06-01T10:00:00.000Z",
  "lastUpdate": "2025-06-01T10:05:00.000Z"
}"#,
        )
        .unwrap();
        let progress = ProgressStore::new(&path).load();
        assert_eq!(progress.completed().len(), 1);
        assert!(progress.failed().contains("doc3.pdf"));
        assert_eq!(progress.total_files(), 3);
    }

    #[test]
    fn load_repairs_overlap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(
            &path,
            r#"{"completed":["a.pdf"],"failed":["a.pdf","b.pdf"],"totalFiles":2,
                "startTime":"2025-06-01T10:00:00Z","lastUpdate":"2025-06-01T10:00:00Z"}"#,
        )
        .unwrap();
        let progress = ProgressStore::new(&path).load();
        assert!(progress.is_disjoint());
        assert!(progress.completed().contains("a.pdf"));
        assert_eq!(progress.failed().len(), 1);
    }

    #[test]
    fn success_supersedes_failure() {
        let mut progress = ProcessingProgress::fresh();
        progress.record_failure("a.pdf");
        progress.record_success("a.pdf");
        assert!(progress.failed().is_empty());
        assert!(progress.completed().contains("a.pdf"));

        progress.record_failure("a.pdf");
        assert!(progress.failed().is_empty());
        assert!(progress.is_disjoint());
    }

    #[test]
    fn pending_skips_terminal_items() {
        let mut progress = ProcessingProgress::fresh();
        progress.record_success("a.pdf");
        progress.record_failure("c.pdf");
        let todo = pending(&progress, items(&["a.pdf", "b.pdf", "c.pdf", "d.pdf"]));
        let names: Vec<&str> = todo.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "d.pdf"]);
    }

    #[test]
    fn forget_failed_requeues() {
        let mut progress = ProcessingProgress::fresh();
        progress.record_failure("c.pdf");
        assert_eq!(progress.forget_failed(), 1);
        let todo = pending(&progress, items(&["c.pdf"]));
        assert_eq!(todo.len(), 1);
    }

    #[test]
    fn clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));
        store.save(&mut ProcessingProgress::fresh()).unwrap();
        assert!(store.clear().unwrap());
        assert!(!store.path().exists());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn save_into_unwritable_location_reports_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a dir").unwrap();
        let store = ProgressStore::new(blocker.join("progress.json"));
        assert!(store.save(&mut ProcessingProgress::fresh()).is_err());
    }

    #[test]
    fn default_path_sanitizes_model() {
        let path = ProgressStore::default_path(Path::new("out"), "models/gemini-2.5-pro");
        assert_eq!(path, Path::new("out/progress-models_gemini-2.5-pro.json"));
    }
}
