//! Document discovery: the PDF files of an input folder

use std::path::Path;

use anyhow::{Context, Result};

use crate::task::WorkItem;

/// Extension matched case-insensitively
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// List regular `*.pdf` files directly inside `folder`, sorted by filename.
///
/// Fails when the folder is missing or not a directory.
pub fn discover_documents(folder: &Path) -> Result<Vec<WorkItem>> {
    anyhow::ensure!(
        folder.exists(),
        "Input folder does not exist: {}",
        folder.display()
    );
    anyhow::ensure!(
        folder.is_dir(),
        "Input path is not a directory: {}",
        folder.display()
    );

    let escaped = glob::Pattern::escape(&folder.to_string_lossy());
    let pattern = format!("{escaped}/*.{DOCUMENT_EXTENSION}");
    let options = glob::MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };

    let mut items: Vec<WorkItem> = glob::glob_with(&pattern, options)
        .context("invalid glob pattern")?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|path| path.is_file())
        .filter_map(|path| match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => Some(WorkItem::new(folder, name)),
            None => {
                log::warn!("Skipping non UTF-8 filename: {}", path.display());
                None
            }
        })
        .collect();

    items.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(items: &[WorkItem]) -> Vec<&str> {
        items.iter().map(|i| i.filename.as_str()).collect()
    }

    #[test]
    fn finds_pdfs_sorted_case_insensitive() {
        let dir = TempDir::new().unwrap();
        for name in ["b.pdf", "A.PDF", "notes.txt", "c.Pdf"] {
            fs::write(dir.path().join(name), b"%PDF-1.7").unwrap();
        }
        let items = discover_documents(dir.path()).unwrap();
        assert_eq!(names(&items), vec!["A.PDF", "b.pdf", "c.Pdf"]);
        assert_eq!(items[1].path, dir.path().join("b.pdf"));
    }

    #[test]
    fn skips_directories_named_like_pdfs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("folder.pdf")).unwrap();
        fs::write(dir.path().join("real.pdf"), b"%PDF").unwrap();
        let items = discover_documents(dir.path()).unwrap();
        assert_eq!(names(&items), vec!["real.pdf"]);
    }

    #[test]
    fn empty_folder_yields_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(discover_documents(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = discover_documents(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn file_instead_of_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.pdf");
        fs::write(&file, b"%PDF").unwrap();
        assert!(discover_documents(&file).is_err());
    }

    #[test]
    fn folder_with_glob_metacharacters() {
        let dir = TempDir::new().unwrap();
        let odd = dir.path().join("reports [2024]");
        fs::create_dir(&odd).unwrap();
        fs::write(odd.join("q1.pdf"), b"%PDF").unwrap();
        let items = discover_documents(&odd).unwrap();
        assert_eq!(names(&items), vec!["q1.pdf"]);
    }
}
