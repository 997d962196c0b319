//! Reading request files into base64 payloads

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ProviderError;

/// Largest file accepted for upload (50 MiB)
pub const MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// One file ready to embed in a request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFile {
    pub filename: String,
    pub mime_type: &'static str,
    /// Base64 of the file contents
    pub data: String,
}

impl EncodedFile {
    /// `data:` URL form used by the OpenAI file part
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

fn rejected(path: &Path, reason: impl Into<String>) -> ProviderError {
    ProviderError::File {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Validate and encode one file
pub fn encode_file(path: &Path) -> Result<EncodedFile, ProviderError> {
    let meta = fs::metadata(path).map_err(|_| rejected(path, "File not found or unreadable"))?;
    if !meta.is_file() {
        return Err(rejected(path, "Not a regular file"));
    }
    if meta.len() > MAX_FILE_BYTES {
        return Err(rejected(
            path,
            format!(
                "File too large ({} bytes, limit {} MiB)",
                meta.len(),
                MAX_FILE_BYTES / (1024 * 1024)
            ),
        ));
    }

    let bytes = fs::read(path).map_err(|_| rejected(path, "File not found or unreadable"))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(EncodedFile {
        filename,
        mime_type: PDF_MIME_TYPE,
        data: STANDARD.encode(bytes),
    })
}

/// Encode every file off the async runtime
pub async fn encode_files(paths: &[PathBuf]) -> Result<Vec<EncodedFile>, ProviderError> {
    let paths = paths.to_vec();
    tokio::task::spawn_blocking(move || {
        paths
            .iter()
            .map(|p| encode_file(p))
            .collect::<Result<Vec<_>, _>>()
    })
        .await
        .map_err(|e| ProviderError::Io(std::io::Error::other(e)))?
}
