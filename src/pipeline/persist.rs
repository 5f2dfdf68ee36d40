//! Persist: write the report to disk.
//!
//! Writes to a sibling temp file and renames it over the destination, so the
//! destination always holds either the previous report or the complete new
//! one. Existing content is replaced, never appended to.

use crate::error::MedOcrError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `text` as UTF-8 to `path`, replacing any existing file.
pub async fn save_to_file(text: &str, path: impl AsRef<Path>) -> Result<(), MedOcrError> {
    let path = path.as_ref();
    let write_err = |source| MedOcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = temp_path(path);
    tokio::fs::write(&tmp_path, text.as_bytes())
        .await
        .map_err(write_err)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Saved {} bytes to {}", text.len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "ocr_output".into());
    name.push(".tmp");
    path.with_file_name(name)
}
