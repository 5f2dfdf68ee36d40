//! Input validation: classify a user-supplied path by its extension.
//!
//! Runs before any network or file I/O. The extension alone decides the
//! [`DocumentKind`], which later selects the OCR request shape, so an
//! unsupported file is rejected here and never reaches the services.

use crate::error::MedOcrError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How the OCR service should treat the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Single raster image (`.jpg`, `.jpeg`, `.png`).
    Image,
    /// Multi-page document (`.pdf`).
    PaginatedDocument,
}

impl DocumentKind {
    /// Classify a lowercase extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(DocumentKind::PaginatedDocument),
            "jpg" | "jpeg" | "png" => Some(DocumentKind::Image),
            _ => None,
        }
    }
}

/// A validated local document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    path: PathBuf,
    kind: DocumentKind,
    extension: String,
}

impl DocumentRef {
    /// Validate `path` by extension (case-insensitive).
    ///
    /// Does not touch the filesystem; a missing file is reported later by the
    /// upload stage.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MedOcrError> {
        let path = path.as_ref().to_path_buf();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let kind = DocumentKind::from_extension(&extension).ok_or_else(|| {
            MedOcrError::UnsupportedFileType {
                path: path.clone(),
                extension: if extension.is_empty() {
                    "<none>".to_string()
                } else {
                    format!(".{extension}")
                },
            }
        })?;

        debug!("Validated {} as {:?}", path.display(), kind);
        Ok(Self {
            path,
            kind,
            extension,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// File name sent in the multipart upload.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("document.{}", self.extension))
    }

    /// MIME type sent in the multipart upload.
    pub fn mime_type(&self) -> &'static str {
        match self.extension.as_str() {
            "pdf" => "application/pdf",
            "png" => "image/png",
            _ => "image/jpeg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accepted_extensions() {
        let cases = [
            ("scan.pdf", DocumentKind::PaginatedDocument),
            ("SCAN.PDF", DocumentKind::PaginatedDocument),
            ("rx.jpg", DocumentKind::Image),
            ("rx.JPeG", DocumentKind::Image),
            ("dir.v2/rx.Png", DocumentKind::Image),
        ];
        for (p, kind) in cases {
            let doc = DocumentRef::from_path(p).unwrap_or_else(|e| panic!("{p}: {e}"));
            assert_eq!(doc.kind(), kind, "{p}");
        }
    }

    #[test]
    fn rejected_extensions() {
        for p in ["notes.txt", "scan.tiff", "scan.gif", "archive.pdf.zip", "README", ".pdf"] {
            let err = DocumentRef::from_path(p).expect_err(p);
            assert_eq!(err.kind(), ErrorKind::Validation, "{p}");
        }
    }

    #[test]
    fn missing_extension_reported_as_none() {
        let err = DocumentRef::from_path("prescription").unwrap_err();
        assert!(err.to_string().contains("<none>"), "got: {err}");
    }

    #[test]
    fn mime_and_file_name() {
        let doc = DocumentRef::from_path("/tmp/in/Rx.JPG").unwrap();
        assert_eq!(doc.file_name(), "Rx.JPG");
        assert_eq!(doc.mime_type(), "image/jpeg");
        assert_eq!(
            DocumentRef::from_path("a.pdf").unwrap().mime_type(),
            "application/pdf"
        );
        assert_eq!(DocumentRef::from_path("a.png").unwrap().mime_type(), "image/png");
    }
}
