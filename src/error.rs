//! Error types for the edgequake-medocr library.
//!
//! Every stage of the pipeline returns `Result<_, MedOcrError>`. Variants are
//! grouped into four coarse [`ErrorKind`]s so callers can branch on the class
//! of failure without matching every variant:
//!
//! * **Validation**: the input was rejected before any I/O happened.
//! * **Transport**: an HTTP call failed, timed out, or returned a body that
//!   does not have the documented shape.
//! * **Filesystem**: the input could not be read or the report could not be
//!   written. The underlying [`std::io::Error`] is kept as the `source`.
//! * **Config**: the processor was built with unusable settings.
//!
//! Nothing inside the library catches these. The first error aborts the
//! pipeline and no partial report is written.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`MedOcrError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    Validation,
    Transport,
    Filesystem,
    Config,
}

/// All errors returned by the edgequake-medocr library.
#[derive(Debug, Error)]
pub enum MedOcrError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The file extension is not one of `.pdf`, `.jpg`, `.jpeg`, `.png`.
    #[error("Unsupported file type '{extension}' for '{path}'\nSupported: .pdf, .jpg, .jpeg, .png")]
    UnsupportedFileType { path: PathBuf, extension: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The service answered with a non-success HTTP status.
    #[error("{service} API error (HTTP {status}): {body}")]
    Api {
        service: String,
        status: u16,
        body: String,
    },

    /// The request did not complete within its timeout.
    #[error("{service} request timed out after {secs}s")]
    Timeout { service: String, secs: u64 },

    /// The request could not be sent (DNS, connection refused, TLS…).
    #[error("{service} request failed: {detail}")]
    Request { service: String, detail: String },

    /// The service answered 2xx but the body lacks the expected fields.
    #[error("Unexpected response from {service}: {detail}")]
    MalformedResponse { service: String, detail: String },

    // ── Filesystem errors ─────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Input file exists but could not be read.
    #[error("Failed to read document '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output report.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MedOcrError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MedOcrError::UnsupportedFileType { .. } => ErrorKind::Validation,
            MedOcrError::Api { .. }
            | MedOcrError::Timeout { .. }
            | MedOcrError::Request { .. }
            | MedOcrError::MalformedResponse { .. } => ErrorKind::Transport,
            MedOcrError::FileNotFound { .. }
            | MedOcrError::InputReadFailed { .. }
            | MedOcrError::OutputWriteFailed { .. } => ErrorKind::Filesystem,
            MedOcrError::InvalidConfig(_) | MedOcrError::Internal(_) => ErrorKind::Config,
        }
    }

    /// HTTP status code, when the failure came from a service response.
    pub fn status(&self) -> Option<u16> {
        match self {
            MedOcrError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map a `reqwest` send/read failure to the matching transport variant.
    pub(crate) fn from_reqwest(service: &str, err: reqwest::Error, timeout_secs: Option<u64>) -> Self {
        if err.is_timeout() {
            MedOcrError::Timeout {
                service: service.to_string(),
                secs: timeout_secs.unwrap_or(0),
            }
        } else {
            MedOcrError::Request {
                service: service.to_string(),
                detail: err.to_string(),
            }
        }
    }
}
