//! Upload: send the local document to the OCR service's file store.

use crate::client::TransportClient;
use crate::error::MedOcrError;
use crate::pipeline::input::DocumentRef;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

/// Purpose tag the OCR service requires on uploaded files.
pub const UPLOAD_PURPOSE: &str = "ocr";

/// Response of `POST /files`. Only `id` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub purpose: Option<String>,
}

/// Read `doc` from disk and upload it as multipart form data.
///
/// Returns the service-assigned file identifier.
pub async fn upload_document(
    client: &TransportClient,
    doc: &DocumentRef,
) -> Result<UploadedFile, MedOcrError> {
    let bytes = read_document(doc).await?;
    let size = bytes.len();

    let file_part = Part::bytes(bytes)
        .file_name(doc.file_name())
        .mime_str(doc.mime_type())
        .map_err(|e| MedOcrError::Internal(format!("Invalid MIME type: {e}")))?;
    let form = Form::new()
        .part("file", file_part)
        .text("purpose", UPLOAD_PURPOSE);

    debug!("Uploading {} ({} bytes)", doc.file_name(), size);
    let endpoint = client.ocr();
    let request = client.post(endpoint, "/files").multipart(form);
    let uploaded: UploadedFile = client.send(endpoint, request, None).await?;

    info!("Uploaded {} as file id {}", doc.path().display(), uploaded.id);
    Ok(uploaded)
}

async fn read_document(doc: &DocumentRef) -> Result<Vec<u8>, MedOcrError> {
    tokio::fs::read(doc.path()).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MedOcrError::FileNotFound {
                path: doc.path().to_path_buf(),
            }
        } else {
            MedOcrError::InputReadFailed {
                path: doc.path().to_path_buf(),
                source: e,
            }
        }
    })
}
