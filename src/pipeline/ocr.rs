//! OCR: ask the service to read the document behind a signed URL.
//!
//! Images and paginated documents use different `document` shapes; the
//! payload is built by [`build_ocr_request`] so it can be checked without a
//! network round-trip.

use crate::client::TransportClient;
use crate::error::MedOcrError;
use crate::output::{OcrResponse, OcrResult};
use crate::pipeline::input::DocumentKind;
use serde::Serialize;
use tracing::info;

/// Body of `POST /ocr`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrRequest {
    pub model: String,
    pub document: DocumentSource,
    pub include_image_base64: bool,
}

/// Where the OCR service fetches the document from.
///
/// Serialises as `{"type": "image_url", "image_url": ...}` or
/// `{"type": "document_url", "document_url": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentSource {
    ImageUrl { image_url: String },
    DocumentUrl { document_url: String },
}

/// Build the OCR payload for `kind`.
pub fn build_ocr_request(model: &str, signed_url: &str, kind: DocumentKind) -> OcrRequest {
    let document = match kind {
        DocumentKind::Image => DocumentSource::ImageUrl {
            image_url: signed_url.to_string(),
        },
        DocumentKind::PaginatedDocument => DocumentSource::DocumentUrl {
            document_url: signed_url.to_string(),
        },
    };
    OcrRequest {
        model: model.to_string(),
        document,
        include_image_base64: true,
    }
}

/// Run OCR on the document at `signed_url`.
pub async fn run_ocr(
    client: &TransportClient,
    model: &str,
    signed_url: &str,
    kind: DocumentKind,
) -> Result<OcrResult, MedOcrError> {
    let payload = build_ocr_request(model, signed_url, kind);
    let endpoint = client.ocr();
    let request = client.post(endpoint, "/ocr").json(&payload);

    let body: serde_json::Value = client.send(endpoint, request, None).await?;
    let result = OcrResult::for_kind(OcrResponse::from_value(body), kind);
    info!("OCR returned {} page(s)", result.page_count());
    Ok(result)
}
