//! Sign: exchange an uploaded file id for a time-limited URL.

use crate::client::TransportClient;
use crate::error::MedOcrError;
use serde::Deserialize;
use tracing::info;

/// Response of `GET /files/{id}/url`.
#[derive(Debug, Clone, Deserialize)]
struct SignedUrlResponse {
    url: String,
}

/// A pre-authorised URL the OCR service can fetch the document from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub expiry_hours: u32,
}

/// Request a signed URL for `file_id` valid for `expiry_hours`.
pub async fn get_signed_url(
    client: &TransportClient,
    file_id: &str,
    expiry_hours: u32,
) -> Result<SignedUrl, MedOcrError> {
    let endpoint = client.ocr();
    let request = client
        .get(endpoint, &format!("/files/{file_id}/url"))
        .header(reqwest::header::ACCEPT, "application/json")
        .query(&[("expiry", expiry_hours.to_string())]);

    let response: SignedUrlResponse = client.send(endpoint, request, None).await?;
    info!("Signed URL for {} valid {}h", file_id, expiry_hours);

    Ok(SignedUrl {
        url: response.url,
        expiry_hours,
    })
}
