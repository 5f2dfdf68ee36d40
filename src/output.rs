//! Response and result types.
//!
//! The OCR service answers in one of two shapes depending on the document
//! kind: a flat `{"output": "..."}` or a `{"pages": [...]}` sequence. The raw
//! JSON is decoded leniently into [`OcrResponse`] and then
//! classified into the [`OcrResult`] tagged union, so the normalizer matches
//! on variants instead of probing keys.

use crate::pipeline::input::DocumentKind;
use crate::progress::Stage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── OCR wire types ───────────────────────────────────────────────────────

/// Raw OCR response body. Unknown fields are ignored.
///
/// Every field decodes leniently: a `null` or mistyped value becomes the
/// field's default instead of failing the whole body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OcrResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub output: Option<String>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub pages: Option<Vec<OcrPage>>,
    #[serde(default, deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub usage_info: Option<OcrUsage>,
}

impl OcrResponse {
    /// Decode a body of any shape. A non-object yields an empty response.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// One page of a paginated OCR response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OcrPage {
    #[serde(default, deserialize_with = "lenient")]
    pub index: usize,
    #[serde(default, deserialize_with = "lenient")]
    pub markdown: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub images: Vec<OcrImage>,
    #[serde(default, deserialize_with = "lenient")]
    pub dimensions: Option<PageDimensions>,
}

/// An image the OCR service cut out of a page.
///
/// `image_base64` is populated because every request sets
/// `include_image_base64: true`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OcrImage {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub top_left_x: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub top_left_y: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub bottom_right_x: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub bottom_right_y: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub image_base64: Option<String>,
}

impl OcrImage {
    /// Decode the embedded image, accepting either bare base64 or a
    /// `data:<mime>;base64,` URI. `None` when no data was returned.
    pub fn decode_base64(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        let raw = self.image_base64.as_deref()?;
        let payload = match raw.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => raw,
        };
        Some(STANDARD.decode(payload.trim()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct PageDimensions {
    #[serde(default, deserialize_with = "lenient")]
    pub dpi: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub height: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub width: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct OcrUsage {
    #[serde(default, deserialize_with = "lenient")]
    pub pages_processed: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub doc_size_bytes: Option<u64>,
}

/// Decode a field, falling back to its default on `null` or a type mismatch.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decode a sequence element by element. `None` unless the value is an array.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    })
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient_seq(deserializer)?.unwrap_or_default())
}

// ── Classified OCR result ────────────────────────────────────────────────

/// The two known OCR result shapes, plus a catch-all.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrResult {
    /// Flat text in the `output` field.
    Output(String),
    /// Per-page records. Never empty.
    Pages(Vec<OcrPage>),
    /// Neither shape was present (or `pages` was empty).
    Unknown,
}

impl OcrResult {
    /// Classify with `output` taking precedence over `pages`.
    pub fn from_response(response: OcrResponse) -> Self {
        match (response.output, response.pages) {
            (Some(text), _) => OcrResult::Output(text),
            (None, Some(pages)) if !pages.is_empty() => OcrResult::Pages(pages),
            _ => OcrResult::Unknown,
        }
    }

    /// Classify for a specific document kind.
    ///
    /// Paginated documents prefer a non-empty `pages` sequence even when an
    /// `output` field is also present; images use [`Self::from_response`].
    pub fn for_kind(response: OcrResponse, kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Image => Self::from_response(response),
            DocumentKind::PaginatedDocument => {
                match (response.pages.filter(|p| !p.is_empty()), response.output) {
                    (Some(pages), _) => OcrResult::Pages(pages),
                    (None, Some(text)) => OcrResult::Output(text),
                    (None, None) => OcrResult::Unknown,
                }
            }
        }
    }

    /// Number of pages in the result (1 for flat output, 0 for unknown).
    pub fn page_count(&self) -> usize {
        match self {
            OcrResult::Output(_) => 1,
            OcrResult::Pages(pages) => pages.len(),
            OcrResult::Unknown => 0,
        }
    }

    /// All embedded images across every page.
    pub fn images(&self) -> impl Iterator<Item = (usize, &OcrImage)> {
        let pages: &[OcrPage] = match self {
            OcrResult::Pages(pages) => pages,
            _ => &[],
        };
        pages
            .iter()
            .flat_map(|p| p.images.iter().map(move |img| (p.index, img)))
    }
}

impl From<OcrResponse> for OcrResult {
    fn from(response: OcrResponse) -> Self {
        Self::from_response(response)
    }
}

// ── Pipeline output ──────────────────────────────────────────────────────

/// Token accounting reported by the chat service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
}

/// Everything produced by one run of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutput {
    /// The chat model's answer, verbatim.
    pub report: String,
    /// Identifier assigned by the OCR service to the upload.
    pub file_id: String,
    pub document_kind: DocumentKind,
    /// Text that was sent to the extractor.
    pub ocr_text: String,
    /// Pages the OCR service returned (only page zero is used).
    pub ocr_pages: usize,
    pub ocr_model: String,
    pub chat_model: String,
    pub usage: Option<TokenUsage>,
    pub timings: Vec<StageTiming>,
    pub total_duration_ms: u64,
    /// Embedded images, kept for callers that want to save them. Not serialised.
    #[serde(skip)]
    pub images: Vec<(usize, OcrImage)>,
}
