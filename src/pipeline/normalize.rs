//! Normalize: pick the text that goes to the extractor.
//!
//! Only page zero of a paginated result is used. Later pages are dropped
//! with a warning.

use crate::output::{OcrResponse, OcrResult};
use tracing::warn;

/// Extract the best available text from a classified OCR result.
///
/// 1. `Output(text)` → `text` verbatim
/// 2. `Pages(pages)` → page zero's `markdown`, or `""` if it has none
/// 3. `Unknown` → `""`
pub fn normalize(result: &OcrResult) -> String {
    match result {
        OcrResult::Output(text) => text.clone(),
        OcrResult::Pages(pages) => {
            if pages.len() > 1 {
                warn!(
                    "OCR returned {} pages; only page 0 is sent for extraction",
                    pages.len()
                );
            }
            pages
                .first()
                .and_then(|p| p.markdown.clone())
                .unwrap_or_default()
        }
        OcrResult::Unknown => String::new(),
    }
}

/// Normalize a raw JSON value of unknown shape. Never fails.
pub fn normalize_value(value: &serde_json::Value) -> String {
    normalize(&OcrResult::from_response(OcrResponse::from_value(value.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_output_verbatim() {
        assert_eq!(normalize_value(&json!({"output": "X"})), "X");
    }

    #[test]
    fn page_zero_markdown() {
        assert_eq!(normalize_value(&json!({"pages": [{"markdown": "Y"}]})), "Y");
    }

    #[test]
    fn only_page_zero_used() {
        assert_eq!(
            normalize_value(&json!({"pages": [{"markdown": "Y"}, {"markdown": "Z"}]})),
            "Y"
        );
    }

    #[test]
    fn empty_shapes_give_empty_string() {
        assert_eq!(normalize_value(&json!({"pages": []})), "");
        assert_eq!(normalize_value(&json!({})), "");
        assert_eq!(normalize_value(&json!({"pages": [{"index": 0}]})), "");
    }

    #[test]
    fn null_images_keep_output() {
        assert_eq!(
            normalize_value(&json!({"output": "X", "pages": [{"markdown": "Y", "images": null}]})),
            "X"
        );
    }

    #[test]
    fn null_dimensions_keep_page_zero() {
        let value = json!({
            "pages": [{"index": 0, "markdown": "Jane", "images": [], "dimensions": {"dpi": null}}]
        });
        assert_eq!(normalize_value(&value), "Jane");
    }

    #[test]
    fn unexpected_types_do_not_fail() {
        assert_eq!(normalize_value(&json!({"output": 42})), "");
        assert_eq!(normalize_value(&json!([1, 2, 3])), "");
        assert_eq!(normalize_value(&json!(null)), "");
    }
}
