//! Prompts for the field-extraction call.
//!
//! Callers can override the system prompt via
//! [`crate::config::ProcessorConfig::system_prompt`]; the constant here is
//! used only when no override is provided.

/// Default system prompt: pull patient and prescription fields out of the
/// OCR text and answer in a fixed `Label: value` layout.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"Extract only the following from the medical document:
- Patient details (name, age, gender, etc.)
- Medicine name(s) with strength (e.g., Paracetamol 500mg)
- Dosage(s)

Ignore all other information.

Format your response as:
Patient Name: [name or "Not found"]
Age: [age or "Not found"]
Gender: [gender or "Not found"]
Medicine: [medicine name with strength]
Dosage: [dosage instructions]

If there are multiple medicines, list each with its strength and dosage."#;

/// Build the user turn that carries the OCR text.
pub fn document_message(text: &str) -> String {
    format!("Medical Document:\n\n{text}")
}
