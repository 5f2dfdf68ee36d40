//! Pipeline stages for OCR-based field extraction.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the processor only wires outputs to inputs.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ upload ──▶ sign ──▶ ocr ──▶ normalize ──▶ extract ──▶ persist
//! (ext)     (POST       (GET     (POST   (page 0)      (chat       (file)
//!            /files)    /url)    /ocr)                 completion)
//! ```
//!
//! 1. [`input`]      classify the path by extension; rejects before any I/O
//! 2. [`upload`]     multipart upload, returns the file id
//! 3. [`sign`]       file id → time-limited URL
//! 4. [`ocr`]        image/document request, returns [`crate::output::OcrResult`]
//! 5. [`normalize`]  OCR result → plain text; never fails
//! 6. [`extract`]    chat completion with the extraction prompt
//! 7. [`persist`]    overwrite the output file

pub mod extract;
pub mod input;
pub mod normalize;
pub mod ocr;
pub mod persist;
pub mod sign;
pub mod upload;
