//! # edgequake-medocr
//!
//! Pull patient and prescription fields out of scanned medical documents by
//! chaining Mistral OCR with a chat LLM (Groq, OpenAI-compatible API).
//!
//! ## Pipeline Overview
//!
//! ```text
//! document (.pdf / .jpg / .jpeg / .png)
//!  │
//!  ├─ 1. Validate   extension → image | paginated document (no I/O)
//!  ├─ 2. Upload     POST /files (multipart, purpose=ocr) → file id
//!  ├─ 3. Sign       GET /files/{id}/url?expiry=24 → signed URL
//!  ├─ 4. OCR        POST /ocr (image_url | document_url) → pages / output
//!  ├─ 5. Normalize  output text, else page 0 markdown, else ""
//!  ├─ 6. Extract    POST /chat/completions with the extraction prompt
//!  └─ 7. Persist    overwrite ocr_output.txt with the model's answer
//! ```
//!
//! The pipeline is strictly sequential and does not retry: the first failing
//! stage aborts the run and no report is written.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_medocr::{Credentials, MedOcrProcessor, ProcessorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProcessorConfig::builder()
//!         .credentials(Credentials::new(
//!             std::env::var("MISTRAL_API_KEY")?,
//!             std::env::var("GROQ_API_KEY")?,
//!         ))
//!         .build()?;
//!     let processor = MedOcrProcessor::new(config)?;
//!     let report = processor
//!         .process_document("prescription.png", "ocr_output.txt")
//!         .await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medocr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-medocr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Credentials, ProcessorConfig, ProcessorConfigBuilder, DEFAULT_OUTPUT_PATH};
pub use error::{ErrorKind, MedOcrError};
pub use output::{OcrImage, OcrPage, OcrResponse, OcrResult, ProcessOutput, StageTiming, TokenUsage};
pub use pipeline::input::{DocumentKind, DocumentRef};
pub use pipeline::normalize::{normalize, normalize_value};
pub use pipeline::ocr::build_ocr_request;
pub use pipeline::persist::save_to_file;
pub use processor::MedOcrProcessor;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
