//! The orchestrator: run every stage in order against one document.
//!
//! ```text
//! Validate → Upload → Sign → OCR → Normalize → Extract → Persist
//! ```
//!
//! Each stage's output is the next stage's only input. The first error
//! aborts the run; nothing is retried or skipped, and the report file is
//! only written after extraction succeeded.

use crate::client::TransportClient;
use crate::config::ProcessorConfig;
use crate::error::MedOcrError;
use crate::output::{OcrResult, ProcessOutput, StageTiming};
use crate::pipeline::extract::{self, Extraction};
use crate::pipeline::input::{DocumentKind, DocumentRef};
use crate::pipeline::sign::{self, SignedUrl};
use crate::pipeline::upload::{self, UploadedFile};
use crate::pipeline::{normalize, ocr, persist};
use crate::progress::Stage;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Chains the OCR service and the chat service for one document at a time.
///
/// Holds only the immutable configuration and the transport client; it
/// keeps no state between runs.
///
/// # Example
/// ```rust,no_run
/// use edgequake_medocr::{Credentials, MedOcrProcessor, ProcessorConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ProcessorConfig::builder()
///     .credentials(Credentials::new("mistral-key", "groq-key"))
///     .build()?;
/// let processor = MedOcrProcessor::new(config)?;
/// let report = processor.process_document("prescription.png", "ocr_output.txt").await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MedOcrProcessor {
    config: ProcessorConfig,
    client: TransportClient,
}

impl MedOcrProcessor {
    pub fn new(config: ProcessorConfig) -> Result<Self, MedOcrError> {
        let client = TransportClient::new(&config)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    // ── Individual stages ────────────────────────────────────────────────

    /// Upload a validated document; returns the service's file record.
    pub async fn upload_document(&self, doc: &DocumentRef) -> Result<UploadedFile, MedOcrError> {
        upload::upload_document(&self.client, doc).await
    }

    /// Exchange a file id for a signed URL using the configured expiry.
    pub async fn get_signed_url(&self, file_id: &str) -> Result<SignedUrl, MedOcrError> {
        sign::get_signed_url(&self.client, file_id, self.config.expiry_hours).await
    }

    /// Run OCR on the document behind `signed_url`.
    pub async fn run_ocr(
        &self,
        signed_url: &str,
        kind: DocumentKind,
    ) -> Result<OcrResult, MedOcrError> {
        ocr::run_ocr(&self.client, &self.config.ocr_model, signed_url, kind).await
    }

    /// Send normalized text to the chat model.
    pub async fn extract_fields(&self, text: &str) -> Result<Extraction, MedOcrError> {
        extract::extract_fields(&self.client, text, &self.config).await
    }

    // ── Full pipeline ────────────────────────────────────────────────────

    /// Run the whole pipeline and write the report to `output_path`.
    ///
    /// Returns the report text. Nothing is written if any earlier stage
    /// fails.
    pub async fn process_document(
        &self,
        input: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<String, MedOcrError> {
        let output = self.process_to_file(input, output_path).await?;
        Ok(output.report)
    }

    /// Like [`Self::process_document`] but returns the full run details.
    pub async fn process_to_file(
        &self,
        input: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<ProcessOutput, MedOcrError> {
        let mut output = self.analyze(input).await?;

        let tracker = StageTracker::start(&self.config, Stage::Persist);
        let saved = persist::save_to_file(&output.report, output_path.as_ref()).await;
        let timing = tracker.finish(saved)?;
        output.total_duration_ms += timing.duration_ms;
        output.timings.push(timing);

        Ok(output)
    }

    /// Run every stage except persistence.
    pub async fn analyze(&self, input: impl AsRef<Path>) -> Result<ProcessOutput, MedOcrError> {
        let total_start = Instant::now();
        let input = input.as_ref();
        info!("Processing document: {}", input.display());
        let mut timings = Vec::with_capacity(7);

        // ── Step 1: Validate ─────────────────────────────────────────────
        let tracker = StageTracker::start(&self.config, Stage::Validate);
        let doc = DocumentRef::from_path(input);
        let (doc, t) = tracker.finish_with(doc)?;
        timings.push(t);

        // ── Step 2: Upload ───────────────────────────────────────────────
        let tracker = StageTracker::start(&self.config, Stage::Upload);
        let uploaded = self.upload_document(&doc).await;
        let (uploaded, t) = tracker.finish_with(uploaded)?;
        timings.push(t);

        // ── Step 3: Sign ─────────────────────────────────────────────────
        let tracker = StageTracker::start(&self.config, Stage::Sign);
        let signed = self.get_signed_url(&uploaded.id).await;
        let (signed, t) = tracker.finish_with(signed)?;
        timings.push(t);

        // ── Step 4: OCR ──────────────────────────────────────────────────
        let tracker = StageTracker::start(&self.config, Stage::Ocr);
        let ocr_result = self.run_ocr(&signed.url, doc.kind()).await;
        let (ocr_result, t) = tracker.finish_with(ocr_result)?;
        timings.push(t);

        // ── Step 5: Normalize ────────────────────────────────────────────
        let tracker = StageTracker::start(&self.config, Stage::Normalize);
        let text = normalize::normalize(&ocr_result);
        if text.is_empty() {
            warn!("OCR produced no text for {}", input.display());
        }
        let (text, t) = tracker.finish_with(Ok(text))?;
        timings.push(t);

        // ── Step 6: Extract ──────────────────────────────────────────────
        let tracker = StageTracker::start(&self.config, Stage::Extract);
        let extraction = self.extract_fields(&text).await;
        let (extraction, t) = tracker.finish_with(extraction)?;
        timings.push(t);

        let total_duration_ms = total_start.elapsed().as_millis() as u64;
        info!("Pipeline complete in {}ms", total_duration_ms);

        Ok(ProcessOutput {
            report: extraction.content,
            file_id: uploaded.id,
            document_kind: doc.kind(),
            ocr_text: text,
            ocr_pages: ocr_result.page_count(),
            ocr_model: self.config.ocr_model.clone(),
            chat_model: self.config.chat_model.clone(),
            usage: extraction.usage,
            timings,
            total_duration_ms,
            images: ocr_result
                .images()
                .map(|(page, img)| (page, img.clone()))
                .collect(),
        })
    }

    /// Blocking wrapper around [`Self::process_document`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from inside
    /// an async context.
    pub fn process_document_sync(
        &self,
        input: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<String, MedOcrError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| MedOcrError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.process_document(input, output_path))
    }
}

/// Times one stage and reports it to the progress callback.
struct StageTracker<'a> {
    config: &'a ProcessorConfig,
    stage: Stage,
    start: Instant,
}

impl<'a> StageTracker<'a> {
    fn start(config: &'a ProcessorConfig, stage: Stage) -> Self {
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage_start(stage);
        }
        Self {
            config,
            stage,
            start: Instant::now(),
        }
    }

    fn finish_with<T>(self, result: Result<T, MedOcrError>) -> Result<(T, StageTiming), MedOcrError> {
        let duration_ms = self.start.elapsed().as_millis() as u64;
        match result {
            Ok(value) => {
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_stage_complete(self.stage, duration_ms);
                }
                Ok((
                    value,
                    StageTiming {
                        stage: self.stage,
                        duration_ms,
                    },
                ))
            }
            Err(e) => {
                warn!("Stage {} failed: {}", self.stage, e);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_stage_error(self.stage, &e.to_string());
                }
                Err(e)
            }
        }
    }

    fn finish(self, result: Result<(), MedOcrError>) -> Result<StageTiming, MedOcrError> {
        self.finish_with(result).map(|((), t)| t)
    }
}
