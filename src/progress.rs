//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::ProcessorConfigBuilder::progress_callback`] to be told
//! when each stage starts, finishes, or fails. The CLI uses this to drive a
//! spinner; library users can forward events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use edgequake_medocr::{PipelineProgressCallback, ProcessorConfig, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = ProcessorConfig::builder()
//!     .ocr_api_key("mistral-key")
//!     .chat_api_key("groq-key")
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// One step of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Upload,
    Sign,
    Ocr,
    Normalize,
    Extract,
    Persist,
}

impl Stage {
    /// Short human label used in logs and the CLI spinner.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Upload => "upload",
            Stage::Sign => "sign",
            Stage::Ocr => "ocr",
            Stage::Normalize => "normalize",
            Stage::Extract => "extract",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the processor as it moves through the pipeline.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Stages run one at a time, so events never overlap,
/// but the trait is `Send + Sync` so the callback can live in an `Arc`
/// shared with other tasks.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a stage fails. No further stage runs afterwards.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ProcessorConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
