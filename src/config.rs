//! Configuration types for the OCR → extraction pipeline.
//!
//! All behaviour is controlled through [`ProcessorConfig`], built via its
//! [`ProcessorConfigBuilder`]. The two API keys are the only required values;
//! every other knob has a default matching the hosted services.

use crate::error::MedOcrError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default base URL of the Mistral API.
pub const DEFAULT_OCR_BASE_URL: &str = "https://api.mistral.ai/v1";
/// Default base URL of Groq's OpenAI-compatible API.
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// Default OCR model.
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";
/// Default chat model used for field extraction.
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.3-70b-versatile";
/// Default report destination.
pub const DEFAULT_OUTPUT_PATH: &str = "ocr_output.txt";

/// Bearer tokens for the two services.
///
/// Immutable once built. `Debug` never prints the secrets.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Key for the OCR service (Mistral).
    pub ocr_api_key: String,
    /// Key for the chat-completion service (Groq).
    pub chat_api_key: String,
}

impl Credentials {
    pub fn new(ocr_api_key: impl Into<String>, chat_api_key: impl Into<String>) -> Self {
        Self {
            ocr_api_key: ocr_api_key.into(),
            chat_api_key: chat_api_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ocr_api_key", &redact(&self.ocr_api_key))
            .field("chat_api_key", &redact(&self.chat_api_key))
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Configuration for a [`crate::MedOcrProcessor`].
///
/// # Example
/// ```rust
/// use edgequake_medocr::{Credentials, ProcessorConfig};
///
/// let config = ProcessorConfig::builder()
///     .credentials(Credentials::new("mistral-key", "groq-key"))
///     .expiry_hours(1)
///     .build()
///     .unwrap();
/// assert_eq!(config.chat_model, "llama-3.3-70b-versatile");
/// ```
#[derive(Clone)]
pub struct ProcessorConfig {
    pub credentials: Credentials,

    /// Base URL of the OCR service. Default: [`DEFAULT_OCR_BASE_URL`].
    pub ocr_base_url: String,

    /// Base URL of the chat-completion service. Default: [`DEFAULT_CHAT_BASE_URL`].
    pub chat_base_url: String,

    /// OCR model identifier. Default: `mistral-ocr-latest`.
    pub ocr_model: String,

    /// Chat model identifier. Default: `llama-3.3-70b-versatile`.
    pub chat_model: String,

    /// Lifetime of the signed document URL, in hours. Default: 24.
    pub expiry_hours: u32,

    /// Sampling temperature for extraction. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the chat model may generate. Default: 1024.
    pub max_tokens: u32,

    /// Timeout of the extraction call in seconds. Default: 30.
    ///
    /// Upload, signing and OCR requests have no timeout.
    pub extract_timeout_secs: u64,

    /// Custom extraction prompt. If None, uses
    /// [`crate::prompts::EXTRACTION_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Optional stage-progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            ocr_base_url: DEFAULT_OCR_BASE_URL.to_string(),
            chat_base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            ocr_model: DEFAULT_OCR_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            expiry_hours: 24,
            temperature: 0.3,
            max_tokens: 1024,
            extract_timeout_secs: 30,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ProcessorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorConfig")
            .field("credentials", &self.credentials)
            .field("ocr_base_url", &self.ocr_base_url)
            .field("chat_base_url", &self.chat_base_url)
            .field("ocr_model", &self.ocr_model)
            .field("chat_model", &self.chat_model)
            .field("expiry_hours", &self.expiry_hours)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("extract_timeout_secs", &self.extract_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl ProcessorConfig {
    /// Create a new builder for `ProcessorConfig`.
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProcessorConfig`].
#[derive(Debug)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = credentials;
        self
    }

    pub fn ocr_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.credentials.ocr_api_key = key.into();
        self
    }

    pub fn chat_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.credentials.chat_api_key = key.into();
        self
    }

    pub fn ocr_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_base_url = url.into();
        self
    }

    pub fn chat_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.chat_base_url = url.into();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = model.into();
        self
    }

    pub fn expiry_hours(mut self, hours: u32) -> Self {
        self.config.expiry_hours = hours;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn extract_timeout_secs(mut self, secs: u64) -> Self {
        self.config.extract_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ProcessorConfig, MedOcrError> {
        let c = &mut self.config;
        if c.credentials.ocr_api_key.trim().is_empty() {
            return Err(MedOcrError::InvalidConfig(
                "OCR (Mistral) API key is empty".into(),
            ));
        }
        if c.credentials.chat_api_key.trim().is_empty() {
            return Err(MedOcrError::InvalidConfig(
                "chat (Groq) API key is empty".into(),
            ));
        }
        if c.expiry_hours == 0 {
            return Err(MedOcrError::InvalidConfig(
                "Signed URL expiry must be ≥ 1 hour".into(),
            ));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(MedOcrError::InvalidConfig(format!(
                "Temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if c.max_tokens == 0 {
            return Err(MedOcrError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.extract_timeout_secs == 0 {
            return Err(MedOcrError::InvalidConfig(
                "Extraction timeout must be ≥ 1 second".into(),
            ));
        }
        c.ocr_base_url = c.ocr_base_url.trim_end_matches('/').to_string();
        c.chat_base_url = c.chat_base_url.trim_end_matches('/').to_string();
        Ok(self.config)
    }
}
