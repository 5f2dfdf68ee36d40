//! CLI binary for edgequake-medocr.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ProcessorConfig`, runs the pipeline and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_medocr::{
    Credentials, MedOcrProcessor, PipelineProgressCallback, ProcessOutput, ProcessorConfig,
    ProgressCallback, Stage, DEFAULT_OUTPUT_PATH,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the current stage, plus one
/// log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn describe(stage: Stage) -> &'static str {
        match stage {
            Stage::Validate => "Checking file type…",
            Stage::Upload => "Uploading document…",
            Stage::Sign => "Requesting signed URL…",
            Stage::Ocr => "Running OCR…",
            Stage::Normalize => "Collecting OCR text…",
            Stage::Extract => "Extracting fields…",
            Stage::Persist => "Saving report…",
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(Self::describe(stage));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        if stage == Stage::Persist {
            self.bar.finish_and_clear();
        }
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<10} {}", red("✗"), stage.label(), red(&msg)));
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract fields from a prescription photo (writes ocr_output.txt)
  medocr prescription.jpg

  # PDF input, custom output path
  medocr discharge-summary.pdf -o summary.txt

  # Full run details as JSON (report, OCR text, timings, token usage)
  medocr --json scan.png > run.json

  # Save the page images returned by the OCR service
  medocr --images-dir ./images scan.pdf

SUPPORTED INPUTS:
  .pdf                 sent as document_url (only page 1 text is extracted)
  .jpg .jpeg .png      sent as image_url

OUTPUT FORMAT (as requested from the model, not validated):
  Patient Name: ...
  Age: ...
  Gender: ...
  Medicine: ...
  Dosage: ...

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY       Mistral API key (OCR)
  GROQ_API_KEY          Groq API key (field extraction)
  MEDOCR_OCR_MODEL      Override OCR model
  MEDOCR_CHAT_MODEL     Override chat model
"#;

/// Extract patient and prescription fields from medical documents.
#[derive(Parser, Debug)]
#[command(
    name = "medocr",
    version,
    about = "Extract patient and prescription fields from medical documents via Mistral OCR + Groq",
    long_about = "Upload a medical document (PDF or image) to Mistral OCR, then ask a Groq-hosted \
chat model to pull out patient name, age, gender, medicines and dosages. The answer is \
printed and saved to a text file.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local document path (.pdf, .jpg, .jpeg, .png).
    input: PathBuf,

    /// Write the report to this file (overwritten on each run).
    #[arg(short, long, env = "MEDOCR_OUTPUT", default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Mistral API key used for upload, signing and OCR.
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    mistral_api_key: String,

    /// Groq API key used for field extraction.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    groq_api_key: String,

    /// OCR model ID.
    #[arg(long, env = "MEDOCR_OCR_MODEL")]
    ocr_model: Option<String>,

    /// Chat model ID used for extraction.
    #[arg(long, env = "MEDOCR_CHAT_MODEL")]
    chat_model: Option<String>,

    /// Base URL of the Mistral API.
    #[arg(long, env = "MEDOCR_OCR_BASE_URL")]
    ocr_base_url: Option<String>,

    /// Base URL of the OpenAI-compatible chat API.
    #[arg(long, env = "MEDOCR_CHAT_BASE_URL")]
    chat_base_url: Option<String>,

    /// Signed URL lifetime in hours.
    #[arg(long, env = "MEDOCR_EXPIRY_HOURS", default_value_t = 24,
          value_parser = clap::value_parser!(u32).range(1..))]
    expiry_hours: u32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "MEDOCR_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "MEDOCR_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: u32,

    /// Extraction call timeout in seconds.
    #[arg(long, env = "MEDOCR_EXTRACT_TIMEOUT", default_value_t = 30)]
    extract_timeout: u64,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "MEDOCR_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print the full run details as JSON instead of the report.
    #[arg(long, env = "MEDOCR_JSON")]
    json: bool,

    /// Save images embedded in the OCR response to this directory.
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "MEDOCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDOCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the report.
    #[arg(short, long, env = "MEDOCR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let processor = MedOcrProcessor::new(config).context("Failed to initialise processor")?;

    // ── Run pipeline ─────────────────────────────────────────────────────
    let output = processor
        .process_to_file(&cli.input, &cli.output)
        .await
        .with_context(|| format!("Processing '{}' failed", cli.input.display()))?;

    if let Some(ref dir) = cli.images_dir {
        let saved = save_images(&output, dir).await?;
        if !cli.quiet {
            eprintln!("{} {} image(s) saved to {}", green("✔"), saved, dir.display());
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.report.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.report.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet {
        eprintln!(
            "{}  {}ms  →  {}",
            green("✔"),
            output.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        if let Some(usage) = output.usage {
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&usage.prompt_tokens.to_string()),
                dim(&usage.completion_tokens.to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ProcessorConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ProcessorConfig> {
    let mut builder = ProcessorConfig::builder()
        .credentials(Credentials::new(&cli.mistral_api_key, &cli.groq_api_key))
        .expiry_hours(cli.expiry_hours)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .extract_timeout_secs(cli.extract_timeout);

    if let Some(ref model) = cli.ocr_model {
        builder = builder.ocr_model(model);
    }
    if let Some(ref model) = cli.chat_model {
        builder = builder.chat_model(model);
    }
    if let Some(ref url) = cli.ocr_base_url {
        builder = builder.ocr_base_url(url);
    }
    if let Some(ref url) = cli.chat_base_url {
        builder = builder.chat_base_url(url);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Decode and write every embedded OCR image into `dir`. Returns the count.
async fn save_images(output: &ProcessOutput, dir: &Path) -> Result<usize> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut saved = 0;
    for (page, image) in &output.images {
        let Some(decoded) = image.decode_base64() else {
            continue;
        };
        let bytes = decoded.with_context(|| format!("Image '{}' is not valid base64", image.id))?;
        let path = dir.join(image_file_name(*page, saved, &image.id));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        saved += 1;
    }
    Ok(saved)
}

/// File name for an embedded image. Only the last component of the
/// service-supplied id is kept.
fn image_file_name(page: usize, ordinal: usize, id: &str) -> String {
    match Path::new(id).file_name().and_then(|n| n.to_str()) {
        Some(name) => format!("page{page}-{name}"),
        None => format!("page{page}-img{ordinal}.bin"),
    }
}
