//! CLI binary for edgequake-doc2llm.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractorConfig`, runs a batch and prints the combined output.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doc2llm::{
    extract_batch, BatchProgressCallback, BatchReport, BatchStatus, ExtractError, Extractor,
    ExtractorConfig, JsonRequest, OutputFormat, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the whole batch plus a log line per input.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} inputs  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Instant::now(),
            errors: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_inputs: usize) {
        self.bar.set_length(total_inputs as u64);
        self.bar.reset_eta();
    }

    fn on_input_start(&self, _index: usize, _total: usize, input: &str) {
        self.bar.set_message(truncate(input, 40));
    }

    fn on_input_complete(&self, index: usize, total: usize, processor: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            dim(processor),
        ));
        self.bar.inc(1);
    }

    fn on_input_error(&self, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            red("✗"),
            index + 1,
            total,
            red(&truncate(error, 80)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_inputs: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} inputs extracted in {:.1}s",
            if failed == 0 { green("✔") } else if success_count == 0 { red("✘") } else { cyan("⚠") },
            bold(&success_count.to_string()),
            total_inputs,
            self.started.elapsed().as_secs_f64(),
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a document to Markdown (stdout)
  doc2llm report.docx

  # Several inputs: files, URLs and literal text, combined
  doc2llm report.pdf https://example.com "plain text note" -o json

  # Export every table of a spreadsheet as CSV
  doc2llm quarterly.xlsx -o csv -f tables.csv

  # Extract named fields as JSON
  doc2llm invoice.pdf -o json --extract-fields invoice_number,total_amount

  # Fill a JSON schema
  doc2llm invoice.pdf -o json --json-schema invoice.schema.json

  # List supported input formats
  doc2llm --list-formats

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (OCR of images and PDFs)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory or file of the pdfium shared library

EXIT STATUS:
  0 when every input succeeded and the output was written, 1 otherwise.
"#;

/// Convert documents, URLs and text to LLM-ready formats.
#[derive(Parser, Debug)]
#[command(
    name = "doc2llm",
    version,
    about = "Convert documents, URLs and text into Markdown, HTML, JSON, CSV or plain text",
    long_about = "Convert documents (PDF, Word, Excel, PowerPoint, HTML, images, text), web pages \
and literal text into LLM-ready output. Images and PDFs are transcribed by a vision LLM; \
every other format is parsed locally.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files, HTTP/HTTPS URLs or literal text.
    #[arg(required_unless_present = "list_formats")]
    input: Vec<String>,

    /// Output format.
    #[arg(short, long, env = "DOC2LLM_OUTPUT", value_enum, default_value = "markdown")]
    output: FormatArg,

    /// Write output to this file instead of stdout.
    #[arg(short = 'f', long, env = "DOC2LLM_OUTPUT_FILE")]
    output_file: Option<PathBuf>,

    /// List supported input formats and exit.
    #[arg(long)]
    list_formats: bool,

    /// Keep the source line layout (`--preserve-layout false` to reflow).
    #[arg(long, env = "DOC2LLM_PRESERVE_LAYOUT", default_value_t = true,
          action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    preserve_layout: bool,

    /// Keep image references in converted markup.
    #[arg(long, env = "DOC2LLM_INCLUDE_IMAGES")]
    include_images: bool,

    /// Run OCR on images and PDF pages (`--ocr-enabled false` to disable).
    #[arg(long, env = "DOC2LLM_OCR_ENABLED", default_value_t = true,
          action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    ocr_enabled: bool,

    /// Comma-separated field names to extract (JSON output only).
    #[arg(long, value_delimiter = ',')]
    extract_fields: Vec<String>,

    /// JSON schema file to fill (JSON output only).
    #[arg(long)]
    json_schema: Option<PathBuf>,

    /// Vision LLM model ID used for OCR (e.g. gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Number of inputs processed at once.
    #[arg(short, long, env = "DOC2LLM_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOC2LLM_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-OCR-call LLM timeout in seconds.
    #[arg(long, env = "DOC2LLM_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "DOC2LLM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2LLM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2LLM_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Markdown,
    Html,
    Json,
    Text,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.list_formats;
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

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;
    let extractor = Extractor::new(&config);
    tracing::debug!("Processors: {:?}", extractor.processor_names());

    if cli.list_formats {
        print_supported_formats(&extractor.supported_formats());
        return Ok(ExitCode::SUCCESS);
    }

    let request = JsonRequest::new(
        (!cli.extract_fields.is_empty()).then(|| cli.extract_fields.clone()),
        load_schema(cli.json_schema.as_deref()).await?,
    );

    // ── Run batch ────────────────────────────────────────────────────────
    let report = extract_batch(&extractor, cli.input.as_slice()).await;
    print_manifest(&report);

    let format = OutputFormat::from(cli.output);
    let rendered = match report.render(format, &request) {
        Ok(out) => out,
        Err(ExtractError::NoTablesFound) => {
            eprintln!("{} No tables found in any of the input files", red("✘"));
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            eprintln!("{} {e}", red("✘"));
            return Ok(ExitCode::FAILURE);
        }
    };

    // ── Write output ─────────────────────────────────────────────────────
    if let Some(ref path) = cli.output_file {
        if let Err(e) = write_atomic(path, &rendered).await {
            eprintln!("{} {e}", red("✘"));
            return Ok(ExitCode::FAILURE);
        }
        if !cli.quiet {
            eprintln!("{} Output written to {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && (cli.verbose || cli.input.len() > 1) {
        eprintln!(
            "\nSummary: {} successful, {} failed",
            report.success_count(),
            report.total() - report.success_count()
        );
    }

    Ok(ExitCode::from(report.exit_code()))
}

/// Map CLI args to `ExtractorConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder()
        .preserve_layout(cli.preserve_layout)
        .include_images(cli.include_images)
        .ocr_enabled(cli.ocr_enabled)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn load_schema(path: Option<&Path>) -> Result<Option<serde_json::Value>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read JSON schema from {}", path.display()))?;
    let schema = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON schema in {}", path.display()))?;
    Ok(Some(schema))
}

/// Write via a sibling temp file and rename, so readers never see a
/// partial file.
async fn write_atomic(path: &Path, content: &str) -> Result<(), ExtractError> {
    let fail = |source: io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    tokio::fs::write(&tmp_path, content).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)
}

fn print_manifest(report: &BatchReport) {
    let failures = report.failures();
    if failures.is_empty() {
        return;
    }
    if report.status() == BatchStatus::Failed {
        eprintln!("{} No inputs were successfully processed.", red("✘"));
    }
    eprintln!("Errors encountered:");
    for f in failures {
        eprintln!("  - {}: {}", f.input, f.message);
    }
}

fn print_supported_formats(formats: &HashSet<String>) {
    const CATEGORIES: &[(&str, &[&str])] = &[
        ("Documents", &[".pdf", ".docx", ".txt", ".text", ".md", ".markdown", ".rst"]),
        ("Data Files", &[".xlsx", ".xls", ".xlsm", ".xlsb", ".ods", ".csv", ".tsv", ".json", ".xml", ".yaml", ".yml", ".toml"]),
        ("Presentations", &[".pptx"]),
        ("Web", &["URLs"]),
        ("Images", &[".jpg", ".jpeg", ".png", ".bmp", ".tiff", ".tif", ".webp", ".gif"]),
        ("Web Files", &[".html", ".htm"]),
    ];

    println!("Supported input formats:\n");
    let mut listed = HashSet::new();
    for (category, members) in CATEGORIES {
        let present: Vec<&str> = members
            .iter()
            .copied()
            .filter(|f| formats.contains(*f))
            .collect();
        if present.is_empty() {
            continue;
        }
        println!("{}:", bold(category));
        println!("  {}", present.join(", "));
        listed.extend(present);
    }

    let mut other: Vec<&str> = formats
        .iter()
        .map(String::as_str)
        .filter(|f| !listed.contains(f))
        .collect();
    if !other.is_empty() {
        other.sort_unstable();
        println!("{}:", bold("Other"));
        println!("  {}", other.join(", "));
    }
}
