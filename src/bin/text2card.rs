//! CLI binary for text2card.
//!
//! A thin shim over the library crate: maps flags to `StudioConfig`, runs one
//! acquire → generate → export round, and writes the PNGs.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use text2card::services::{ChromeRasterizer, HttpExtractor, LlmCardGenerator, PdfiumExtractor};
use text2card::{
    CardArtifact, CardStyle, ExtractionBackend, Extractor, Notice, Outcome, Phase,
    SessionObserver, SessionSnapshot, SourceFile, Studio, StudioConfig,
};
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

// ── Terminal observer using indicatif ────────────────────────────────────────

/// Shows a spinner while the studio is busy and prints notices above it.
struct CliObserver {
    bar: ProgressBar,
    started: std::sync::Mutex<Option<Instant>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self {
            bar,
            started: std::sync::Mutex::new(None),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SessionObserver for CliObserver {
    fn on_phase_change(&self, from: Phase, to: Phase) {
        let mut started = self.started.lock().unwrap_or_else(|e| e.into_inner());
        match to {
            Phase::Generating => {
                *started = Some(Instant::now());
                self.bar.set_prefix("Generating");
                self.bar.set_message("asking the model for cards…");
                self.bar.reset_elapsed();
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            Phase::Exporting => {
                *started = Some(Instant::now());
                self.bar.set_prefix("Exporting");
                self.bar.set_message("rendering image…");
                self.bar.reset_elapsed();
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            _ if from.is_busy() => {
                self.bar.disable_steady_tick();
                let secs = started
                    .take()
                    .map(|t| t.elapsed().as_secs_f64())
                    .unwrap_or(0.0);
                self.bar.set_message(String::new());
                self.bar.println(format!(
                    "  {} {} {}",
                    green("✓"),
                    from,
                    dim(&format!("{secs:.1}s"))
                ));
            }
            _ => {}
        }
    }

    fn on_source_changed(&self, chars: usize) {
        self.bar
            .println(format!("  {} source text: {chars} chars", green("✓")));
    }

    fn on_file_loaded(&self, name: &str, _chars: usize) {
        self.bar
            .println(format!("  {} loaded {}", green("✓"), bold(name)));
    }

    fn on_notice(&self, notice: &Notice) {
        self.bar
            .println(format!("  {} {}", red("✗"), red(&notice.message)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Cards from typed text, first card exported to the current directory
  text2card "Ownership and borrowing let Rust prevent data races at compile time."

  # Cards from a document, all cards exported
  text2card --file article.pdf --all -o cards/

  # Export the second card only, with a custom file-name prefix
  text2card --file notes.txt --card 2 --label notes

  # Read the text from stdin, print the session and cards as JSON
  cat essay.txt | text2card - --json --no-export

  # Extract PDFs in-process with pdfium instead of the extraction service
  text2card --file paper.pdf --local-pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium for --local-pdf
  TEXT2CARD_EXTRACT_URL   Extraction service endpoint

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Generate:        text2card --file article.txt -o cards/

  Export needs a Chrome or Chromium binary; pass --chrome to pick one.
"#;

/// Turn text or documents into concept cards and export them as PNG.
#[derive(Parser, Debug)]
#[command(
    name = "text2card",
    version,
    about = "Turn text or documents into concept cards and export them as PNG",
    long_about = "Generate a small gallery of visual concept cards from typed text or a \
TXT/PDF/DOCX file using an LLM, then render the chosen card off-screen with headless Chrome \
into a high-resolution PNG with a transparent background.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source text; `-` reads it from stdin.
    text: Option<String>,

    /// Read the source text from a .txt, .pdf or .docx file.
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Directory the PNG files are written to.
    #[arg(short, long, env = "TEXT2CARD_OUT", default_value = ".")]
    out: PathBuf,

    /// Card to export (1-based).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    card: u32,

    /// Export every card in the batch.
    #[arg(long, conflicts_with = "card")]
    all: bool,

    /// Generate only; skip the export step.
    #[arg(long)]
    no_export: bool,

    /// File-name prefix of exported images.
    #[arg(long, env = "TEXT2CARD_LABEL", default_value = "concept-card")]
    label: String,

    /// Comma-separated card styles: minimal, dark, colorful, or free text.
    #[arg(long, env = "TEXT2CARD_STYLES", value_delimiter = ',')]
    styles: Vec<String>,

    /// Minimum source length in characters.
    #[arg(long, env = "TEXT2CARD_MIN_CHARS", default_value_t = 10)]
    min_chars: usize,

    /// LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "TEXT2CARD_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "TEXT2CARD_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// Retries on LLM failure.
    #[arg(long, env = "TEXT2CARD_MAX_RETRIES", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: u32,

    /// LLM call timeout in seconds.
    #[arg(long, env = "TEXT2CARD_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "TEXT2CARD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Extraction service endpoint for PDF/DOCX.
    #[arg(
        long,
        env = "TEXT2CARD_EXTRACT_URL",
        default_value = text2card::config::DEFAULT_EXTRACT_ENDPOINT
    )]
    extract_endpoint: String,

    /// Extraction service timeout in seconds.
    #[arg(long, env = "TEXT2CARD_EXTRACT_TIMEOUT", default_value_t = 60)]
    extract_timeout: u64,

    /// Extract PDFs locally with pdfium instead of the extraction service.
    #[arg(long)]
    local_pdf: bool,

    /// Chrome/Chromium binary used for rasterisation.
    #[arg(long, env = "CHROME")]
    chrome: Option<PathBuf>,

    /// Render on a white background instead of a transparent one.
    #[arg(long)]
    opaque: bool,

    /// Print the session snapshot and cards as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "TEXT2CARD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TEXT2CARD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TEXT2CARD_QUIET")]
    quiet: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    session: SessionSnapshot,
    cards: &'a [CardArtifact],
    exported: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
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

    // ── Build studio ─────────────────────────────────────────────────────
    let config = build_config(&cli).await?;
    let extractor: Arc<dyn Extractor> = match &config.extraction {
        ExtractionBackend::Local => Arc::new(PdfiumExtractor::new()),
        ExtractionBackend::Http { endpoint } => Arc::new(
            HttpExtractor::new(endpoint, config.extract_timeout_secs)
                .context("Invalid extraction endpoint")?,
        ),
    };
    let generator =
        Arc::new(LlmCardGenerator::from_config(&config).context("LLM provider setup failed")?);
    let mut rasterizer = ChromeRasterizer::new();
    if let Some(ref path) = cli.chrome {
        rasterizer = rasterizer.with_chrome_path(path);
    }

    let observer = show_progress.then(CliObserver::new);
    let mut studio = Studio::new(config, extractor, generator, Arc::new(rasterizer));
    if let Some(ref obs) = observer {
        studio = studio.with_observer(obs.clone());
    }

    let result = run(&cli, &studio).await;
    if let Some(obs) = observer {
        obs.finish();
    }
    let exported = result?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let cards = studio.cards();
        let report = JsonReport {
            session: studio.snapshot(),
            cards: &cards,
            exported,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        let cards = studio.cards().len();
        eprintln!("{} {} cards generated", green("✔"), bold(&cards.to_string()));
        for path in &exported {
            eprintln!("   →  {}", bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// One acquire → generate → export round. Returns the written paths.
async fn run(cli: &Cli, studio: &Studio) -> Result<Vec<PathBuf>> {
    // ── Acquire ──────────────────────────────────────────────────────────
    if let Some(ref path) = cli.file {
        studio
            .set_from_file(&SourceFile::from_path(path))
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
    } else {
        let text = match cli.text.as_deref() {
            Some("-") => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read stdin")?;
                buf
            }
            Some(text) => text.to_string(),
            None => anyhow::bail!("Provide the source text or --file"),
        };
        studio.set_direct_text(&text);
    }

    // ── Generate ─────────────────────────────────────────────────────────
    let count = match studio.generate().await.context("Card generation failed")? {
        Outcome::Done(count) => count,
        Outcome::Rejected(why) => anyhow::bail!("Nothing generated: {why}"),
    };

    if cli.no_export {
        return Ok(Vec::new());
    }

    // ── Export ───────────────────────────────────────────────────────────
    let indices: Vec<usize> = if cli.all {
        (0..count).collect()
    } else {
        let index = cli.card as usize - 1;
        if index >= count {
            anyhow::bail!("--card {} requested but only {} cards were generated", cli.card, count);
        }
        vec![index]
    };

    let mut written = Vec::with_capacity(indices.len());
    for index in indices {
        studio.select(index)?;
        let image = match studio.export_current().await.context("Export failed")? {
            Outcome::Done(image) => image,
            Outcome::Rejected(why) => anyhow::bail!("Export not started: {why}"),
        };
        let path = image.save_in(&cli.out).await?;
        written.push(path);
    }
    Ok(written)
}

/// Map CLI args to `StudioConfig`.
async fn build_config(cli: &Cli) -> Result<StudioConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let extraction = if cli.local_pdf {
        ExtractionBackend::Local
    } else {
        ExtractionBackend::Http {
            endpoint: cli.extract_endpoint.clone(),
        }
    };

    let mut canvas = text2card::CanvasSpec::default();
    canvas.transparent = !cli.opaque;

    let mut builder = StudioConfig::builder()
        .min_source_chars(cli.min_chars)
        .canvas(canvas)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .extraction(extraction)
        .extract_timeout_secs(cli.extract_timeout)
        .export_label(cli.label.clone());

    if !cli.styles.is_empty() {
        builder = builder.card_styles(cli.styles.iter().map(|s| CardStyle::parse(s)).collect());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
