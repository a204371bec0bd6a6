//! CLI binary for qa2deck.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service,
//! `render` writes a deck to a local file, `submit` plays the spreadsheet
//! client against a running service.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use qa2deck::client::{build_request, parse_sheet, submit};
use qa2deck::pipeline::request::decode_records;
use qa2deck::{
    render_to_file, server, DeckService, DeckStore, DriveStore, LocalStore, MemoryStore,
    ProcessResponse, ServiceConfig, ServiceConfigBuilder, TextCapacity,
};
use serde_json::Value;
use std::io;
use std::path::PathBuf;
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
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on :8111, uploading to Google Drive
  GOOGLE_DRIVE_ACCESS_TOKEN=$(gcloud auth print-access-token) qa2deck serve

  # Keep decks in a "Create Games" subfolder and share them by link
  qa2deck serve --output-folder "Create Games" --share-publicly

  # Serve without cloud storage (destinations are directories under ./decks)
  qa2deck serve --backend local --local-root ./decks

  # Render a request body to a local file
  qa2deck render request.json -o quiz.pptx

  # Send a sheet export to a running service
  qa2deck submit sheet.json --folder-id 1AbCdEf --url http://localhost:8111/process

REQUEST BODY:
  {"data": [{"question": "Capital of France?", "answer": "Paris"}],
   "folderId": "<destination folder id>"}

ENVIRONMENT VARIABLES:
  GOOGLE_DRIVE_ACCESS_TOKEN   Bearer token for the Drive backend
  PORT                        Listen port (default 8111)
  QA2DECK_*                   Most flags, see --help of each subcommand
  RUST_LOG                    Log filter, overrides -v / -q
"#;

/// Turn question/answer rows into PowerPoint decks in cloud storage.
#[derive(Parser, Debug)]
#[command(
    name = "qa2deck",
    version,
    about = "Turn question/answer rows into PowerPoint decks in cloud storage",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "QA2DECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "QA2DECK_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (GET /, POST /process).
    Serve(ServeArgs),
    /// Render a request body or record array to a local .pptx.
    Render(RenderArgs),
    /// Convert a sheet export to a request and POST it to a service.
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind.
    #[arg(long, env = "QA2DECK_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8111)]
    port: u16,

    /// Storage backend.
    #[arg(long, env = "QA2DECK_BACKEND", value_enum, default_value = "drive")]
    backend: Backend,

    /// Drive access token.
    #[arg(long, env = "GOOGLE_DRIVE_ACCESS_TOKEN", hide_env_values = true)]
    drive_token: Option<String>,

    /// File holding the Drive access token (read once at startup).
    #[arg(long, env = "QA2DECK_DRIVE_TOKEN_FILE", conflicts_with = "drive_token")]
    drive_token_file: Option<PathBuf>,

    /// Root directory for the local backend; destinations are subdirectories.
    #[arg(long, env = "QA2DECK_LOCAL_ROOT")]
    local_root: Option<PathBuf>,

    /// Destination ids accepted by the memory backend.
    #[arg(long = "memory-destination", env = "QA2DECK_MEMORY_DESTINATIONS", value_delimiter = ',')]
    memory_destinations: Vec<String>,

    /// Parent directory for per-request scratch space.
    #[arg(long, env = "QA2DECK_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Leading part of generated file names.
    #[arg(long, env = "QA2DECK_FILE_PREFIX", default_value = "Quiz")]
    file_prefix: String,

    /// strftime format for the file-name timestamp.
    #[arg(long, env = "QA2DECK_TIMESTAMP_FORMAT", default_value = "%b %d %I %M %p")]
    timestamp_format: String,

    /// UTC offset in minutes for the file-name timestamp (e.g. 330 for IST).
    #[arg(long, env = "QA2DECK_UTC_OFFSET_MINUTES", default_value_t = 0, allow_negative_numbers = true)]
    utc_offset_minutes: i32,

    /// Subfolder inside the destination to place decks in (created if absent).
    #[arg(long, env = "QA2DECK_OUTPUT_FOLDER")]
    output_folder: Option<String>,

    /// Make uploaded decks viewable by anyone with the link.
    #[arg(long, env = "QA2DECK_SHARE_PUBLICLY")]
    share_publicly: bool,

    /// Deadline in seconds for the storage write.
    #[arg(long, env = "QA2DECK_STORAGE_TIMEOUT", default_value_t = 60)]
    storage_timeout: u64,

    /// Maximum records per request.
    #[arg(long, env = "QA2DECK_MAX_RECORDS", default_value_t = 1000)]
    max_records: usize,

    /// Maximum request body size in bytes.
    #[arg(long, env = "QA2DECK_MAX_BODY_BYTES", default_value_t = 4 * 1024 * 1024)]
    max_body_bytes: usize,

    #[command(flatten)]
    deck: DeckArgs,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// JSON file: a request body (`{"data": [...]}`) or a bare record array.
    input: PathBuf,

    /// Output .pptx path.
    #[arg(short, long, default_value = "deck.pptx")]
    output: PathBuf,

    #[command(flatten)]
    deck: DeckArgs,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Sheet export: a JSON array of rows, header row first.
    sheet: PathBuf,

    /// Destination folder id.
    #[arg(long, env = "QA2DECK_FOLDER_ID")]
    folder_id: Option<String>,

    /// Service endpoint.
    #[arg(long, env = "QA2DECK_URL", default_value = "http://127.0.0.1:8111/process")]
    url: String,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Print the request body instead of sending it.
    #[arg(long)]
    dry_run: bool,
}

/// Deck appearance, shared by `serve` and `render`.
#[derive(Args, Debug)]
struct DeckArgs {
    /// Framing slide title.
    #[arg(long, env = "QA2DECK_DECK_TITLE", default_value = "Questions & Answers")]
    deck_title: String,

    /// Framing slide subtitle.
    #[arg(long, env = "QA2DECK_DECK_SUBTITLE", default_value = "")]
    deck_subtitle: String,

    /// Directory with slideMaster1.xml, slideLayout1.xml and theme1.xml overrides.
    #[arg(long, env = "QA2DECK_TEMPLATE_DIR")]
    template_dir: Option<PathBuf>,

    /// Question block character budget.
    #[arg(long, env = "QA2DECK_QUESTION_MAX_CHARS", default_value_t = TextCapacity::QUESTION.max_chars)]
    question_max_chars: usize,

    /// Question block line budget.
    #[arg(long, env = "QA2DECK_QUESTION_MAX_LINES", default_value_t = TextCapacity::QUESTION.max_lines)]
    question_max_lines: usize,

    /// Answer block character budget.
    #[arg(long, env = "QA2DECK_ANSWER_MAX_CHARS", default_value_t = TextCapacity::ANSWER.max_chars)]
    answer_max_chars: usize,

    /// Answer block line budget.
    #[arg(long, env = "QA2DECK_ANSWER_MAX_LINES", default_value_t = TextCapacity::ANSWER.max_lines)]
    answer_max_lines: usize,
}

impl DeckArgs {
    fn apply(&self, builder: ServiceConfigBuilder) -> ServiceConfigBuilder {
        let builder = builder
            .deck_title(&self.deck_title)
            .deck_subtitle(&self.deck_subtitle)
            .question_capacity(TextCapacity::new(
                self.question_max_chars,
                self.question_max_lines,
            ))
            .answer_capacity(TextCapacity::new(self.answer_max_chars, self.answer_max_lines));
        match &self.template_dir {
            Some(dir) => builder.template_dir(dir),
            None => builder,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    /// Google Drive folders.
    Drive,
    /// Directories under --local-root.
    Local,
    /// In-process memory (nothing persists).
    Memory,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Render(args) => render(args, cli.quiet).await,
        Command::Submit(args) => submit_sheet(args, cli.quiet).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut builder = ServiceConfig::builder()
        .host(&args.host)
        .port(args.port)
        .file_prefix(&args.file_prefix)
        .timestamp_format(&args.timestamp_format)
        .utc_offset_minutes(args.utc_offset_minutes)
        .share_publicly(args.share_publicly)
        .storage_timeout_secs(args.storage_timeout)
        .max_records(args.max_records)
        .max_body_bytes(args.max_body_bytes);
    if let Some(dir) = &args.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    if let Some(folder) = &args.output_folder {
        builder = builder.output_folder(folder);
    }
    let config = args
        .deck
        .apply(builder)
        .build()
        .context("Invalid configuration")?;

    let store = build_store(&args).await?;
    server::run(DeckService::new(config, store))
        .await
        .context("HTTP server failed")
}

async fn build_store(args: &ServeArgs) -> Result<Arc<dyn DeckStore>> {
    match args.backend {
        Backend::Drive => {
            let token = match (&args.drive_token, &args.drive_token_file) {
                (Some(token), _) => token.clone(),
                (None, Some(path)) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read Drive token from {:?}", path))?,
                (None, None) => bail!(
                    "The drive backend needs GOOGLE_DRIVE_ACCESS_TOKEN, --drive-token or --drive-token-file"
                ),
            };
            let token = token.trim();
            if token.is_empty() {
                bail!("Drive access token is empty");
            }
            Ok(Arc::new(DriveStore::new(token).context("Failed to create Drive client")?))
        }
        Backend::Local => {
            let root = args
                .local_root
                .as_ref()
                .context("The local backend needs --local-root")?;
            if !root.is_dir() {
                bail!("Local root {:?} is not a directory", root);
            }
            Ok(Arc::new(LocalStore::new(root)))
        }
        Backend::Memory => {
            let store = MemoryStore::new();
            for dest in &args.memory_destinations {
                store.add_destination(dest.trim());
            }
            Ok(Arc::new(store))
        }
    }
}

async fn render(args: RenderArgs, quiet: bool) -> Result<()> {
    let config = args
        .deck
        .apply(ServiceConfig::builder())
        .build()
        .context("Invalid configuration")?;

    let text = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {:?}", args.input))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{:?} is not valid JSON", args.input))?;
    let data = match value.get("data") {
        Some(data) => data,
        None => &value,
    };
    let records = decode_records(data, config.max_records).context("Invalid records")?;

    let slides = render_to_file(records, &args.output, &config)
        .await
        .context("Rendering failed")?;

    if !quiet {
        eprintln!(
            "{}  {} slides  →  {}",
            green("✔"),
            slides,
            bold(&args.output.display().to_string())
        );
    }
    Ok(())
}

async fn submit_sheet(args: SubmitArgs, quiet: bool) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.sheet)
        .await
        .with_context(|| format!("Failed to read {:?}", args.sheet))?;
    let rows = parse_sheet(&text)?;
    let request = build_request(&rows, args.folder_id.as_deref())?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let response = submit(&args.url, &request, Duration::from_secs(args.timeout)).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    match response {
        ProcessResponse::Success { file_name, slide_count, .. } => {
            if !quiet {
                eprintln!("{}  {} slides  →  {}", green("✔"), slide_count, bold(&file_name));
            }
            Ok(())
        }
        ProcessResponse::Failure { error_kind, detail, .. } => {
            bail!("{} {}: {}", red("✘"), error_kind, detail)
        }
    }
}
