//! CLI binary for edgequake-pdf2struct.
//!
//! A thin shim over the library crate that folds CLI flags into a
//! `PartialConfig`, runs the processor over each input and prints results.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use edgequake_pdf2struct::config::PartialOutput;
use edgequake_pdf2struct::config::PartialProcessing;
use edgequake_pdf2struct::logging::{self, LogSettings};
use edgequake_pdf2struct::{
    Config, DoclingEngine, DocumentProcessor, FormatError, OutputFormat, PartialConfig,
    Pdf2StructError, ProcessedDocument, ProcessingProgressCallback, ProfileFlags, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing::level_filters::LevelFilter;

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

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress callback: one spinner per input while docling runs,
/// then a line per written artifact.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut b| b.take())
    }
}

impl ProcessingProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, source: &Path) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Converting");
        bar.set_message(display_name(source));
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn on_conversion_complete(&self, source: &Path, num_pages: usize, elapsed_seconds: f64) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
        eprintln!(
            "{} {}  {} pages in {:.2}s",
            green("✔"),
            bold(&display_name(source)),
            num_pages,
            elapsed_seconds
        );
    }

    fn on_output_written(&self, format: OutputFormat, path: &Path) {
        eprintln!("   {} {}", dim(&format!("{format:<8}")), path.display());
    }

    fn on_output_failed(&self, error: &FormatError) {
        eprintln!("   {} {}", cyan("⚠"), error);
    }

    fn on_failed(&self, _source: &Path, _error: &str) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
    }
}

fn display_name(p: &Path) -> String {
    p.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| p.display().to_string())
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full pipeline: OCR, tables, picture classification
  pdf2struct run document.pdf

  # Faster: no OCR, no enrichment
  pdf2struct run --no-ocr --simple document.pdf

  # Several files, custom output directory
  pdf2struct run -o results/ a.pdf b.pdf c.pdf

  # Start from a JSON config file, flags still win
  pdf2struct run --config settings.json --no-tables document.pdf

  # Show the resolved configuration
  pdf2struct config --simple

  # Check the docling installation
  pdf2struct doctor

OUTPUT (for document.pdf):
  document.json         metadata, statistics, docling document, summary
  document.md           Markdown
  document.html         HTML
  document.txt          plain text
  document_report.txt   human-readable processing report

ENVIRONMENT VARIABLES:
  DOCLING_BIN             Path to the docling executable (skips PATH lookup)
  RUST_LOG                Console log filter (overrides logging.level)
  PDF2STRUCT_CONFIG       Default for --config
  PDF2STRUCT_OUTPUT_DIR   Default for --output-dir

SETUP:
  1. Install docling:  pip install docling
  2. Verify:           pdf2struct doctor
  3. Convert:          pdf2struct run document.pdf
"#;

/// Convert PDF documents to JSON, Markdown, HTML, text and a report with docling.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2struct",
    version,
    about = "Convert PDF documents to structured outputs with docling",
    long_about = "Convert PDF documents into JSON, Markdown, HTML, plain text and a \
processing report. OCR, layout analysis, table structure and picture classification \
are performed by the docling engine.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one or more PDF files.
    Run(RunArgs),
    /// Print the resolved configuration as JSON.
    Config(ProfileArgs),
    /// Report the located docling executable, version and capabilities.
    Doctor,
}

/// Processing profile shared by `run` and `config`.
#[derive(Args, Debug, Clone)]
struct ProfileArgs {
    /// JSON file with configuration overrides.
    #[arg(long, env = "PDF2STRUCT_CONFIG")]
    config: Option<PathBuf>,

    /// Disable OCR.
    #[arg(long)]
    no_ocr: bool,

    /// Disable table-structure extraction.
    #[arg(long)]
    no_tables: bool,

    /// Faster processing: no picture classification, code/formula enrichment
    /// or picture images.
    #[arg(long)]
    simple: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// PDF files to process.
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    profile: ProfileArgs,

    /// Directory receiving the outputs (default: output).
    #[arg(short, long, env = "PDF2STRUCT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Compute device: auto, cpu, cuda.
    #[arg(long, env = "PDF2STRUCT_DEVICE")]
    device: Option<String>,

    /// Image handling in Markdown/HTML: placeholder, embedded, referenced.
    #[arg(long, env = "PDF2STRUCT_IMAGE_MODE")]
    image_mode: Option<String>,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2STRUCT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level logs on the console.
    #[arg(short, long, env = "PDF2STRUCT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2STRUCT_QUIET")]
    quiet: bool,
}

impl ProfileArgs {
    fn flags(&self) -> ProfileFlags {
        ProfileFlags {
            no_ocr: self.no_ocr,
            no_tables: self.no_tables,
            simple: self.simple,
        }
    }
}

impl RunArgs {
    fn overrides(&self) -> PartialConfig {
        PartialConfig {
            processing: PartialProcessing {
                device: self.device.clone(),
                ..Default::default()
            },
            output: PartialOutput {
                output_directory: self.output_dir.clone(),
                image_mode: self.image_mode.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let outcome = match cli.command {
        Command::Run(args) => run(args),
        Command::Config(profile) => show_config(&profile).map(|_| true),
        Command::Doctor => doctor(),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            ExitCode::from(1)
        }
    }
}

/// Defaults ← `--config` file ← command-line flags.
fn resolve_config(profile: &ProfileArgs, extra: PartialConfig) -> Result<Config> {
    let file = match &profile.config {
        Some(path) => PartialConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PartialConfig::default(),
    };
    let flags = profile.flags().to_partial().merged_with(extra);
    Ok(Config::build(Some(file.merged_with(flags))))
}

fn run(args: RunArgs) -> Result<bool> {
    let config = resolve_config(&args.profile, args.overrides())?;

    // ── Engine ───────────────────────────────────────────────────────────
    // Located before any log file is opened so a missing engine touches
    // nothing on disk.
    let engine = DoclingEngine::detect()?;

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep INFO records for
    // the log file unless -v is given.
    let show_progress = !args.quiet && !args.no_progress;
    let settings = LogSettings::from_config(&config.logging)?;
    let console_level = if args.quiet {
        LevelFilter::ERROR
    } else if args.verbose {
        LevelFilter::DEBUG
    } else if show_progress {
        LevelFilter::WARN
    } else {
        settings.console_level
    };
    let _log_guard = logging::install(&settings.with_console_level(console_level))
        .context("Failed to set up logging")?;
    info!(
        "Using docling {} at {}",
        engine.version().unwrap_or("unknown"),
        engine.executable().display()
    );

    let output_dir = config.output.output_directory.clone();

    let mut processor = DocumentProcessor::new(engine, config);
    if show_progress {
        let cb = CliProgressCallback::new();
        processor = processor.with_progress(cb as ProgressCallback);
    }

    // ── Process inputs ───────────────────────────────────────────────────
    let mut failed = 0usize;
    for input in &args.inputs {
        match processor.process_detailed(input) {
            Ok(done) => {
                if !args.quiet {
                    print_summary(input, &done, &output_dir);
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}", red("✘"), failure_line(input, &e));
            }
        }
    }

    if args.inputs.len() > 1 && !args.quiet {
        let ok = args.inputs.len() - failed;
        eprintln!(
            "{} {}/{} files processed",
            if failed == 0 { green("✔") } else { red("✘") },
            bold(&ok.to_string()),
            args.inputs.len()
        );
    }
    Ok(failed == 0)
}

/// One line per failed input. Validation failures keep their remediation
/// hint; engine failures show the first line and leave detail to the log.
fn failure_line(input: &Path, e: &Pdf2StructError) -> String {
    let msg = e.to_string();
    let mut lines = msg.lines();
    let head = lines.next().unwrap_or_default();
    match lines.next() {
        Some(hint) if e.is_validation() => {
            format!("{}: {head} {}", input.display(), dim(&format!("({hint})")))
        }
        _ => format!("{}: {head}", input.display()),
    }
}

fn print_summary(input: &Path, done: &ProcessedDocument, output_dir: &Path) {
    let meta = &done.payload.metadata;
    let stats = &done.payload.statistics;
    let rule = "=".repeat(60);
    println!();
    println!("{rule}");
    println!("{}", bold("PROCESSING COMPLETED SUCCESSFULLY"));
    println!("{rule}");
    println!("{} File: {}", green("✓"), input.display());
    println!("{} Pages: {}", green("✓"), meta.num_pages);
    println!("{} Time: {}s", green("✓"), meta.processing_time_seconds);
    println!("{} Tables: {}", green("✓"), stats.num_tables);
    println!("{} Images: {}", green("✓"), stats.num_pictures);
    println!("{} Output: {}", green("✓"), output_dir.display());
    if !done.outputs.written.is_empty() {
        println!("\nGenerated files:");
        for (format, path) in &done.outputs.written {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("  • {name} {}", dim(&format!("({format})")));
        }
    }
    for f in &done.outputs.failed {
        println!("  {} {}", red("✘"), f);
    }
    if let Some(backup) = &done.backup {
        println!("  • {} {}", backup.display(), dim("(backup)"));
    }
    println!("{rule}");
}

fn show_config(profile: &ProfileArgs) -> Result<()> {
    let config = resolve_config(profile, PartialConfig::default())?;
    let json = serde_json::to_string_pretty(&config).context("Failed to serialise config")?;
    println!("{json}");
    Ok(())
}

fn doctor() -> Result<bool> {
    let install = match docling_auto::probe_docling() {
        Ok(install) => install,
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            return Ok(false);
        }
    };
    let caps = install.capabilities;
    let mark = |on: bool| if on { green("✓") } else { dim("–") };

    println!("{} docling {}", green("✔"), bold(install.version_or_unknown()));
    println!("   {}", install.path.display());
    println!();
    println!("   {} --device / --num-threads", mark(caps.accelerator()));
    println!("   {} --ocr-lang", mark(caps.ocr_lang));
    println!("   {} --enrich-code", mark(caps.enrich_code));
    println!("   {} --enrich-formula", mark(caps.enrich_formula));
    println!("   {} --enrich-picture-classes", mark(caps.enrich_picture_classes));
    println!("   {} --image-export-mode", mark(caps.image_export_mode));
    println!("   {} --from json_docling", mark(caps.json_input));
    Ok(true)
}
