//! # edgequake-pdf2struct
//!
//! Convert PDF documents into structured outputs (JSON, Markdown, HTML, plain
//! text and a summary report) using the [docling] document-conversion engine.
//!
//! Docling does the document understanding: OCR, layout analysis, table
//! structure, picture classification, code and formula enrichment. This crate
//! maps a small set of named options onto docling's pipeline, validates
//! inputs, summarises what docling found, and writes the results.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Validate  exists, extension allow-list, size ceiling
//!  ├─ 2. Convert   docling (blocking; threads/device from config)
//!  ├─ 3. Check     only SUCCESS is processed further
//!  ├─ 4. Summarise metadata, statistics, table/picture summaries, preview
//!  └─ 5. Write     name.json  name.md  name.html  name.txt  name_report.txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2struct::{Config, DoclingEngine, DocumentProcessor};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.output.image_mode = "referenced".into();
//!     let processor = DocumentProcessor::new(DoclingEngine::detect()?, config);
//!
//!     let payload = processor.process("document.pdf")?;
//!     eprintln!(
//!         "{} pages, {} tables, {} words",
//!         payload.metadata.num_pages,
//!         payload.statistics.num_tables,
//!         payload.statistics.estimated_word_count
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2struct` binary and [`logging`] (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2struct = { version = "0.1", default-features = false }
//! ```
//!
//! ## Engine
//!
//! The `docling` executable is found through [`docling_auto`]: `DOCLING_BIN`,
//! then `PATH`, then `~/.local/bin`. Install it with `pip install docling`.
//! Any other engine can be plugged in by implementing
//! [`engine::ConversionEngine`].
//!
//! [docling]: https://github.com/docling-project/docling

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod docling;
pub mod engine;
pub mod error;
#[cfg(feature = "cli")]
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod report;
pub mod result;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Config, LogFormat, PartialConfig, ProfileFlags};
pub use docling::{DoclingDocument, DoclingEngine};
pub use engine::{ConversionEngine, ConversionStatus, DocumentHandle, ImageRefMode};
pub use error::{FormatError, Pdf2StructError};
pub use output::{OutputFormat, OutputWriter, WriteReport};
pub use pipeline::{configure, Converter, PipelineOptions};
pub use processor::{DocumentProcessor, ProcessedDocument};
pub use progress::{NoopProgressCallback, ProcessingProgressCallback, ProgressCallback};
pub use result::{Measured, ResultPayload, TableSummary};
pub use validate::{validate_input, InputFile};
