//! Error types for the edgequake-pdf2struct library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2StructError`]: **Fatal** for one input. The document cannot be
//!   processed (missing file, engine not installed, engine reported failure).
//!   Returned as `Err(Pdf2StructError)` from
//!   [`crate::processor::DocumentProcessor::process`].
//!
//! * [`FormatError`]: **Non-fatal**. One output format could not be written
//!   (disk full, engine export glitch) but the other formats are fine. Stored
//!   inside [`crate::output::WriteReport`] so a broken HTML export never costs
//!   the caller the JSON and the report.

use crate::engine::ConversionStatus;
use crate::output::OutputFormat;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2struct library.
#[derive(Debug, Error)]
pub enum Pdf2StructError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// The conversion engine is not installed or cannot be started.
    #[error("Conversion engine '{engine}' is not available: {detail}\n{hint}")]
    DependencyUnavailable {
        engine: String,
        detail: String,
        hint: String,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Extension is not on the `file.supported_extensions` allow-list.
    #[error("Unsupported file type '{extension}' for '{path}'\nSupported: {supported}")]
    UnsupportedFileType {
        path: PathBuf,
        extension: String,
        supported: String,
    },

    /// File exceeds `file.max_file_size_mb`.
    #[error("File too large: '{path}' is {size_mb:.1}MB > {limit_mb}MB\nRaise file.max_file_size_mb to process it.")]
    FileTooLarge {
        path: PathBuf,
        size_mb: f64,
        limit_mb: u64,
    },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The engine ran to completion but reported a non-success status.
    #[error("Conversion of '{path}' failed with status: {status}")]
    ConversionFailed {
        path: PathBuf,
        status: ConversionStatus,
    },

    /// Any other failure while converting or serialising one input.
    #[error("Processing '{path}' failed: {cause}")]
    ProcessingFailed { path: PathBuf, cause: String },

    /// The engine process misbehaved (crash, unreadable export, bad JSON).
    #[error("Engine error: {0}")]
    Engine(String),

    /// A table could not be exported to a row/column grid.
    #[error("Table export failed: {0}")]
    TableExport(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Payload could not be serialised to JSON.
    #[error("Failed to serialise JSON for '{path}': {source}")]
    JsonSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Configuration value or override file rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Pdf2StructError {
    /// True for the three validation failures that short-circuit before the
    /// engine is invoked.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Pdf2StructError::InputNotFound { .. }
                | Pdf2StructError::UnsupportedFileType { .. }
                | Pdf2StructError::FileTooLarge { .. }
        )
    }
}

/// A non-fatal error for a single output format.
///
/// Collected in [`crate::output::WriteReport`]; sibling formats are still
/// attempted.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("{format} output '{path}' failed: {detail}")]
pub struct FormatError {
    pub format: OutputFormat,
    pub path: PathBuf,
    pub detail: String,
}
