//! Progress-callback trait for per-document processing events.
//!
//! Attach an [`Arc<dyn ProcessingProgressCallback>`] with
//! [`crate::processor::DocumentProcessor::with_progress`] to receive events as
//! each input moves through validation, conversion and output writing.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2struct::progress::ProcessingProgressCallback;
//! use edgequake_pdf2struct::output::OutputFormat;
//! use std::path::Path;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl ProcessingProgressCallback for CountingCallback {
//!     fn on_output_written(&self, format: OutputFormat, path: &Path) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{format}: {}", path.display());
//!     }
//! }
//! ```

use crate::error::FormatError;
use crate::output::OutputFormat;
use std::path::Path;
use std::sync::Arc;

/// Called by [`crate::processor::DocumentProcessor`] as it handles one input.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ProcessingProgressCallback: Send + Sync {
    /// The input passed validation; `size_bytes` is its size on disk.
    fn on_validated(&self, source: &Path, size_bytes: u64) {
        let _ = (source, size_bytes);
    }

    /// Called just before the engine is invoked.
    fn on_conversion_start(&self, source: &Path) {
        let _ = source;
    }

    /// The engine returned a processable document.
    ///
    /// # Arguments
    /// * `num_pages`: page count reported by the engine
    /// * `elapsed_seconds`: wall time spent in the engine
    fn on_conversion_complete(&self, source: &Path, num_pages: usize, elapsed_seconds: f64) {
        let _ = (source, num_pages, elapsed_seconds);
    }

    fn on_output_written(&self, format: OutputFormat, path: &Path) {
        let _ = (format, path);
    }

    fn on_output_failed(&self, error: &FormatError) {
        let _ = error;
    }

    /// Processing of `source` ended with a fatal error.
    fn on_failed(&self, source: &Path, error: &str) {
        let _ = (source, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ProcessingProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::processor::DocumentProcessor`].
pub type ProgressCallback = Arc<dyn ProcessingProgressCallback>;
