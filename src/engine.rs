//! The conversion-engine contract.
//!
//! Everything that understands documents (OCR, layout, table structure,
//! picture classification) lives behind [`ConversionEngine`]. This crate only
//! configures the engine, reads the object graph it returns, and serialises
//! the results. The production implementation is
//! [`crate::docling::DoclingEngine`]; tests substitute in-memory engines.
//!
//! Document, table and picture handles are read-only: the core never
//! mutates what the engine produced.

use crate::error::Pdf2StructError;
use crate::pipeline::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Input formats a converter can be bound to. Only PDF is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Pdf,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Pdf => "pdf",
        }
    }
}

/// Outcome reported by the engine for one document.
///
/// Only [`ConversionStatus::Success`] is processable; every other value is a
/// terminal failure for that input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionStatus {
    Pending,
    Started,
    Success,
    PartialSuccess,
    Failure,
    Skipped,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Pending => "PENDING",
            ConversionStatus::Started => "STARTED",
            ConversionStatus::Success => "SUCCESS",
            ConversionStatus::PartialSuccess => "PARTIAL_SUCCESS",
            ConversionStatus::Failure => "FAILURE",
            ConversionStatus::Skipped => "SKIPPED",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionStatus::Success)
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionStatus {
    type Err = Pdf2StructError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches("ConversionStatus.");
        match name.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ConversionStatus::Pending),
            "STARTED" => Ok(ConversionStatus::Started),
            "SUCCESS" => Ok(ConversionStatus::Success),
            "PARTIAL_SUCCESS" => Ok(ConversionStatus::PartialSuccess),
            "FAILURE" => Ok(ConversionStatus::Failure),
            "SKIPPED" => Ok(ConversionStatus::Skipped),
            other => Err(Pdf2StructError::Engine(format!(
                "unknown conversion status '{other}'"
            ))),
        }
    }
}

/// How pictures are represented in Markdown and HTML exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRefMode {
    /// `<!-- image -->` marker text. (default)
    #[default]
    Placeholder,
    /// Base64 data URIs inline.
    Embedded,
    /// Image files next to the export, linked by relative path.
    Referenced,
}

impl ImageRefMode {
    /// Look up a configured mode name; unrecognised names fall back to
    /// [`ImageRefMode::Placeholder`].
    pub fn lookup(name: &str) -> ImageRefMode {
        match name.trim().to_ascii_lowercase().as_str() {
            "placeholder" => ImageRefMode::Placeholder,
            "embedded" => ImageRefMode::Embedded,
            "referenced" => ImageRefMode::Referenced,
            other => {
                tracing::warn!("Unknown image mode '{}', using placeholder", other);
                ImageRefMode::Placeholder
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRefMode::Placeholder => "placeholder",
            ImageRefMode::Embedded => "embedded",
            ImageRefMode::Referenced => "referenced",
        }
    }
}

/// Optional engine features that the configurer must probe before use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Thread-count and device selection.
    pub accelerator: bool,
}

/// Row and column counts of an exported table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableShape {
    pub rows: usize,
    pub columns: usize,
}

/// What the engine returns for one input.
#[derive(Debug)]
pub struct ConversionResult<D> {
    pub status: ConversionStatus,
    /// Present whenever the engine produced an object graph, which is always
    /// the case for [`ConversionStatus::Success`].
    pub document: Option<D>,
}

/// An external document-understanding engine.
pub trait ConversionEngine {
    type Document: DocumentHandle;

    /// Short engine name for logs and error messages.
    fn name(&self) -> &str;

    fn capabilities(&self) -> EngineCapabilities;

    /// The image mode Markdown and HTML will be saved in. Engines that render
    /// exports during conversion use it to avoid a second render; the default
    /// ignores it.
    fn with_image_mode(self, _mode: ImageRefMode) -> Self
    where
        Self: Sized,
    {
        self
    }

    /// Convert one file. Blocks until the engine finishes.
    ///
    /// `Err` means the engine could not run at all; a run that completed with
    /// a bad outcome is `Ok` with a non-success status.
    fn convert(
        &self,
        source: &Path,
        format: InputFormat,
        options: &PipelineOptions,
    ) -> Result<ConversionResult<Self::Document>, Pdf2StructError>;
}

/// Read-only view of a converted document.
pub trait DocumentHandle {
    type Table: TableHandle;
    type Picture: PictureHandle;

    fn num_pages(&self) -> usize;

    fn tables(&self) -> &[Self::Table];

    fn pictures(&self) -> &[Self::Picture];

    /// String form of every text item, in document order.
    fn text_items(&self) -> Vec<String>;

    /// The engine's full object graph as JSON.
    fn export_to_dict(&self) -> serde_json::Value;

    /// Markdown export; `strict_text` drops images and table markup.
    fn export_to_markdown(&self, strict_text: bool) -> String;

    fn save_as_markdown(&self, path: &Path, image_mode: ImageRefMode)
        -> Result<(), Pdf2StructError>;

    fn save_as_html(&self, path: &Path, image_mode: ImageRefMode) -> Result<(), Pdf2StructError>;
}

pub trait TableHandle {
    /// Export to a row/column grid (header rows excluded from `rows`).
    fn export_to_grid(&self) -> Result<TableShape, Pdf2StructError>;
}

pub trait PictureHandle {
    /// Whether a classification attribute is present (not whether it holds
    /// a useful value).
    fn has_classification(&self) -> bool;
}
