//! Result payload: metadata, content statistics, extraction summary.
//!
//! [`build_payload`] is total. Anything that can fail while summarising a
//! converted document (a table that will not export, a file that can no
//! longer be stat'ed) degrades to a sentinel value instead of an error.
//!
//! Two fields are heuristics and are kept deliberately simple:
//!
//! * `num_figures` counts text items whose string form contains `"Figure"`.
//! * `has_headers` is `true` for every table that exports successfully.

use crate::config::ProcessingConfig;
use crate::engine::{DocumentHandle, PictureHandle, TableHandle};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Characters of strict text kept in `text_preview`, before the `...` suffix.
pub const PREVIEW_CHARS: usize = 500;

const PREVIEW_SUFFIX: &str = "...";

/// Everything known about one processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub metadata: Metadata,
    pub statistics: Statistics,
    /// The engine's object graph, passed through untouched.
    pub document_content: serde_json::Value,
    pub extraction_summary: ExtractionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub source_file: String,
    pub file_size_mb: f64,
    pub processing_time_seconds: f64,
    pub num_pages: usize,
    pub processor_version: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub processing_timestamp: String,
    pub configuration: ConfigSnapshot,
}

/// The four processing toggles that shape what the payload can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub ocr_enabled: bool,
    pub table_extraction: bool,
    pub image_processing: bool,
    pub picture_classification: bool,
}

impl From<&ProcessingConfig> for ConfigSnapshot {
    fn from(p: &ProcessingConfig) -> Self {
        ConfigSnapshot {
            ocr_enabled: p.enable_ocr,
            table_extraction: p.enable_tables,
            image_processing: p.generate_picture_images,
            picture_classification: p.enable_picture_classification,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub num_tables: usize,
    pub num_pictures: usize,
    pub num_figures: usize,
    pub estimated_word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub pages: usize,
    pub tables: Vec<TableSummary>,
    pub images: Vec<ImageSummary>,
    pub text_preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    /// 1-based, in document order.
    pub table_id: usize,
    pub rows: Measured<usize>,
    pub columns: Measured<usize>,
    pub has_headers: Measured<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSummary {
    /// 1-based, in document order.
    pub image_id: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub has_classification: bool,
}

// ── Measured ──────────────────────────────────────────────────────────────

/// A value that may not have been determinable. Serialises as the bare
/// value, or as the string `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measured<T> {
    Known(T),
    Unknown,
}

impl<T: fmt::Display> fmt::Display for Measured<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measured::Known(v) => v.fmt(f),
            Measured::Unknown => f.write_str(UNKNOWN),
        }
    }
}

const UNKNOWN: &str = "unknown";

impl<T: Serialize> Serialize for Measured<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Measured::Known(v) => v.serialize(serializer),
            Measured::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MeasuredRepr<T> {
    Known(T),
    Label(String),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Measured<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match MeasuredRepr::<T>::deserialize(deserializer)? {
            MeasuredRepr::Known(v) => Ok(Measured::Known(v)),
            MeasuredRepr::Label(s) if s == UNKNOWN => Ok(Measured::Unknown),
            MeasuredRepr::Label(s) => Err(serde::de::Error::custom(format!(
                "expected a value or \"{UNKNOWN}\", got \"{s}\""
            ))),
        }
    }
}

// ── Builder ───────────────────────────────────────────────────────────────

/// Name and version recorded in `metadata.processor_version`.
pub fn processor_version() -> String {
    format!("pdf2struct {}", env!("CARGO_PKG_VERSION"))
}

/// Assemble the payload for a converted document.
pub fn build_payload<D: DocumentHandle>(
    document: &D,
    source: &Path,
    processing_time_seconds: f64,
    config: ConfigSnapshot,
) -> ResultPayload {
    let strict_text = document.export_to_markdown(true);
    let num_pages = document.num_pages();

    let metadata = Metadata {
        source_file: source.display().to_string(),
        file_size_mb: file_size_mb(source),
        processing_time_seconds: round2(processing_time_seconds),
        num_pages,
        processor_version: processor_version(),
        processing_timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        configuration: config,
    };

    let statistics = Statistics {
        num_tables: document.tables().len(),
        num_pictures: document.pictures().len(),
        num_figures: count_figures(&document.text_items()),
        estimated_word_count: strict_text.split_whitespace().count(),
    };

    let extraction_summary = ExtractionSummary {
        pages: num_pages,
        tables: summarize_tables(document.tables()),
        images: summarize_pictures(document.pictures()),
        text_preview: text_preview(&strict_text),
    };

    ResultPayload {
        metadata,
        statistics,
        document_content: document.export_to_dict(),
        extraction_summary,
    }
}

pub fn summarize_tables<T: TableHandle>(tables: &[T]) -> Vec<TableSummary> {
    tables
        .iter()
        .enumerate()
        .map(|(i, table)| match table.export_to_grid() {
            Ok(shape) => TableSummary {
                table_id: i + 1,
                rows: Measured::Known(shape.rows),
                columns: Measured::Known(shape.columns),
                has_headers: Measured::Known(true),
            },
            Err(e) => {
                debug!("Table {} export failed: {}", i + 1, e);
                TableSummary {
                    table_id: i + 1,
                    rows: Measured::Unknown,
                    columns: Measured::Unknown,
                    has_headers: Measured::Unknown,
                }
            }
        })
        .collect()
}

pub fn summarize_pictures<P: PictureHandle>(pictures: &[P]) -> Vec<ImageSummary> {
    pictures
        .iter()
        .enumerate()
        .map(|(i, picture)| ImageSummary {
            image_id: i + 1,
            kind: "picture".to_string(),
            has_classification: picture.has_classification(),
        })
        .collect()
}

/// First [`PREVIEW_CHARS`] characters plus `...`, which is always appended.
pub fn text_preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    preview.push_str(PREVIEW_SUFFIX);
    preview
}

pub fn count_figures(text_items: &[String]) -> usize {
    text_items.iter().filter(|t| t.contains("Figure")).count()
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn file_size_mb(path: &Path) -> f64 {
    match std::fs::metadata(path) {
        Ok(m) => round2(m.len() as f64 / (1024.0 * 1024.0)),
        Err(_) => 0.0,
    }
}
