//! Configuration types for PDF processing.
//!
//! All behaviour is controlled through [`Config`], which holds four option
//! groups: [`ProcessingConfig`] (what the engine does), [`OutputConfig`]
//! (what gets written), [`FileConfig`] (what inputs are accepted) and
//! [`LoggingConfig`] (where diagnostics go).
//!
//! Every field has a documented default. Callers change only what they care
//! about through a [`PartialConfig`], merged group-by-group by
//! [`Config::build`]: overridden keys replace defaults, the rest keep them.
//! Unknown keys in a partial configuration are rejected at parse time.
//!
//! The resolved `Config` is built once per invocation and never mutated.

use crate::error::Pdf2StructError;
use serde::{Deserialize, Serialize};
use std::convert::identity;
use std::path::{Path, PathBuf};

/// The complete, resolved configuration.
///
/// # Example
/// ```rust
/// use edgequake_pdf2struct::config::{Config, PartialConfig, PartialProcessing};
///
/// let config = Config::build(Some(PartialConfig {
///     processing: PartialProcessing {
///         enable_ocr: Some(false),
///         ..Default::default()
///     },
///     ..Default::default()
/// }));
/// assert!(!config.processing.enable_ocr);
/// assert!(config.processing.enable_tables);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub processing: ProcessingConfig,
    pub output: OutputConfig,
    pub file: FileConfig,
    pub logging: LoggingConfig,
}

/// Engine pipeline options. Default profile favours completeness over speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// OCR for scanned pages. Default: true.
    pub enable_ocr: bool,
    /// OCR language codes, e.g. `["en", "fr"]`. Default: `["en"]`.
    pub ocr_languages: Vec<String>,
    /// Table-structure recognition. Default: true.
    pub enable_tables: bool,
    /// Match predicted table cells back to PDF text cells. Only meaningful
    /// when `enable_tables` is on. Default: true.
    pub table_cell_matching: bool,
    /// Rasterise full pages. Default: true.
    pub generate_page_images: bool,
    /// Crop individual pictures. Default: true.
    pub generate_picture_images: bool,
    /// Classify pictures (chart, photo, diagram, …). Default: true.
    pub enable_picture_classification: bool,
    /// Page-image scale factor. Only meaningful when `generate_page_images`
    /// is on. Default: 2.0.
    pub image_resolution_scale: f32,
    /// Detect and extract code blocks. Default: false.
    pub enable_code_enrichment: bool,
    /// Detect and extract formulas. Default: false.
    pub enable_formula_enrichment: bool,
    /// Engine worker threads. Default: 4.
    pub num_threads: usize,
    /// `auto`, `cpu` or `cuda`; anything else falls back to `auto`.
    /// Default: `auto`.
    pub device: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            enable_ocr: true,
            ocr_languages: vec!["en".to_string()],
            enable_tables: true,
            table_cell_matching: true,
            generate_page_images: true,
            generate_picture_images: true,
            enable_picture_classification: true,
            image_resolution_scale: 2.0,
            enable_code_enrichment: false,
            enable_formula_enrichment: false,
            num_threads: 4,
            device: "auto".to_string(),
        }
    }
}

/// Which artifacts are written and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving every artifact. Default: `output`.
    pub output_directory: PathBuf,
    pub save_json: bool,
    pub save_markdown: bool,
    pub save_html: bool,
    pub save_text: bool,
    /// Fixed-layout `_report.txt`.
    pub save_summary: bool,
    /// `placeholder`, `embedded` or `referenced`; anything else falls back
    /// to `placeholder`. Default: `placeholder`.
    pub image_mode: String,
    /// Spaces per JSON nesting level; 0 writes compact JSON. Default: 2.
    pub json_indent: usize,
    /// Escape every non-ASCII character as `\uXXXX`. Default: false.
    pub json_ensure_ascii: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("output"),
            save_json: true,
            save_markdown: true,
            save_html: true,
            save_text: true,
            save_summary: true,
            image_mode: "placeholder".to_string(),
            json_indent: 2,
            json_ensure_ascii: false,
        }
    }
}

impl OutputConfig {
    /// True when at least one artifact will be written.
    pub fn any_enabled(&self) -> bool {
        self.save_json
            || self.save_markdown
            || self.save_html
            || self.save_text
            || self.save_summary
    }
}

/// Input acceptance rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Allowed extensions including the dot, matched case-insensitively.
    /// Default: `[".pdf"]`.
    pub supported_extensions: Vec<String>,
    /// Size ceiling in MiB (inclusive). Default: 100.
    pub max_file_size_mb: u64,
    /// Copy the source into the output directory before converting.
    /// Default: false.
    pub create_backup: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            supported_extensions: vec![".pdf".to_string()],
            max_file_size_mb: 100,
            create_backup: false,
        }
    }
}

/// Diagnostics sink settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `TRACE`, `DEBUG`, `INFO`, `WARNING`/`WARN`, `ERROR`. Default: `INFO`.
    pub level: String,
    /// Line layout of log records. Default: [`LogFormat::Full`].
    pub format: LogFormat,
    /// Also append records to `log_file`. Default: true.
    pub save_logs: bool,
    /// Default: `processing.log`.
    pub log_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: LogFormat::default(),
            save_logs: true,
            log_file: PathBuf::from("processing.log"),
        }
    }
}

/// Log record layout, mapped onto `tracing-subscriber` formatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `timestamp LEVEL target: message` (default)
    #[default]
    Full,
    /// Single-line, abbreviated.
    Compact,
    /// Multi-line, human-oriented.
    Pretty,
}

// ── Partial configuration (overrides) ─────────────────────────────────────

/// Caller-supplied overrides. Every field is optional; unknown keys are an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub processing: PartialProcessing,
    pub output: PartialOutput,
    pub file: PartialFile,
    pub logging: PartialLogging,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialProcessing {
    pub enable_ocr: Option<bool>,
    pub ocr_languages: Option<Vec<String>>,
    pub enable_tables: Option<bool>,
    pub table_cell_matching: Option<bool>,
    pub generate_page_images: Option<bool>,
    pub generate_picture_images: Option<bool>,
    pub enable_picture_classification: Option<bool>,
    pub image_resolution_scale: Option<f32>,
    pub enable_code_enrichment: Option<bool>,
    pub enable_formula_enrichment: Option<bool>,
    pub num_threads: Option<usize>,
    pub device: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialOutput {
    pub output_directory: Option<PathBuf>,
    pub save_json: Option<bool>,
    pub save_markdown: Option<bool>,
    pub save_html: Option<bool>,
    pub save_text: Option<bool>,
    pub save_summary: Option<bool>,
    pub image_mode: Option<String>,
    pub json_indent: Option<usize>,
    pub json_ensure_ascii: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialFile {
    pub supported_extensions: Option<Vec<String>>,
    pub max_file_size_mb: Option<u64>,
    pub create_backup: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialLogging {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
    pub save_logs: Option<bool>,
    pub log_file: Option<PathBuf>,
}

/// Copy every field that is set in `$src` onto `$dst`, passing the value
/// through `$wrap` (`identity` for a full config, `Some` for a partial).
macro_rules! merge_fields {
    ($wrap:expr; $dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $src.$field {
                $dst.$field = $wrap(v);
            }
        )+
    };
}

impl Config {
    /// Merge `overrides` onto the defaults, group by group.
    pub fn build(overrides: Option<PartialConfig>) -> Config {
        let mut config = Config::default();
        if let Some(o) = overrides {
            config.apply(o);
        }
        config
    }

    /// Read a JSON [`PartialConfig`] from disk and merge it onto the defaults.
    pub fn from_file(path: &Path) -> Result<Config, Pdf2StructError> {
        Ok(Config::build(Some(PartialConfig::from_json_file(path)?)))
    }

    fn apply(&mut self, o: PartialConfig) {
        let p = &mut self.processing;
        merge_fields!(
            identity;
            p,
            o.processing,
            enable_ocr,
            ocr_languages,
            enable_tables,
            table_cell_matching,
            generate_page_images,
            generate_picture_images,
            enable_picture_classification,
            image_resolution_scale,
            enable_code_enrichment,
            enable_formula_enrichment,
            num_threads,
            device,
        );

        let out = &mut self.output;
        merge_fields!(
            identity;
            out,
            o.output,
            output_directory,
            save_json,
            save_markdown,
            save_html,
            save_text,
            save_summary,
            image_mode,
            json_indent,
            json_ensure_ascii,
        );

        let f = &mut self.file;
        merge_fields!(identity; f, o.file, supported_extensions, max_file_size_mb, create_backup);

        let l = &mut self.logging;
        merge_fields!(identity; l, o.logging, level, format, save_logs, log_file);
    }
}

impl PartialConfig {
    /// Parse a JSON override document.
    pub fn from_json_str(s: &str) -> Result<PartialConfig, Pdf2StructError> {
        serde_json::from_str(s).map_err(|e| Pdf2StructError::InvalidConfig(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<PartialConfig, Pdf2StructError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Pdf2StructError::InvalidConfig(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&raw).map_err(|e| match e {
            Pdf2StructError::InvalidConfig(msg) => {
                Pdf2StructError::InvalidConfig(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Layer `other` on top of `self`: fields set in `other` win.
    pub fn merged_with(mut self, other: PartialConfig) -> PartialConfig {
        let p = &mut self.processing;
        let q = other.processing;
        merge_fields!(
            Some;
            p,
            q,
            enable_ocr,
            ocr_languages,
            enable_tables,
            table_cell_matching,
            generate_page_images,
            generate_picture_images,
            enable_picture_classification,
            image_resolution_scale,
            enable_code_enrichment,
            enable_formula_enrichment,
            num_threads,
            device
        );
        let o = &mut self.output;
        let q = other.output;
        merge_fields!(
            Some;
            o,
            q,
            output_directory,
            save_json,
            save_markdown,
            save_html,
            save_text,
            save_summary,
            image_mode,
            json_indent,
            json_ensure_ascii
        );
        let f = &mut self.file;
        let q = other.file;
        merge_fields!(Some; f, q, supported_extensions, max_file_size_mb, create_backup);
        let l = &mut self.logging;
        let q = other.logging;
        merge_fields!(Some; l, q, level, format, save_logs, log_file);
        self
    }
}

// ── Command-line profile flags ────────────────────────────────────────────

/// The processing shortcuts exposed on the command line.
///
/// Flags are independent and composable; each only ever switches features
/// off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileFlags {
    /// `--no-ocr`
    pub no_ocr: bool,
    /// `--no-tables`
    pub no_tables: bool,
    /// `--simple`: drop picture classification, code and formula enrichment
    /// and picture-image generation.
    pub simple: bool,
}

impl ProfileFlags {
    /// Express the flags as processing overrides.
    pub fn to_partial(self) -> PartialConfig {
        let mut processing = PartialProcessing::default();
        if self.no_ocr {
            processing.enable_ocr = Some(false);
        }
        if self.no_tables {
            processing.enable_tables = Some(false);
        }
        if self.simple {
            processing.enable_picture_classification = Some(false);
            processing.enable_code_enrichment = Some(false);
            processing.enable_formula_enrichment = Some(false);
            processing.generate_picture_images = Some(false);
        }
        PartialConfig {
            processing,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = Config::default();
        assert!(c.processing.enable_ocr);
        assert_eq!(c.processing.ocr_languages, vec!["en"]);
        assert_eq!(c.processing.num_threads, 4);
        assert_eq!(c.processing.device, "auto");
        assert_eq!(c.processing.image_resolution_scale, 2.0);
        assert!(!c.processing.enable_code_enrichment);
        assert_eq!(c.output.output_directory, PathBuf::from("output"));
        assert_eq!(c.output.image_mode, "placeholder");
        assert_eq!(c.output.json_indent, 2);
        assert!(!c.output.json_ensure_ascii);
        assert_eq!(c.file.supported_extensions, vec![".pdf"]);
        assert_eq!(c.file.max_file_size_mb, 100);
        assert_eq!(c.logging.level, "INFO");
        assert!(c.logging.save_logs);
    }

    #[test]
    fn build_without_overrides_is_default() {
        assert_eq!(Config::build(None), Config::default());
    }

    #[test]
    fn shallow_merge_keeps_untouched_keys() {
        let partial = PartialConfig::from_json_str(
            r#"{"processing": {"num_threads": 8}, "output": {"save_html": false}}"#,
        )
        .unwrap();
        let c = Config::build(Some(partial));
        assert_eq!(c.processing.num_threads, 8);
        assert!(c.processing.enable_ocr);
        assert!(!c.output.save_html);
        assert!(c.output.save_json);
        assert_eq!(c.file, FileConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PartialConfig::from_json_str(r#"{"processing": {"enable_magic": true}}"#)
            .unwrap_err();
        assert!(matches!(err, Pdf2StructError::InvalidConfig(_)));

        let err = PartialConfig::from_json_str(r#"{"network": {}}"#).unwrap_err();
        assert!(matches!(err, Pdf2StructError::InvalidConfig(_)));
    }

    #[test]
    fn log_format_parses_lowercase() {
        let partial =
            PartialConfig::from_json_str(r#"{"logging": {"format": "compact"}}"#).unwrap();
        assert_eq!(Config::build(Some(partial)).logging.format, LogFormat::Compact);
    }

    #[test]
    fn simple_profile_disables_four_features() {
        let c = Config::build(Some(
            ProfileFlags {
                simple: true,
                ..Default::default()
            }
            .to_partial(),
        ));
        assert!(!c.processing.enable_picture_classification);
        assert!(!c.processing.enable_code_enrichment);
        assert!(!c.processing.enable_formula_enrichment);
        assert!(!c.processing.generate_picture_images);
        // untouched by --simple
        assert!(c.processing.enable_ocr);
        assert!(c.processing.enable_tables);
        assert!(c.processing.generate_page_images);
    }

    #[test]
    fn simple_wins_over_file_enabling_enrichment() {
        let file = PartialConfig::from_json_str(
            r#"{"processing": {"enable_code_enrichment": true, "enable_formula_enrichment": true}}"#,
        )
        .unwrap();
        let flags = ProfileFlags {
            no_ocr: true,
            no_tables: true,
            simple: true,
        };
        let c = Config::build(Some(file.merged_with(flags.to_partial())));
        assert!(!c.processing.enable_code_enrichment);
        assert!(!c.processing.enable_formula_enrichment);
        assert!(!c.processing.enable_ocr);
        assert!(!c.processing.enable_tables);
    }

    #[test]
    fn flags_are_independent() {
        let c = Config::build(Some(
            ProfileFlags {
                no_ocr: true,
                ..Default::default()
            }
            .to_partial(),
        ));
        assert!(!c.processing.enable_ocr);
        assert!(c.processing.enable_tables);
        assert!(c.processing.enable_picture_classification);
    }

    #[test]
    fn merged_with_prefers_later_values() {
        let a = PartialConfig::from_json_str(r#"{"output": {"json_indent": 4}}"#).unwrap();
        let b = PartialConfig::from_json_str(r#"{"output": {"json_indent": 0}}"#).unwrap();
        let c = Config::build(Some(a.clone().merged_with(b)));
        assert_eq!(c.output.json_indent, 0);
        let c = Config::build(Some(a.merged_with(PartialConfig::default())));
        assert_eq!(c.output.json_indent, 4);
    }

    #[test]
    fn any_enabled_tracks_flags() {
        let mut o = OutputConfig::default();
        assert!(o.any_enabled());
        o.save_json = false;
        o.save_markdown = false;
        o.save_html = false;
        o.save_text = false;
        o.save_summary = false;
        assert!(!o.any_enabled());
    }
}
