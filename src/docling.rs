//! [`ConversionEngine`] backed by the `docling` command-line tool.
//!
//! One `docling` run per input renders every export this crate needs
//! (`--to json --to md --to html --to text`) into a scratch directory. The
//! JSON export is the DoclingDocument object graph; the page, table, picture
//! and text views below read it directly.
//!
//! ```text
//! docling --from pdf --to json --to md --to html --to text \
//!         [--ocr|--no-ocr] [--ocr-lang en,fr] [--tables|--no-tables] \
//!         [--enrich-*] [--num-threads N --device D] \
//!         --image-export-mode M --output <tmp> <input.pdf>
//! ```
//!
//! Options that only exist in newer docling releases are passed only when
//! [`docling_auto::DoclingCapabilities`] says the installed release accepts
//! them. Table cell matching and the page-image scale have no command-line
//! equivalent and are left to docling's defaults.

use crate::engine::{
    ConversionEngine, ConversionResult, ConversionStatus, DocumentHandle, EngineCapabilities,
    ImageRefMode, InputFormat, PictureHandle, TableHandle, TableShape,
};
use crate::error::Pdf2StructError;
use crate::pipeline::PipelineOptions;
use crate::validate::file_stem;
use docling_auto::{DoclingAutoError, DoclingCapabilities, DoclingInstall, INSTALL_HINT};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info, warn};

const ENGINE_NAME: &str = "docling";

/// Page and picture images are rendered at this scale by docling's command
/// line whenever the image export mode is not `placeholder`.
const CLI_IMAGES_SCALE: f32 = 2.0;

static STATUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(PARTIAL_SUCCESS|SUCCESS|FAILURE|SKIPPED|PENDING|STARTED)\b").unwrap()
});

static PARTIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpartially converted\b").unwrap());

/// Map a locator failure onto the fatal "engine unavailable" error.
pub fn dependency_error(e: DoclingAutoError) -> Pdf2StructError {
    Pdf2StructError::DependencyUnavailable {
        engine: ENGINE_NAME.to_string(),
        detail: e.to_string(),
        hint: INSTALL_HINT.to_string(),
    }
}

/// Runs an installed `docling` executable.
#[derive(Debug, Clone)]
pub struct DoclingEngine {
    bin: PathBuf,
    version: Option<String>,
    caps: DoclingCapabilities,
    image_mode: ImageRefMode,
}

impl DoclingEngine {
    /// Locate and probe docling (see [`docling_auto::probe_docling`]).
    pub fn detect() -> Result<Self, Pdf2StructError> {
        let install = docling_auto::probe_docling().map_err(dependency_error)?;
        info!(
            "Using docling {} at {}",
            install.version_or_unknown(),
            install.path.display()
        );
        Ok(Self::from_install(install))
    }

    pub fn from_install(install: DoclingInstall) -> Self {
        Self {
            bin: install.path,
            version: install.version,
            caps: install.capabilities,
            image_mode: ImageRefMode::Placeholder,
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn executable(&self) -> &Path {
        &self.bin
    }

    /// Command-line arguments for converting `source` into `out_dir`.
    pub fn conversion_args(
        &self,
        source: &Path,
        options: &PipelineOptions,
        out_dir: &Path,
    ) -> Vec<OsString> {
        let caps = &self.caps;
        let mut args: Vec<OsString> = Vec::with_capacity(32);
        let mut push = |s: &str| args.push(OsString::from(s));

        push("--from");
        push(InputFormat::Pdf.as_str());
        for to in ["json", "md", "html", "text"] {
            push("--to");
            push(to);
        }
        if caps.image_export_mode {
            push("--image-export-mode");
            push(self.image_mode.as_str());
        }

        push(if options.do_ocr { "--ocr" } else { "--no-ocr" });
        if let Some(langs) = &options.ocr_languages {
            if caps.ocr_lang && !langs.is_empty() {
                push("--ocr-lang");
                push(&langs.join(","));
            }
        }
        push(if options.do_table_structure {
            "--tables"
        } else {
            "--no-tables"
        });

        if caps.enrich_code {
            push(toggle("enrich-code", options.do_code_enrichment).as_str());
        }
        if caps.enrich_formula {
            push(toggle("enrich-formula", options.do_formula_enrichment).as_str());
        }
        if caps.enrich_picture_classes {
            push(toggle("enrich-picture-classes", options.do_picture_classification).as_str());
        }

        if let Some(acc) = &options.accelerator {
            push("--num-threads");
            push(&acc.num_threads.to_string());
            push("--device");
            push(acc.device.as_str());
        }

        args.push(OsString::from("--output"));
        args.push(out_dir.as_os_str().to_owned());
        args.push(source.as_os_str().to_owned());
        args
    }
}

impl DoclingEngine {
    /// Requested options the `docling` command line cannot pass on, in
    /// `key=value` form.
    ///
    /// docling's CLI always matches table cells, and generates page and
    /// picture images at scale 2.0 exactly when the image export mode is not
    /// `placeholder`. Only differences that change the exports are listed: in
    /// `placeholder` mode no image data is exported, so image generation
    /// settings cannot make a difference there.
    pub fn unexpressed_options(&self, options: &PipelineOptions) -> Vec<String> {
        let mut gaps = Vec::new();
        if let Some(ts) = &options.table_structure {
            if !ts.do_cell_matching {
                gaps.push("table_cell_matching=false".to_string());
            }
        }
        let cli_images =
            self.caps.image_export_mode && self.image_mode != ImageRefMode::Placeholder;
        if cli_images {
            if !options.generate_page_images {
                gaps.push("generate_page_images=false".to_string());
            }
            if !options.generate_picture_images {
                gaps.push("generate_picture_images=false".to_string());
            }
            if let Some(scale) = options.images_scale {
                if (scale - CLI_IMAGES_SCALE).abs() > f32::EPSILON {
                    gaps.push(format!("image_resolution_scale={scale}"));
                }
            }
        }
        gaps
    }
}

fn toggle(name: &str, on: bool) -> String {
    if on {
        format!("--{name}")
    } else {
        format!("--no-{name}")
    }
}

impl ConversionEngine for DoclingEngine {
    type Document = DoclingDocument;

    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            accelerator: self.caps.accelerator(),
        }
    }

    /// Markdown/HTML are rendered in `mode` during conversion; exports later
    /// requested in the same mode are copied instead of re-rendered.
    fn with_image_mode(mut self, mode: ImageRefMode) -> Self {
        self.image_mode = mode;
        self
    }

    fn convert(
        &self,
        source: &Path,
        format: InputFormat,
        options: &PipelineOptions,
    ) -> Result<ConversionResult<DoclingDocument>, Pdf2StructError> {
        debug_assert_eq!(format, InputFormat::Pdf);
        if options.do_ocr && options.ocr_languages.is_some() && !self.caps.ocr_lang {
            warn!("docling has no --ocr-lang option; using its default OCR languages");
        }
        if !self.caps.enrich_picture_classes && options.do_picture_classification {
            warn!("docling has no --enrich-picture-classes option; pictures stay unclassified");
        }
        let gaps = self.unexpressed_options(options);
        if !gaps.is_empty() {
            warn!(
                "docling's command line cannot apply {}; docling's own behaviour is used",
                gaps.join(", ")
            );
        }

        let workdir = tempfile::Builder::new()
            .prefix("pdf2struct-")
            .tempdir()
            .map_err(|e| Pdf2StructError::Engine(format!("cannot create scratch dir: {e}")))?;
        let args = self.conversion_args(source, options, workdir.path());
        debug!("Running {} {:?}", self.bin.display(), args);

        let output = Command::new(&self.bin)
            .args(&args)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    dependency_error(DoclingAutoError::Spawn {
                        path: self.bin.clone(),
                        source: e,
                    })
                } else {
                    Pdf2StructError::Engine(format!("failed to run {}: {e}", self.bin.display()))
                }
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stem = file_stem(source);
        let json_path = workdir.path().join(format!("{stem}.json"));
        let status = classify_run(output.status.success(), json_path.is_file(), &stderr);
        debug!("docling exited with {} → {}", output.status, status);

        if !status.is_success() {
            if !stderr.trim().is_empty() {
                warn!("docling stderr: {}", last_lines(&stderr, 5));
            }
            return Ok(ConversionResult {
                status,
                document: None,
            });
        }

        let document = DoclingDocument::load(workdir, &stem, self.render_context())?;
        Ok(ConversionResult {
            status,
            document: Some(document),
        })
    }
}

impl DoclingEngine {
    fn render_context(&self) -> RenderContext {
        RenderContext {
            bin: self.bin.clone(),
            json_input: self.caps.json_input,
            image_export_mode: self.caps.image_export_mode,
            rendered_mode: self.image_mode,
        }
    }
}

/// Status of one docling run.
///
/// A clean exit that produced the JSON export is SUCCESS unless docling said
/// the document was only partially converted. Otherwise the status printed on
/// stderr is used, and FAILURE when none was printed.
pub fn classify_run(exit_ok: bool, json_written: bool, stderr: &str) -> ConversionStatus {
    if PARTIAL_RE.is_match(stderr) {
        return ConversionStatus::PartialSuccess;
    }
    if exit_ok && json_written {
        return ConversionStatus::Success;
    }
    STATUS_RE
        .captures_iter(stderr)
        .filter_map(|c| c[1].parse::<ConversionStatus>().ok())
        .find(|s| !s.is_success())
        .unwrap_or(ConversionStatus::Failure)
}

fn last_lines(s: &str, n: usize) -> String {
    let lines: Vec<&str> = s.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join(" | ")
}

// ── Document ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RenderContext {
    bin: PathBuf,
    json_input: bool,
    image_export_mode: bool,
    rendered_mode: ImageRefMode,
}

/// A converted document: the parsed JSON graph plus the text renderings
/// docling wrote next to it.
#[derive(Debug)]
pub struct DoclingDocument {
    /// Holds the renderings; `None` for documents built from JSON alone.
    workdir: Option<TempDir>,
    stem: String,
    raw: Value,
    num_pages: usize,
    tables: Vec<DoclingTable>,
    pictures: Vec<DoclingPicture>,
    texts: Vec<String>,
    markdown: String,
    strict_text: String,
    render: RenderContext,
}

impl DoclingDocument {
    fn load(workdir: TempDir, stem: &str, render: RenderContext) -> Result<Self, Pdf2StructError> {
        let dir = workdir.path();
        let json = read_export(&dir.join(format!("{stem}.json")))?;
        let raw: Value = serde_json::from_str(&json)
            .map_err(|e| Pdf2StructError::Engine(format!("unreadable docling JSON: {e}")))?;
        let mut doc = Self::from_value(raw, render)?;
        doc.markdown = read_export(&dir.join(format!("{stem}.md"))).unwrap_or_default();
        doc.strict_text = match read_export(&dir.join(format!("{stem}.txt"))) {
            Ok(t) => t,
            Err(e) => {
                warn!("No text export from docling ({}); deriving it from Markdown", e);
                strip_markup(&doc.markdown)
            }
        };
        doc.stem = stem.to_string();
        doc.workdir = Some(workdir);
        Ok(doc)
    }

    /// Build a document from an already-parsed DoclingDocument JSON value.
    /// Markdown and text renderings start empty.
    pub fn from_json(raw: Value) -> Result<Self, Pdf2StructError> {
        Self::from_value(
            raw,
            RenderContext {
                bin: PathBuf::from(ENGINE_NAME),
                json_input: false,
                image_export_mode: false,
                rendered_mode: ImageRefMode::Placeholder,
            },
        )
    }

    fn from_value(raw: Value, render: RenderContext) -> Result<Self, Pdf2StructError> {
        let view: DocView = serde_json::from_value(raw.clone())
            .map_err(|e| Pdf2StructError::Engine(format!("unexpected docling JSON: {e}")))?;
        Ok(Self {
            workdir: None,
            stem: String::new(),
            num_pages: view.pages.len(),
            tables: view.tables.into_iter().map(DoclingTable).collect(),
            pictures: view.pictures.into_iter().map(DoclingPicture).collect(),
            texts: view.texts.into_iter().filter_map(text_of).collect(),
            raw,
            markdown: String::new(),
            strict_text: String::new(),
            render,
        })
    }

    fn rendered(&self, ext: &str) -> Option<PathBuf> {
        self.workdir
            .as_ref()
            .map(|w| w.path().join(format!("{}.{ext}", self.stem)))
            .filter(|p| p.is_file())
    }

    /// Copy a rendering made during conversion, or ask docling to re-render
    /// the saved JSON in another image mode.
    fn save_rendering(
        &self,
        ext: &str,
        to: &str,
        path: &Path,
        mode: ImageRefMode,
    ) -> Result<(), Pdf2StructError> {
        if mode == self.render.rendered_mode {
            if let (Some(stored), Some(workdir)) = (self.rendered(ext), &self.workdir) {
                copy_to(&stored, path)?;
                if mode == ImageRefMode::Referenced {
                    self.copy_artifacts(workdir.path(), path)?;
                }
                return Ok(());
            }
        }

        let json = match self.rendered("json") {
            Some(json) if self.render.json_input && self.render.image_export_mode => json,
            _ => {
                return Err(Pdf2StructError::Engine(format!(
                    "cannot export {to} in {} image mode with this docling release",
                    mode.as_str()
                )))
            }
        };

        let scratch = TempDir::new()
            .map_err(|e| Pdf2StructError::Engine(format!("cannot create scratch dir: {e}")))?;
        let output = Command::new(&self.render.bin)
            .args(["--from", "json_docling", "--to", to, "--image-export-mode", mode.as_str()])
            .arg("--output")
            .arg(scratch.path())
            .arg(&json)
            .output()
            .map_err(|e| Pdf2StructError::Engine(format!("failed to run docling: {e}")))?;
        let produced = scratch.path().join(format!("{}.{ext}", self.stem));
        if !output.status.success() || !produced.is_file() {
            return Err(Pdf2StructError::Engine(format!(
                "docling re-export to {to} failed: {}",
                last_lines(&String::from_utf8_lossy(&output.stderr), 3)
            )));
        }
        copy_to(&produced, path)?;
        if mode == ImageRefMode::Referenced {
            self.copy_artifacts(scratch.path(), path)?;
        }
        Ok(())
    }

    /// Referenced images live in `<stem>_artifacts/` next to the export.
    fn copy_artifacts(&self, from_dir: &Path, export: &Path) -> Result<(), Pdf2StructError> {
        let name = format!("{}_artifacts", self.stem);
        let src = from_dir.join(&name);
        if !src.is_dir() {
            return Ok(());
        }
        let dest = export.parent().unwrap_or_else(|| Path::new(".")).join(&name);
        std::fs::create_dir_all(&dest).map_err(|source| Pdf2StructError::OutputWriteFailed {
            path: dest.clone(),
            source,
        })?;
        let entries = std::fs::read_dir(&src).map_err(|source| {
            Pdf2StructError::OutputWriteFailed {
                path: src.clone(),
                source,
            }
        })?;
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_file() {
                if let Some(file_name) = p.file_name() {
                    copy_to(&p, &dest.join(file_name))?;
                }
            }
        }
        Ok(())
    }
}

impl DocumentHandle for DoclingDocument {
    type Table = DoclingTable;
    type Picture = DoclingPicture;

    fn num_pages(&self) -> usize {
        self.num_pages
    }

    fn tables(&self) -> &[DoclingTable] {
        &self.tables
    }

    fn pictures(&self) -> &[DoclingPicture] {
        &self.pictures
    }

    fn text_items(&self) -> Vec<String> {
        self.texts.clone()
    }

    fn export_to_dict(&self) -> Value {
        self.raw.clone()
    }

    fn export_to_markdown(&self, strict_text: bool) -> String {
        if strict_text {
            self.strict_text.clone()
        } else {
            self.markdown.clone()
        }
    }

    fn save_as_markdown(
        &self,
        path: &Path,
        image_mode: ImageRefMode,
    ) -> Result<(), Pdf2StructError> {
        self.save_rendering("md", "md", path, image_mode)
    }

    fn save_as_html(&self, path: &Path, image_mode: ImageRefMode) -> Result<(), Pdf2StructError> {
        self.save_rendering("html", "html", path, image_mode)
    }
}

fn read_export(path: &Path) -> Result<String, Pdf2StructError> {
    std::fs::read_to_string(path)
        .map_err(|e| Pdf2StructError::Engine(format!("cannot read {}: {e}", path.display())))
}

fn copy_to(from: &Path, to: &Path) -> Result<(), Pdf2StructError> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|source| Pdf2StructError::OutputWriteFailed {
            path: to.to_path_buf(),
            source,
        })
}

static MD_MARKUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)^\s*(#{1,6}\s+|[-*+]\s+|\|[-:| ]+\|\s*$)",
        r"|<!--.*?-->",
        r"|!\[[^\]]*\]\([^)]*\)",
    ))
    .unwrap()
});

/// Rough strict-text fallback for docling releases without `--to text`.
fn strip_markup(markdown: &str) -> String {
    MD_MARKUP_RE.replace_all(markdown, "").into_owned()
}

// ── JSON views ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DocView {
    pages: serde_json::Map<String, Value>,
    tables: Vec<Value>,
    pictures: Vec<Value>,
    texts: Vec<Value>,
}

fn text_of(item: Value) -> Option<String> {
    item.get("text")
        .or_else(|| item.get("orig"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TableData {
    #[serde(default)]
    num_rows: usize,
    #[serde(default)]
    num_cols: usize,
    #[serde(default)]
    table_cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TableCell {
    start_row_offset_idx: usize,
    end_row_offset_idx: usize,
    start_col_offset_idx: usize,
    end_col_offset_idx: usize,
    #[serde(default)]
    column_header: bool,
}

/// One table from the DoclingDocument graph.
#[derive(Debug, Clone)]
pub struct DoclingTable(Value);

impl TableHandle for DoclingTable {
    /// Rows exclude the leading run of column-header rows, the way a data
    /// frame export promotes them to column labels.
    fn export_to_grid(&self) -> Result<TableShape, Pdf2StructError> {
        let data = self
            .0
            .get("data")
            .filter(|d| !d.is_null())
            .ok_or_else(|| Pdf2StructError::TableExport("table has no cell data".into()))?;
        let data = TableData::deserialize(data)
            .map_err(|e| Pdf2StructError::TableExport(format!("malformed table data: {e}")))?;
        if data.num_rows == 0 || data.num_cols == 0 {
            return Ok(TableShape {
                rows: 0,
                columns: 0,
            });
        }

        let mut header_rows = vec![false; data.num_rows];
        for cell in &data.table_cells {
            if cell.start_row_offset_idx > cell.end_row_offset_idx
                || cell.end_row_offset_idx > data.num_rows
                || cell.start_col_offset_idx > cell.end_col_offset_idx
                || cell.end_col_offset_idx > data.num_cols
            {
                return Err(Pdf2StructError::TableExport(format!(
                    "cell span rows {}..{} cols {}..{} outside {}x{} grid",
                    cell.start_row_offset_idx,
                    cell.end_row_offset_idx,
                    cell.start_col_offset_idx,
                    cell.end_col_offset_idx,
                    data.num_rows,
                    data.num_cols
                )));
            }
            if cell.column_header {
                for flag in &mut header_rows[cell.start_row_offset_idx..cell.end_row_offset_idx] {
                    *flag = true;
                }
            }
        }

        let leading_headers = header_rows.iter().take_while(|h| **h).count();
        Ok(TableShape {
            rows: data.num_rows - leading_headers,
            columns: data.num_cols,
        })
    }
}

/// One picture from the DoclingDocument graph.
#[derive(Debug, Clone)]
pub struct DoclingPicture(Value);

impl PictureHandle for DoclingPicture {
    fn has_classification(&self) -> bool {
        let p = &self.0;
        if p.get("classification").is_some() {
            return true;
        }
        if p.pointer("/meta/classification").is_some() {
            return true;
        }
        p.get("annotations")
            .and_then(Value::as_array)
            .map(|anns| {
                anns.iter()
                    .any(|a| a.get("kind").and_then(Value::as_str) == Some("classification"))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use serde_json::json;

    fn engine(caps: DoclingCapabilities) -> DoclingEngine {
        DoclingEngine::from_install(DoclingInstall {
            path: PathBuf::from("/usr/bin/docling"),
            version: Some("2.31.0".into()),
            capabilities: caps,
        })
    }

    fn all_caps() -> DoclingCapabilities {
        DoclingCapabilities {
            device: true,
            num_threads: true,
            ocr_lang: true,
            enrich_code: true,
            enrich_formula: true,
            enrich_picture_classes: true,
            image_export_mode: true,
            json_input: true,
        }
    }

    fn args_of(e: &DoclingEngine, cfg: &ProcessingConfig) -> Vec<String> {
        let opts = PipelineOptions::from_config(cfg, e.capabilities().accelerator);
        e.conversion_args(Path::new("in/paper.pdf"), &opts, Path::new("/tmp/out"))
            .into_iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn default_args_with_modern_docling() {
        let a = args_of(&engine(all_caps()), &ProcessingConfig::default());
        let joined = a.join(" ");
        assert!(joined.starts_with("--from pdf --to json --to md --to html --to text"));
        assert!(joined.contains("--image-export-mode placeholder"));
        assert!(joined.contains("--ocr --ocr-lang en"));
        assert!(joined.contains("--tables"));
        assert!(joined.contains("--no-enrich-code"));
        assert!(joined.contains("--no-enrich-formula"));
        assert!(joined.contains("--enrich-picture-classes"));
        assert!(joined.contains("--num-threads 4 --device auto"));
        assert_eq!(&a[a.len() - 3..], ["--output", "/tmp/out", "in/paper.pdf"]);
    }

    fn unexpressed(e: &DoclingEngine, cfg: &ProcessingConfig) -> Vec<String> {
        let opts = PipelineOptions::from_config(cfg, e.capabilities().accelerator);
        e.unexpressed_options(&opts)
    }

    fn image_settings_off() -> ProcessingConfig {
        ProcessingConfig {
            generate_picture_images: false,
            generate_page_images: false,
            table_cell_matching: false,
            image_resolution_scale: 5.0,
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_fully_expressed() {
        let e = engine(all_caps());
        assert!(unexpressed(&e, &ProcessingConfig::default()).is_empty());
        let e = e.with_image_mode(ImageRefMode::Referenced);
        assert!(unexpressed(&e, &ProcessingConfig::default()).is_empty());
    }

    #[test]
    fn image_settings_without_cli_flags_are_reported() {
        let e = engine(all_caps()).with_image_mode(ImageRefMode::Referenced);
        // Same invocation either way; the difference is surfaced instead.
        assert_eq!(
            args_of(&e, &ProcessingConfig::default()),
            args_of(&e, &image_settings_off())
        );
        let gaps = unexpressed(&e, &image_settings_off());
        assert_eq!(
            gaps,
            vec![
                "table_cell_matching=false",
                "generate_page_images=false",
                "generate_picture_images=false",
            ]
        );

        let cfg = ProcessingConfig {
            image_resolution_scale: 5.0,
            ..Default::default()
        };
        assert_eq!(unexpressed(&e, &cfg), vec!["image_resolution_scale=5"]);
    }

    #[test]
    fn placeholder_mode_only_reports_cell_matching() {
        let e = engine(all_caps());
        assert_eq!(
            unexpressed(&e, &image_settings_off()),
            vec!["table_cell_matching=false"]
        );
        let simple = ProcessingConfig {
            generate_picture_images: false,
            ..Default::default()
        };
        assert!(unexpressed(&e, &simple).is_empty());
        let no_tables = ProcessingConfig {
            enable_tables: false,
            table_cell_matching: false,
            ..Default::default()
        };
        assert!(unexpressed(&e, &no_tables).is_empty());
    }

    #[test]
    fn disabled_features_use_negative_flags() {
        let cfg = ProcessingConfig {
            enable_ocr: false,
            enable_tables: false,
            ..Default::default()
        };
        let a = args_of(&engine(all_caps()), &cfg);
        assert!(a.contains(&"--no-ocr".to_string()));
        assert!(a.contains(&"--no-tables".to_string()));
        assert!(!a.contains(&"--ocr-lang".to_string()));
    }

    #[test]
    fn old_docling_gets_no_optional_flags() {
        let a = args_of(&engine(DoclingCapabilities::default()), &ProcessingConfig::default());
        for flag in ["--num-threads", "--device", "--ocr-lang", "--image-export-mode"] {
            assert!(!a.contains(&flag.to_string()), "unexpected {flag}");
        }
        assert!(!a.iter().any(|s| s.contains("enrich")));
    }

    #[test]
    fn classify_clean_run() {
        assert_eq!(classify_run(true, true, ""), ConversionStatus::Success);
        assert_eq!(classify_run(true, false, ""), ConversionStatus::Failure);
        assert_eq!(
            classify_run(false, false, "ERROR: Document paper.pdf failed to convert."),
            ConversionStatus::Failure
        );
    }

    #[test]
    fn classify_partial_and_reported_statuses() {
        assert_eq!(
            classify_run(
                true,
                true,
                "WARNING Document paper.pdf was partially converted with the following errors:"
            ),
            ConversionStatus::PartialSuccess
        );
        assert_eq!(
            classify_run(false, false, "conversion status: ConversionStatus.SKIPPED"),
            ConversionStatus::Skipped
        );
    }

    fn sample_doc() -> Value {
        json!({
            "schema_name": "DoclingDocument",
            "pages": {"1": {"page_no": 1}, "2": {"page_no": 2}},
            "texts": [
                {"label": "caption", "text": "Figure 1: Pipeline"},
                {"label": "text", "text": "Body text"},
                {"label": "text", "orig": "See Figure 2"}
            ],
            "tables": [
                {"data": {"num_rows": 3, "num_cols": 2, "table_cells": [
                    {"start_row_offset_idx": 0, "end_row_offset_idx": 1,
                     "start_col_offset_idx": 0, "end_col_offset_idx": 2,
                     "column_header": true},
                    {"start_row_offset_idx": 1, "end_row_offset_idx": 2,
                     "start_col_offset_idx": 0, "end_col_offset_idx": 1}
                ]}},
                {"data": {"num_rows": 2, "num_cols": 2, "table_cells": [
                    {"start_row_offset_idx": 0, "end_row_offset_idx": 5,
                     "start_col_offset_idx": 0, "end_col_offset_idx": 1}
                ]}},
                {"label": "table"}
            ],
            "pictures": [
                {"annotations": [{"kind": "classification", "predicted_classes": []}]},
                {"annotations": []},
                {"meta": {"classification": {"predictions": []}}}
            ]
        })
    }

    #[test]
    fn document_views_from_json() {
        let doc = DoclingDocument::from_json(sample_doc()).unwrap();
        assert_eq!(doc.num_pages(), 2);
        assert_eq!(doc.tables().len(), 3);
        assert_eq!(doc.pictures().len(), 3);
        assert_eq!(
            doc.text_items(),
            vec!["Figure 1: Pipeline", "Body text", "See Figure 2"]
        );
        assert_eq!(doc.export_to_dict()["schema_name"], "DoclingDocument");
    }

    #[test]
    fn table_grid_excludes_header_rows() {
        let doc = DoclingDocument::from_json(sample_doc()).unwrap();
        let shape = doc.tables()[0].export_to_grid().unwrap();
        assert_eq!(shape, TableShape { rows: 2, columns: 2 });
    }

    #[test]
    fn bad_tables_fail_export() {
        let doc = DoclingDocument::from_json(sample_doc()).unwrap();
        assert!(doc.tables()[1].export_to_grid().is_err());
        assert!(doc.tables()[2].export_to_grid().is_err());
    }

    #[test]
    fn picture_classification_presence() {
        let doc = DoclingDocument::from_json(sample_doc()).unwrap();
        let flags: Vec<bool> = doc.pictures().iter().map(|p| p.has_classification()).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn empty_graph_is_valid() {
        let doc = DoclingDocument::from_json(json!({})).unwrap();
        assert_eq!(doc.num_pages(), 0);
        assert!(doc.tables().is_empty());
    }

    #[test]
    fn save_without_reexport_support_errors() {
        let doc = DoclingDocument::from_json(sample_doc()).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let err = doc
            .save_as_html(&tmp.path().join("x.html"), ImageRefMode::Embedded)
            .unwrap_err();
        assert!(matches!(err, Pdf2StructError::Engine(_)));
    }

    const MD: &str = "# Pipeline\n\n![fig](paper_artifacts/image_000.png)\n";
    const HTML: &str = "<html><body><h1>Pipeline</h1></body></html>";
    const TXT: &str = "Pipeline\n\nBody text";

    /// A scratch directory laid out the way a `docling --output` run leaves it.
    fn converted_dir(with_text: bool) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        std::fs::write(p.join("paper.json"), sample_doc().to_string()).unwrap();
        std::fs::write(p.join("paper.md"), MD).unwrap();
        std::fs::write(p.join("paper.html"), HTML).unwrap();
        if with_text {
            std::fs::write(p.join("paper.txt"), TXT).unwrap();
        }
        std::fs::create_dir_all(p.join("paper_artifacts")).unwrap();
        std::fs::write(p.join("paper_artifacts/image_000.png"), b"\x89PNG").unwrap();
        dir
    }

    fn rendered_in(mode: ImageRefMode) -> RenderContext {
        RenderContext {
            bin: PathBuf::from("/nonexistent/docling"),
            json_input: false,
            image_export_mode: true,
            rendered_mode: mode,
        }
    }

    #[test]
    fn load_reads_every_rendering() {
        let doc = DoclingDocument::load(
            converted_dir(true),
            "paper",
            rendered_in(ImageRefMode::Placeholder),
        )
        .unwrap();
        assert_eq!(doc.num_pages(), 2);
        assert_eq!(doc.tables().len(), 3);
        assert_eq!(doc.export_to_markdown(false), MD);
        assert_eq!(doc.export_to_markdown(true), TXT);
    }

    #[test]
    fn load_derives_text_when_export_missing() {
        let doc = DoclingDocument::load(
            converted_dir(false),
            "paper",
            rendered_in(ImageRefMode::Placeholder),
        )
        .unwrap();
        let text = doc.export_to_markdown(true);
        assert!(text.contains("Pipeline"));
        assert!(!text.contains('#'));
        assert!(!text.contains("image_000.png"));
    }

    #[test]
    fn load_without_json_is_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DoclingDocument::load(dir, "paper", rendered_in(ImageRefMode::Placeholder))
            .unwrap_err();
        assert!(matches!(err, Pdf2StructError::Engine(_)));
    }

    #[test]
    fn same_mode_copies_rendering() {
        let doc = DoclingDocument::load(
            converted_dir(true),
            "paper",
            rendered_in(ImageRefMode::Placeholder),
        )
        .unwrap();
        let out = tempfile::tempdir().unwrap();
        let md = out.path().join("paper.md");
        let html = out.path().join("paper.html");
        doc.save_as_markdown(&md, ImageRefMode::Placeholder).unwrap();
        doc.save_as_html(&html, ImageRefMode::Placeholder).unwrap();

        assert_eq!(std::fs::read_to_string(&md).unwrap(), MD);
        assert_eq!(std::fs::read_to_string(&html).unwrap(), HTML);
        assert!(!out.path().join("paper_artifacts").exists());
    }

    #[test]
    fn referenced_mode_copies_artifacts_next_to_export() {
        let doc = DoclingDocument::load(
            converted_dir(true),
            "paper",
            rendered_in(ImageRefMode::Referenced),
        )
        .unwrap();
        let out = tempfile::tempdir().unwrap();
        let md = out.path().join("paper.md");
        doc.save_as_markdown(&md, ImageRefMode::Referenced).unwrap();

        assert_eq!(std::fs::read_to_string(&md).unwrap(), MD);
        let image = out.path().join("paper_artifacts").join("image_000.png");
        assert_eq!(std::fs::read(image).unwrap(), b"\x89PNG");

        // Idempotent: a second export into the same directory succeeds.
        doc.save_as_html(&out.path().join("paper.html"), ImageRefMode::Referenced)
            .unwrap();
    }

    #[test]
    fn other_mode_needs_json_input_support() {
        let doc = DoclingDocument::load(
            converted_dir(true),
            "paper",
            rendered_in(ImageRefMode::Placeholder),
        )
        .unwrap();
        let out = tempfile::tempdir().unwrap();
        let err = doc
            .save_as_markdown(&out.path().join("paper.md"), ImageRefMode::Embedded)
            .unwrap_err();
        assert!(err.to_string().contains("embedded"));
        assert!(!out.path().join("paper.md").exists());
    }

    #[test]
    fn strip_markup_drops_headings_and_images() {
        let md = "# Title\n\n<!-- image -->\n- item\n![a](b.png) text";
        let t = strip_markup(md);
        assert!(t.contains("Title"));
        assert!(t.contains("item"));
        assert!(!t.contains('#'));
        assert!(!t.contains("<!--"));
        assert!(!t.contains("b.png"));
    }
}
