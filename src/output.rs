//! Output artifacts: JSON payload, Markdown, HTML, plain text and report.
//!
//! Each enabled format is written independently. A failure in one format is
//! logged, recorded as a [`FormatError`] in the [`WriteReport`], and does not
//! stop the remaining formats. Only failing to create the output directory
//! aborts the whole write.
//!
//! ```text
//! <output_directory>/
//!   <name>.json          ResultPayload
//!   <name>.md            engine Markdown export
//!   <name>.html          engine HTML export
//!   <name>.txt           strict-text export
//!   <name>_report.txt    fixed-layout report
//! ```

use crate::config::OutputConfig;
use crate::engine::{DocumentHandle, ImageRefMode};
use crate::error::{FormatError, Pdf2StructError};
use crate::report::render_report;
use crate::result::ResultPayload;
use serde::{Deserialize, Serialize};
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use std::fmt;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// One output artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Markdown,
    Html,
    Text,
    Report,
}

impl OutputFormat {
    /// Write order.
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Json,
        OutputFormat::Markdown,
        OutputFormat::Html,
        OutputFormat::Text,
        OutputFormat::Report,
    ];

    /// File-name suffix appended to the input stem.
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputFormat::Json => ".json",
            OutputFormat::Markdown => ".md",
            OutputFormat::Html => ".html",
            OutputFormat::Text => ".txt",
            OutputFormat::Report => "_report.txt",
        }
    }

    pub fn is_enabled(&self, config: &OutputConfig) -> bool {
        match self {
            OutputFormat::Json => config.save_json,
            OutputFormat::Markdown => config.save_markdown,
            OutputFormat::Html => config.save_html,
            OutputFormat::Text => config.save_text,
            OutputFormat::Report => config.save_summary,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            OutputFormat::Json => "JSON",
            OutputFormat::Markdown => "Markdown",
            OutputFormat::Html => "HTML",
            OutputFormat::Text => "Text",
            OutputFormat::Report => "Report",
        })
    }
}

/// What happened to each enabled format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteReport {
    pub written: Vec<(OutputFormat, PathBuf)>,
    pub failed: Vec<FormatError>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn path_of(&self, format: OutputFormat) -> Option<&Path> {
        self.written
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, p)| p.as_path())
    }
}

/// Writes the enabled artifacts for one document into the output directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    config: OutputConfig,
    image_mode: ImageRefMode,
}

impl OutputWriter {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            image_mode: ImageRefMode::lookup(&config.image_mode),
            config: config.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_directory
    }

    pub fn image_mode(&self) -> ImageRefMode {
        self.image_mode
    }

    pub fn path_for(&self, stem: &str, format: OutputFormat) -> PathBuf {
        self.config
            .output_directory
            .join(format!("{stem}{}", format.suffix()))
    }

    /// Create the output directory if absent. Safe to call repeatedly.
    pub fn ensure_dir(&self) -> Result<&Path, Pdf2StructError> {
        let dir = self.output_dir();
        std::fs::create_dir_all(dir).map_err(|source| Pdf2StructError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(dir)
    }

    /// Write every enabled format for `document`, named after `stem`.
    ///
    /// # Errors
    /// Only [`Pdf2StructError::OutputWriteFailed`] when the directory cannot be
    /// created; per-format failures are in the returned report.
    pub fn write<D: DocumentHandle>(
        &self,
        document: &D,
        stem: &str,
        payload: &ResultPayload,
    ) -> Result<WriteReport, Pdf2StructError> {
        self.ensure_dir()?;
        let mut report = WriteReport::default();

        for format in OutputFormat::ALL {
            if !format.is_enabled(&self.config) {
                continue;
            }
            let path = self.path_for(stem, format);
            match self.write_one(format, document, payload, &path) {
                Ok(()) => {
                    info!("Saved {}: {}", format, path.display());
                    report.written.push((format, path));
                }
                Err(e) => {
                    error!("Failed to save {} output {}: {}", format, path.display(), e);
                    report.failed.push(FormatError {
                        format,
                        path,
                        detail: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    fn write_one<D: DocumentHandle>(
        &self,
        format: OutputFormat,
        document: &D,
        payload: &ResultPayload,
        path: &Path,
    ) -> Result<(), Pdf2StructError> {
        match format {
            OutputFormat::Json => {
                write_json(path, payload, self.config.json_indent, self.config.json_ensure_ascii)
            }
            OutputFormat::Markdown => document.save_as_markdown(path, self.image_mode),
            OutputFormat::Html => document.save_as_html(path, self.image_mode),
            OutputFormat::Text => write_text(path, &document.export_to_markdown(true)),
            OutputFormat::Report => write_text(path, &render_report(payload)),
        }
    }
}

fn write_text(path: &Path, contents: &str) -> Result<(), Pdf2StructError> {
    std::fs::write(path, contents).map_err(|source| Pdf2StructError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialise `value` to `path`. `indent == 0` writes compact JSON.
pub fn write_json<T: Serialize>(
    path: &Path,
    value: &T,
    indent: usize,
    ensure_ascii: bool,
) -> Result<(), Pdf2StructError> {
    let bytes = to_json_vec(value, indent, ensure_ascii).map_err(|source| {
        Pdf2StructError::JsonSerialize {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let file = std::fs::File::create(path).map_err(|source| Pdf2StructError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut w = BufWriter::new(file);
    w.write_all(&bytes)
        .and_then(|_| w.flush())
        .map_err(|source| Pdf2StructError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Serialise `value` with the given indent and ASCII policy.
pub fn to_json_vec<T: Serialize>(
    value: &T,
    indent: usize,
    ensure_ascii: bool,
) -> Result<Vec<u8>, serde_json::Error> {
    let spaces = vec![b' '; indent];
    let mut buf = Vec::with_capacity(4096);
    match (indent, ensure_ascii) {
        (0, false) => serialize_with(&mut buf, value, CompactFormatter)?,
        (0, true) => serialize_with(&mut buf, value, AsciiFormatter(CompactFormatter))?,
        (_, false) => serialize_with(&mut buf, value, PrettyFormatter::with_indent(&spaces))?,
        (_, true) => serialize_with(
            &mut buf,
            value,
            AsciiFormatter(PrettyFormatter::with_indent(&spaces)),
        )?,
    }
    Ok(buf)
}

fn serialize_with<T: Serialize, F: Formatter>(
    buf: &mut Vec<u8>,
    value: &T,
    formatter: F,
) -> Result<(), serde_json::Error> {
    let mut ser = serde_json::Serializer::with_formatter(buf, formatter);
    value.serialize(&mut ser)
}

/// Wraps a formatter and escapes every non-ASCII character as `\uXXXX`
/// (UTF-16 surrogate pairs above the BMP).
struct AsciiFormatter<F>(F);

macro_rules! forward {
    ($($name:ident),+ $(,)?) => {
        $(
            #[inline]
            fn $name<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
                self.0.$name(writer)
            }
        )+
    };
}

macro_rules! forward_first {
    ($($name:ident),+ $(,)?) => {
        $(
            #[inline]
            fn $name<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
                self.0.$name(writer, first)
            }
        )+
    };
}

impl<F: Formatter> Formatter for AsciiFormatter<F> {
    forward!(
        begin_array,
        end_array,
        end_array_value,
        begin_object,
        end_object,
        begin_object_value,
        end_object_value,
    );
    forward_first!(begin_array_value, begin_object_key);

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suffixes() {
        let names: Vec<String> = OutputFormat::ALL
            .iter()
            .map(|f| format!("paper{}", f.suffix()))
            .collect();
        assert_eq!(
            names,
            ["paper.json", "paper.md", "paper.html", "paper.txt", "paper_report.txt"]
        );
    }

    #[test]
    fn compact_when_indent_zero() {
        let v = json!({"a": [1, 2], "b": "x"});
        let s = String::from_utf8(to_json_vec(&v, 0, false).unwrap()).unwrap();
        assert_eq!(s, r#"{"a":[1,2],"b":"x"}"#);
    }

    #[test]
    fn indent_width_is_respected() {
        let v = json!({"a": 1});
        let s = String::from_utf8(to_json_vec(&v, 4, false).unwrap()).unwrap();
        assert_eq!(s, "{\n    \"a\": 1\n}");
    }

    #[test]
    fn ascii_escaping() {
        let v = json!({"name": "café 🙂"});
        let s = String::from_utf8(to_json_vec(&v, 0, true).unwrap()).unwrap();
        assert_eq!(s, r#"{"name":"caf\u00e9 \ud83d\ude42"}"#);
        assert!(s.is_ascii());

        let back: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn ascii_pretty_keeps_layout() {
        let v = json!({"k": ["ü"]});
        let s = String::from_utf8(to_json_vec(&v, 2, true).unwrap()).unwrap();
        assert_eq!(s, "{\n  \"k\": [\n    \"\\u00fc\"\n  ]\n}");
    }

    #[test]
    fn non_ascii_kept_by_default() {
        let v = json!("naïve");
        let s = String::from_utf8(to_json_vec(&v, 2, false).unwrap()).unwrap();
        assert_eq!(s, "\"naïve\"");
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let config = OutputConfig {
            output_directory: tmp.path().join("nested").join("out"),
            ..Default::default()
        };
        let w = OutputWriter::new(&config);
        w.ensure_dir().unwrap();
        w.ensure_dir().unwrap();
        assert!(config.output_directory.is_dir());
    }

    #[test]
    fn ensure_dir_fails_on_file_in_the_way() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("out");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let w = OutputWriter::new(&OutputConfig {
            output_directory: blocker,
            ..Default::default()
        });
        assert!(matches!(
            w.ensure_dir(),
            Err(Pdf2StructError::OutputWriteFailed { .. })
        ));
    }

    #[test]
    fn unknown_image_mode_falls_back() {
        let w = OutputWriter::new(&OutputConfig {
            image_mode: "inline".into(),
            ..Default::default()
        });
        assert_eq!(w.image_mode(), ImageRefMode::Placeholder);
    }
}
