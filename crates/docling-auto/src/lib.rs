//! # docling-auto
//!
//! Locate and probe the [docling](https://github.com/docling-project/docling)
//! command-line engine, so that Rust wrappers around docling no longer need
//! users to hand-configure the path to the `docling` executable.
//!
//! ## How it works
//!
//! On first call to [`locate_docling`] or [`probe_docling`]:
//!
//! 1. Checks `DOCLING_BIN` for an explicit executable path.
//! 2. Otherwise scans every directory on `PATH` for `docling` (`docling.exe`
//!    on Windows).
//! 3. Falls back to user-local install directories (`~/.local/bin`), where
//!    `pip install --user` and `pipx` place console scripts.
//! 4. [`probe_docling`] additionally runs `docling --version` and
//!    `docling --help` and records which command-line options the installed
//!    release understands.
//!
//! Subsequent calls skip the filesystem scan and the subprocess probes; the
//! result is cached for the lifetime of the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docling_auto::{locate_docling, probe_docling};
//!
//! // Option A: just the executable
//! let bin = locate_docling().expect("docling unavailable");
//!
//! // Option B: executable + version + capability flags
//! let install = probe_docling().expect("docling unavailable");
//! if !install.capabilities.device {
//!     eprintln!("docling {} has no --device option", install.version_or_unknown());
//! }
//! # let _ = bin;
//! ```
//!
//! ## Environment variable overrides
//!
//! - `DOCLING_BIN`: path to an existing docling executable; skips the scan.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable naming an explicit docling executable.
pub const DOCLING_BIN_ENV: &str = "DOCLING_BIN";

/// Remediation hint shown when docling cannot be found.
pub const INSTALL_HINT: &str = "Install it with: pip install docling\n\
Or point DOCLING_BIN=/path/to/docling at an existing installation.";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by docling-auto operations.
#[derive(Error, Debug)]
pub enum DoclingAutoError {
    /// No docling executable on `PATH` or in the user-local bin directories.
    #[error("docling executable not found on PATH.\n{hint}")]
    NotFound { hint: &'static str },

    /// `DOCLING_BIN` is set but does not point at a file.
    #[error("DOCLING_BIN '{path}' does not exist")]
    BadOverride { path: PathBuf },

    /// The executable exists but could not be run.
    #[error("Failed to run '{path}': {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The executable ran but `--version` failed (broken Python environment).
    #[error("'{path} --version' exited with {status}: {stderr}")]
    Probe {
        path: PathBuf,
        status: String,
        stderr: String,
    },
}

// ── Capability model ─────────────────────────────────────────────────────────

/// Command-line options the installed docling release understands.
///
/// Older releases predate accelerator tuning and several enrichment stages,
/// so callers should consult these before passing the matching flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoclingCapabilities {
    /// `--device auto|cpu|cuda|mps`
    pub device: bool,
    /// `--num-threads N`
    pub num_threads: bool,
    /// `--ocr-lang en,fr,...`
    pub ocr_lang: bool,
    /// `--enrich-code`
    pub enrich_code: bool,
    /// `--enrich-formula`
    pub enrich_formula: bool,
    /// `--enrich-picture-classes`
    pub enrich_picture_classes: bool,
    /// `--image-export-mode placeholder|embedded|referenced`
    pub image_export_mode: bool,
    /// `--from json_docling` (re-export a saved DoclingDocument)
    pub json_input: bool,
}

impl DoclingCapabilities {
    /// Accelerator tuning needs both the device and thread options.
    pub fn accelerator(&self) -> bool {
        self.device && self.num_threads
    }
}

/// A located and probed docling installation.
#[derive(Debug, Clone)]
pub struct DoclingInstall {
    pub path: PathBuf,
    /// Parsed from `docling --version`; `None` when the output is unrecognised.
    pub version: Option<String>,
    pub capabilities: DoclingCapabilities,
}

impl DoclingInstall {
    pub fn version_or_unknown(&self) -> &str {
        self.version.as_deref().unwrap_or("unknown")
    }
}

// ── Thread-safe singleton caches ─────────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();
static PROBED: OnceLock<DoclingInstall> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns `true` if a docling executable can be located (no subprocess is
/// spawned).
pub fn is_docling_available() -> bool {
    locate_docling().is_ok()
}

/// Returns the path of the docling executable.
///
/// - If `DOCLING_BIN` is set, that path is used (and must exist).
/// - Otherwise `PATH` is scanned, then the user-local bin directories.
pub fn locate_docling() -> Result<PathBuf, DoclingAutoError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = resolve_executable()?;

    // Ignore the race: concurrent callers resolve to the same path.
    let _ = RESOLVED_PATH.set(path.clone());

    Ok(path)
}

/// Locates docling and probes its version and capabilities.
///
/// # Thread safety
///
/// Safe to call from multiple threads; the probe runs at most a handful of
/// times per process and the first result is kept.
pub fn probe_docling() -> Result<DoclingInstall, DoclingAutoError> {
    if let Some(install) = PROBED.get() {
        return Ok(install.clone());
    }

    let path = locate_docling()?;
    let install = probe_docling_at(&path)?;
    let _ = PROBED.set(install.clone());

    Ok(install)
}

/// Probes an explicit docling executable without touching the cache.
pub fn probe_docling_at(path: &Path) -> Result<DoclingInstall, DoclingAutoError> {
    let version_out = run_capture(path, "--version")?;
    if !version_out.status.success() {
        return Err(DoclingAutoError::Probe {
            path: path.to_path_buf(),
            status: version_out.status.to_string(),
            stderr: String::from_utf8_lossy(&version_out.stderr).trim().to_string(),
        });
    }
    let version = parse_version(&String::from_utf8_lossy(&version_out.stdout));

    // A failing --help only costs us capability detection.
    let capabilities = match run_capture(path, "--help") {
        Ok(out) if out.status.success() => {
            parse_capabilities(&String::from_utf8_lossy(&out.stdout))
        }
        _ => DoclingCapabilities::default(),
    };

    Ok(DoclingInstall {
        path: path.to_path_buf(),
        version,
        capabilities,
    })
}

/// Extracts the docling release from `docling --version` output.
///
/// Recognises both the multi-line report of docling 2.x
/// (`Docling version: 2.15.1`) and a bare version string.
pub fn parse_version(output: &str) -> Option<String> {
    static LABELLED: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();

    let labelled = LABELLED
        .get_or_init(|| Regex::new(r"(?mi)^\s*docling version:\s*([0-9][\w.+-]*)").unwrap());
    if let Some(caps) = labelled.captures(output) {
        return Some(caps[1].to_string());
    }

    let bare = BARE.get_or_init(|| Regex::new(r"\b(\d+\.\d+(?:\.\d+)?)\b").unwrap());
    bare.captures(output).map(|c| c[1].to_string())
}

/// Scans `docling --help` output for the options this crate cares about.
pub fn parse_capabilities(help: &str) -> DoclingCapabilities {
    DoclingCapabilities {
        device: has_option(help, "device"),
        num_threads: has_option(help, "num-threads"),
        ocr_lang: has_option(help, "ocr-lang"),
        enrich_code: has_option(help, "enrich-code"),
        enrich_formula: has_option(help, "enrich-formula"),
        enrich_picture_classes: has_option(help, "enrich-picture-classes"),
        image_export_mode: has_option(help, "image-export-mode"),
        json_input: help.contains("json_docling"),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn executable_name() -> &'static str {
    if cfg!(windows) {
        "docling.exe"
    } else {
        "docling"
    }
}

/// `--name` followed by a non-word, non-dash character, so that `--ocr`
/// does not match `--ocr-lang`.
fn has_option(help: &str, name: &str) -> bool {
    let pattern = format!(r"--{}(?:[^\w-]|$)", regex::escape(name));
    Regex::new(&pattern)
        .map(|re| re.is_match(help))
        .unwrap_or(false)
}

fn resolve_executable() -> Result<PathBuf, DoclingAutoError> {
    // 1. Environment variable override.
    if let Some(raw) = std::env::var_os(DOCLING_BIN_ENV) {
        if !raw.is_empty() {
            let p = PathBuf::from(raw);
            if p.is_file() {
                return Ok(p);
            }
            return Err(DoclingAutoError::BadOverride { path: p });
        }
    }

    // 2. PATH scan.
    if let Some(path_var) = std::env::var_os("PATH") {
        if let Some(found) = find_in_dirs(std::env::split_paths(&path_var), executable_name()) {
            return Ok(found);
        }
    }

    // 3. User-local console-script directories.
    if let Some(found) = find_in_dirs(user_bin_dirs(), executable_name()) {
        return Ok(found);
    }

    Err(DoclingAutoError::NotFound { hint: INSTALL_HINT })
}

fn user_bin_dirs() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| vec![home.join(".local").join("bin")])
        .unwrap_or_default()
}

fn find_in_dirs<I>(dirs: I, name: &str) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    dirs.into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn run_capture(
    path: &Path,
    arg: impl AsRef<OsStr>,
) -> Result<std::process::Output, DoclingAutoError> {
    Command::new(path)
        .arg(arg)
        .output()
        .map_err(|e| DoclingAutoError::Spawn {
            path: path.to_path_buf(),
            source: e,
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const HELP_2X: &str = "\
 Usage: docling [OPTIONS] source

 --from            [docx|pptx|html|image|pdf|md|json_docling]
 --to              [md|json|html|text|doctags]
 --image-export-mode  [placeholder|embedded|referenced]
 --ocr --no-ocr
 --ocr-lang        TEXT
 --enrich-code --no-enrich-code
 --enrich-formula --no-enrich-formula
 --enrich-picture-classes --no-enrich-picture-classes
 --num-threads     INTEGER
 --device          [auto|cpu|cuda|mps]
";

    #[test]
    fn parses_labelled_version() {
        let out = "Docling version: 2.15.1\nDocling Core version: 2.13.1\nPython: cpython-311";
        assert_eq!(parse_version(out).as_deref(), Some("2.15.1"));
    }

    #[test]
    fn parses_bare_version() {
        assert_eq!(parse_version("docling 1.20\n").as_deref(), Some("1.20"));
        assert_eq!(parse_version("no digits here"), None);
    }

    #[test]
    fn detects_modern_capabilities() {
        let caps = parse_capabilities(HELP_2X);
        assert!(caps.device);
        assert!(caps.num_threads);
        assert!(caps.accelerator());
        assert!(caps.ocr_lang);
        assert!(caps.enrich_code);
        assert!(caps.enrich_formula);
        assert!(caps.enrich_picture_classes);
        assert!(caps.image_export_mode);
        assert!(caps.json_input);
    }

    #[test]
    fn old_help_has_no_accelerator() {
        let caps = parse_capabilities(" --ocr --no-ocr\n --output PATH\n");
        assert!(!caps.accelerator());
        assert!(!caps.ocr_lang, "--ocr must not match --ocr-lang");
    }

    #[test]
    fn find_in_dirs_picks_first_existing() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(b.path().join("docling"), b"#!/bin/sh\n").unwrap();

        let found = find_in_dirs(
            vec![a.path().to_path_buf(), b.path().to_path_buf()],
            "docling",
        );
        assert_eq!(found, Some(b.path().join("docling")));
        assert_eq!(find_in_dirs(vec![a.path().to_path_buf()], "docling"), None);
    }

    #[test]
    fn not_found_message_has_install_hint() {
        let e = DoclingAutoError::NotFound { hint: INSTALL_HINT };
        assert!(e.to_string().contains("pip install docling"));
    }
}
