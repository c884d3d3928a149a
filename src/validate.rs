//! Input validation: existence, extension allow-list, size ceiling.
//!
//! Checks run in a fixed order and the first failure wins, so a missing
//! `report.docx` is reported as missing rather than unsupported. Validation
//! only stats the file; it never opens or reads it.

use crate::config::FileConfig;
use crate::error::Pdf2StructError;
use std::path::{Path, PathBuf};
use tracing::debug;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// A path that passed validation, with the facts learned along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl InputFile {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB as f64
    }

    /// File name without extension; every output artifact is named from it.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }
}

/// Validate `path` against `rules`.
///
/// # Errors
/// - [`Pdf2StructError::InputNotFound`]: nothing at `path`
/// - [`Pdf2StructError::UnsupportedFileType`]: extension not allowed
/// - [`Pdf2StructError::FileTooLarge`]: more than `max_file_size_mb` MiB
pub fn validate_input(path: &Path, rules: &FileConfig) -> Result<InputFile, Pdf2StructError> {
    // 1. Existence
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => {
            return Err(Pdf2StructError::InputNotFound {
                path: path.to_path_buf(),
            })
        }
    };

    // 2. Extension
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    let allowed = rules
        .supported_extensions
        .iter()
        .any(|s| s.to_lowercase() == extension);
    if !allowed {
        return Err(Pdf2StructError::UnsupportedFileType {
            path: path.to_path_buf(),
            extension: if extension.is_empty() {
                "<none>".to_string()
            } else {
                extension
            },
            supported: rules.supported_extensions.join(", "),
        });
    }

    // 3. Size (inclusive ceiling, compared in bytes to avoid float edges)
    let size_bytes = meta.len();
    let limit_bytes = rules.max_file_size_mb.saturating_mul(BYTES_PER_MB);
    if size_bytes > limit_bytes {
        return Err(Pdf2StructError::FileTooLarge {
            path: path.to_path_buf(),
            size_mb: size_bytes as f64 / BYTES_PER_MB as f64,
            limit_mb: rules.max_file_size_mb,
        });
    }

    debug!("Validated input: {} ({} bytes)", path.display(), size_bytes);
    Ok(InputFile {
        path: path.to_path_buf(),
        size_bytes,
    })
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn rules(limit_mb: u64) -> FileConfig {
        FileConfig {
            max_file_size_mb: limit_mb,
            ..FileConfig::default()
        }
    }

    fn sized_file(dir: &Path, name: &str, len: u64) -> PathBuf {
        let p = dir.join(name);
        File::create(&p).unwrap().set_len(len).unwrap();
        p
    }

    #[test]
    fn exactly_at_limit_passes() {
        let dir = tempfile::tempdir().unwrap();
        let p = sized_file(dir.path(), "a.pdf", BYTES_PER_MB);
        let info = validate_input(&p, &rules(1)).unwrap();
        assert_eq!(info.size_bytes, BYTES_PER_MB);
        assert_eq!(info.size_mb(), 1.0);
    }

    #[test]
    fn one_byte_over_fails() {
        let dir = tempfile::tempdir().unwrap();
        let p = sized_file(dir.path(), "a.pdf", BYTES_PER_MB + 1);
        let err = validate_input(&p, &rules(1)).unwrap_err();
        assert!(matches!(err, Pdf2StructError::FileTooLarge { limit_mb: 1, .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = validate_input(Path::new("/definitely/not/here.pdf"), &rules(100)).unwrap_err();
        assert!(matches!(err, Pdf2StructError::InputNotFound { .. }));
    }

    #[test]
    fn missing_file_with_bad_extension_is_not_found() {
        let err = validate_input(Path::new("/definitely/not/here.docx"), &rules(100)).unwrap_err();
        assert!(matches!(err, Pdf2StructError::InputNotFound { .. }));
    }

    #[test]
    fn unsupported_extension_regardless_of_content() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "a.docx", "a.pdf.bak", "noext"] {
            let p = dir.path().join(name);
            std::fs::write(&p, b"%PDF-1.7 looks like a pdf").unwrap();
            let err = validate_input(&p, &rules(100)).unwrap_err();
            assert!(
                matches!(err, Pdf2StructError::UnsupportedFileType { .. }),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let p = sized_file(dir.path(), "Scan.PDF", 10);
        assert!(validate_input(&p, &rules(100)).is_ok());

        let upper_rules = FileConfig {
            supported_extensions: vec![".PDF".into()],
            ..FileConfig::default()
        };
        let p = sized_file(dir.path(), "scan.pdf", 10);
        assert!(validate_input(&p, &upper_rules).is_ok());
    }

    #[test]
    fn too_large_checked_after_extension() {
        let dir = tempfile::tempdir().unwrap();
        let p = sized_file(dir.path(), "huge.txt", 3 * BYTES_PER_MB);
        let err = validate_input(&p, &rules(1)).unwrap_err();
        assert!(matches!(err, Pdf2StructError::UnsupportedFileType { .. }));
    }

    #[test]
    fn stem_drops_extension() {
        let info = InputFile {
            path: PathBuf::from("/tmp/annual report.pdf"),
            size_bytes: 0,
        };
        assert_eq!(info.stem(), "annual report");
    }
}
