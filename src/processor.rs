//! Per-document orchestration: validate → convert → check → build → write.
//!
//! ```text
//! path ─▶ validate ─▶ convert ─▶ SUCCESS? ─▶ [backup] ─▶ payload ─▶ outputs
//!            │           │          │ no
//!            ▼           ▼          ▼
//!      InputNotFound…  Processing  ConversionFailed (nothing written)
//!                      Failed
//! ```
//!
//! A validation failure returns before the engine is touched. Everything that
//! goes wrong after validation is reported as
//! [`Pdf2StructError::ProcessingFailed`], except a missing engine
//! ([`Pdf2StructError::DependencyUnavailable`]) and a non-success status
//! ([`Pdf2StructError::ConversionFailed`]), which keep their own kinds.

use crate::config::Config;
use crate::engine::{ConversionEngine, DocumentHandle};
use crate::error::Pdf2StructError;
use crate::output::{OutputWriter, WriteReport};
use crate::pipeline::{configure, Converter};
use crate::progress::ProgressCallback;
use crate::result::{build_payload, ConfigSnapshot, ResultPayload};
use crate::validate::{validate_input, InputFile};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// The payload for one input plus what happened to its output files.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub payload: ResultPayload,
    pub outputs: WriteReport,
    /// Set when `file.create_backup` is on and the copy succeeded.
    pub backup: Option<PathBuf>,
}

/// Processes PDFs one at a time with a converter built once up front.
pub struct DocumentProcessor<E: ConversionEngine> {
    converter: Converter<E>,
    config: Config,
    writer: OutputWriter,
    progress: Option<ProgressCallback>,
}

impl<E: ConversionEngine> DocumentProcessor<E> {
    /// Configure `engine` from `config.processing` and get ready to process.
    ///
    /// The engine is told `output.image_mode` up front so Markdown and HTML
    /// can be rendered during conversion in the mode they are saved in.
    pub fn new(engine: E, config: Config) -> Self {
        let writer = OutputWriter::new(&config.output);
        let engine = engine.with_image_mode(writer.image_mode());
        let converter = configure(engine, &config.processing);
        Self {
            converter,
            config,
            writer,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn converter(&self) -> &Converter<E> {
        &self.converter
    }

    /// Process one file and return its payload.
    pub fn process(&self, path: impl AsRef<Path>) -> Result<ResultPayload, Pdf2StructError> {
        self.process_detailed(path).map(|p| p.payload)
    }

    /// Like [`Self::process`] but also reports which artifacts were written.
    pub fn process_detailed(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ProcessedDocument, Pdf2StructError> {
        let path = path.as_ref();
        let result = self.run(path);
        if let Err(ref e) = result {
            error!("{}", e);
            if let Some(cb) = &self.progress {
                cb.on_failed(path, &e.to_string());
            }
        }
        result
    }

    fn run(&self, path: &Path) -> Result<ProcessedDocument, Pdf2StructError> {
        // ── Step 1: Validate ─────────────────────────────────────────────
        let input = validate_input(path, &self.config.file)?;
        if let Some(cb) = &self.progress {
            cb.on_validated(&input.path, input.size_bytes);
        }
        info!(
            "Starting processing: {} ({})",
            input.path.display(),
            self.converter.engine().name()
        );

        // ── Step 2: Convert ──────────────────────────────────────────────
        if let Some(cb) = &self.progress {
            cb.on_conversion_start(&input.path);
        }
        let start = Instant::now();
        let result = self
            .converter
            .convert(&input.path)
            .map_err(|e| processing_failed(&input.path, e))?;

        // ── Step 3: Check status ─────────────────────────────────────────
        if !result.status.is_success() {
            return Err(Pdf2StructError::ConversionFailed {
                path: input.path.clone(),
                status: result.status,
            });
        }
        let document = result.document.ok_or_else(|| {
            processing_failed(
                &input.path,
                Pdf2StructError::Engine("engine reported SUCCESS without a document".into()),
            )
        })?;
        let elapsed = start.elapsed().as_secs_f64();
        if let Some(cb) = &self.progress {
            cb.on_conversion_complete(&input.path, document.num_pages(), elapsed);
        }

        // Only a successful conversion may leave files in the output directory.
        let backup = if self.config.file.create_backup {
            self.backup(&input)
        } else {
            None
        };

        // ── Step 4: Build payload ────────────────────────────────────────
        let snapshot = ConfigSnapshot::from(&self.config.processing);
        let payload = build_payload(&document, &input.path, elapsed, snapshot);

        // ── Step 5: Write outputs ────────────────────────────────────────
        let outputs = if self.config.output.any_enabled() {
            self.writer
                .write(&document, &input.stem(), &payload)
                .map_err(|e| processing_failed(&input.path, e))?
        } else {
            WriteReport::default()
        };
        if let Some(cb) = &self.progress {
            for (format, p) in &outputs.written {
                cb.on_output_written(*format, p);
            }
            for f in &outputs.failed {
                cb.on_output_failed(f);
            }
        }
        if !outputs.is_complete() {
            warn!(
                "{} of {} output formats failed for {}",
                outputs.failed.len(),
                outputs.failed.len() + outputs.written.len(),
                input.path.display()
            );
        }

        info!("Processing completed in {:.2} seconds", elapsed);
        Ok(ProcessedDocument {
            payload,
            outputs,
            backup,
        })
    }

    /// Copy the source to `<output>/<name>_backup<ext>`. Failure is logged and
    /// processing continues.
    fn backup(&self, input: &InputFile) -> Option<PathBuf> {
        let ext = input
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let target = self
            .writer
            .output_dir()
            .join(format!("{}_backup{}", input.stem(), ext));
        let copied = self
            .writer
            .ensure_dir()
            .and_then(|_| {
                std::fs::copy(&input.path, &target).map_err(|source| {
                    Pdf2StructError::OutputWriteFailed {
                        path: target.clone(),
                        source,
                    }
                })
            });
        match copied {
            Ok(_) => {
                info!("Backup saved: {}", target.display());
                Some(target)
            }
            Err(e) => {
                warn!("Backup skipped: {}", e);
                None
            }
        }
    }
}

fn processing_failed(path: &Path, e: Pdf2StructError) -> Pdf2StructError {
    match e {
        e @ Pdf2StructError::DependencyUnavailable { .. } => e,
        e @ Pdf2StructError::ProcessingFailed { .. } => e,
        other => Pdf2StructError::ProcessingFailed {
            path: path.to_path_buf(),
            cause: other.to_string(),
        },
    }
}
