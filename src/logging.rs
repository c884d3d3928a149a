//! Log sinks built from [`LoggingConfig`].
//!
//! The subscriber has a console layer on stderr and, when `save_logs` is on,
//! a plain-text layer appending to `log_file`. `RUST_LOG` overrides the
//! console level; the file layer always records at the configured level.
//!
//! [`install`] returns a guard: the subscriber is the default only while the
//! guard lives, so one CLI invocation owns its log sinks and nothing is
//! registered globally.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::Pdf2StructError;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Parse a level name. Case-insensitive; `WARNING` and `CRITICAL` are
/// accepted as aliases for `WARN` and `ERROR`.
pub fn parse_level(name: &str) -> Result<LevelFilter, Pdf2StructError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok(LevelFilter::TRACE),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "INFO" => Ok(LevelFilter::INFO),
        "WARN" | "WARNING" => Ok(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Ok(LevelFilter::ERROR),
        "OFF" => Ok(LevelFilter::OFF),
        other => Err(Pdf2StructError::InvalidConfig(format!(
            "unknown logging.level '{other}' (expected TRACE, DEBUG, INFO, WARNING or ERROR)"
        ))),
    }
}

/// Resolved sink settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub console_level: LevelFilter,
    pub file_level: LevelFilter,
    pub format: LogFormat,
    /// `None` when file logging is off.
    pub file: Option<PathBuf>,
    /// Let `RUST_LOG` override `console_level`.
    pub honor_env: bool,
}

impl LogSettings {
    pub fn from_config(config: &LoggingConfig) -> Result<Self, Pdf2StructError> {
        let level = parse_level(&config.level)?;
        Ok(Self {
            console_level: level,
            file_level: level,
            format: config.format,
            file: config.save_logs.then(|| config.log_file.clone()),
            honor_env: true,
        })
    }

    pub fn with_console_level(mut self, level: LevelFilter) -> Self {
        self.console_level = level;
        self
    }
}

fn console_layer(settings: &LogSettings) -> BoxedLayer {
    let filter = if settings.honor_env {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(settings.console_level.into()))
    } else {
        EnvFilter::default().add_directive(settings.console_level.into())
    };
    let base = fmt::layer().with_writer(std::io::stderr).with_target(false);
    match settings.format {
        LogFormat::Full => base.with_filter(filter).boxed(),
        LogFormat::Compact => base.compact().with_filter(filter).boxed(),
        LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
    }
}

fn file_layer(path: &Path, settings: &LogSettings) -> Result<BoxedLayer, Pdf2StructError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Pdf2StructError::OutputWriteFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Pdf2StructError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    let base = fmt::layer().with_ansi(false).with_writer(Arc::new(file));
    Ok(match settings.format {
        LogFormat::Compact => base.compact().with_filter(settings.file_level).boxed(),
        _ => base.with_filter(settings.file_level).boxed(),
    })
}

/// Build the layers and make them the default subscriber for the current
/// thread until the returned guard is dropped.
pub fn install(settings: &LogSettings) -> Result<DefaultGuard, Pdf2StructError> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(settings)];
    if let Some(path) = &settings.file {
        layers.push(file_layer(path, settings)?);
    }
    let subscriber = Registry::default().with(layers);
    Ok(tracing::subscriber::set_default(subscriber))
}
