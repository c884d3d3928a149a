//! Map [`ProcessingConfig`] onto the engine's pipeline options.
//!
//! ```text
//! ProcessingConfig ──▶ PipelineOptions ──▶ Converter<E>
//!   (named toggles)     (engine shape)      (bound to PDF, reusable)
//! ```
//!
//! The mapping is one-to-one with three conditional rules: cell matching only
//! exists when table extraction is on, the image scale only exists when page
//! images are on, and OCR languages only exist when OCR is on. Thread count
//! and device are only set when the engine advertises accelerator support;
//! otherwise a warning is logged and the engine keeps its own defaults.

use crate::config::ProcessingConfig;
use crate::engine::{ConversionEngine, ConversionResult, InputFormat};
use crate::error::Pdf2StructError;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Compute device for the engine's models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceleratorDevice {
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl AcceleratorDevice {
    /// Case-insensitive lookup; unknown names log a warning and map to
    /// [`AcceleratorDevice::Auto`].
    pub fn lookup(name: &str) -> AcceleratorDevice {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" => AcceleratorDevice::Auto,
            "cpu" => AcceleratorDevice::Cpu,
            "cuda" => AcceleratorDevice::Cuda,
            other => {
                warn!("Unknown device '{}', falling back to auto", other);
                AcceleratorDevice::Auto
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AcceleratorDevice::Auto => "auto",
            AcceleratorDevice::Cpu => "cpu",
            AcceleratorDevice::Cuda => "cuda",
        }
    }
}

impl fmt::Display for AcceleratorDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableStructureOptions {
    pub do_cell_matching: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AcceleratorOptions {
    pub num_threads: usize,
    pub device: AcceleratorDevice,
}

/// The engine-facing pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOptions {
    pub do_ocr: bool,
    /// `None` when OCR is off.
    pub ocr_languages: Option<Vec<String>>,
    pub do_table_structure: bool,
    /// `None` when table extraction is off.
    pub table_structure: Option<TableStructureOptions>,
    pub generate_page_images: bool,
    /// `None` when page images are off.
    pub images_scale: Option<f32>,
    pub generate_picture_images: bool,
    pub do_picture_classification: bool,
    pub do_code_enrichment: bool,
    pub do_formula_enrichment: bool,
    /// `None` when the engine cannot tune threads/device.
    pub accelerator: Option<AcceleratorOptions>,
}

impl PipelineOptions {
    /// Translate the processing group. `accelerator_supported` comes from
    /// [`crate::engine::EngineCapabilities`].
    pub fn from_config(config: &ProcessingConfig, accelerator_supported: bool) -> PipelineOptions {
        let accelerator = if accelerator_supported {
            Some(AcceleratorOptions {
                num_threads: config.num_threads,
                device: AcceleratorDevice::lookup(&config.device),
            })
        } else {
            warn!(
                "Engine does not support accelerator options; \
                 ignoring num_threads={} device={}",
                config.num_threads, config.device
            );
            None
        };

        PipelineOptions {
            do_ocr: config.enable_ocr,
            ocr_languages: config
                .enable_ocr
                .then(|| config.ocr_languages.clone()),
            do_table_structure: config.enable_tables,
            table_structure: config.enable_tables.then_some(TableStructureOptions {
                do_cell_matching: config.table_cell_matching,
            }),
            generate_page_images: config.generate_page_images,
            images_scale: config
                .generate_page_images
                .then_some(config.image_resolution_scale),
            generate_picture_images: config.generate_picture_images,
            do_picture_classification: config.enable_picture_classification,
            do_code_enrichment: config.enable_code_enrichment,
            do_formula_enrichment: config.enable_formula_enrichment,
            accelerator,
        }
    }
}

/// An engine bound to the PDF input format with fixed pipeline options.
///
/// Built once by [`configure`] and reused for every input of an invocation.
pub struct Converter<E: ConversionEngine> {
    engine: E,
    options: PipelineOptions,
    format: InputFormat,
}

impl<E: ConversionEngine> Converter<E> {
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run the engine on one file.
    pub fn convert(&self, source: &Path) -> Result<ConversionResult<E::Document>, Pdf2StructError> {
        debug!(
            "Converting {} with {} ({})",
            source.display(),
            self.engine.name(),
            self.format.as_str()
        );
        self.engine.convert(source, self.format, &self.options)
    }
}

/// Build a reusable converter from the processing group.
pub fn configure<E: ConversionEngine>(engine: E, config: &ProcessingConfig) -> Converter<E> {
    let caps = engine.capabilities();
    let options = PipelineOptions::from_config(config, caps.accelerator);
    debug!("Pipeline options: {:?}", options);
    Converter {
        engine,
        options,
        format: InputFormat::Pdf,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_one_to_one() {
        let o = PipelineOptions::from_config(&ProcessingConfig::default(), true);
        assert!(o.do_ocr);
        assert_eq!(o.ocr_languages, Some(vec!["en".to_string()]));
        assert!(o.do_table_structure);
        assert_eq!(
            o.table_structure,
            Some(TableStructureOptions {
                do_cell_matching: true
            })
        );
        assert_eq!(o.images_scale, Some(2.0));
        assert!(o.generate_picture_images);
        assert!(o.do_picture_classification);
        assert!(!o.do_code_enrichment);
        assert!(!o.do_formula_enrichment);
        assert_eq!(
            o.accelerator,
            Some(AcceleratorOptions {
                num_threads: 4,
                device: AcceleratorDevice::Auto
            })
        );
    }

    #[test]
    fn cell_matching_absent_without_tables() {
        let cfg = ProcessingConfig {
            enable_tables: false,
            table_cell_matching: true,
            ..Default::default()
        };
        let o = PipelineOptions::from_config(&cfg, true);
        assert!(!o.do_table_structure);
        assert_eq!(o.table_structure, None);
    }

    #[test]
    fn scale_absent_without_page_images() {
        let cfg = ProcessingConfig {
            generate_page_images: false,
            image_resolution_scale: 3.0,
            ..Default::default()
        };
        let o = PipelineOptions::from_config(&cfg, true);
        assert_eq!(o.images_scale, None);
    }

    #[test]
    fn languages_absent_without_ocr() {
        let cfg = ProcessingConfig {
            enable_ocr: false,
            ocr_languages: vec!["de".into()],
            ..Default::default()
        };
        assert_eq!(PipelineOptions::from_config(&cfg, true).ocr_languages, None);
    }

    #[test]
    fn no_accelerator_capability_skips_tuning() {
        let o = PipelineOptions::from_config(&ProcessingConfig::default(), false);
        assert_eq!(o.accelerator, None);
        assert!(o.do_ocr);
    }

    #[test]
    fn device_lookup() {
        assert_eq!(AcceleratorDevice::lookup("CUDA"), AcceleratorDevice::Cuda);
        assert_eq!(AcceleratorDevice::lookup("cpu"), AcceleratorDevice::Cpu);
        assert_eq!(AcceleratorDevice::lookup("tpu"), AcceleratorDevice::Auto);

        let cfg = ProcessingConfig {
            device: "mps-ish".into(),
            ..Default::default()
        };
        let o = PipelineOptions::from_config(&cfg, true);
        assert_eq!(o.accelerator.unwrap().device, AcceleratorDevice::Auto);
    }
}
