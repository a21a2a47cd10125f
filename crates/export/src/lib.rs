//! Folio Export - document export pipeline
//!
//! This crate turns a rich-text content tree (headings, paragraphs, tables,
//! images, rules) into a single-page raster PDF, a DOCX document or a
//! standalone HTML file. Images are resolved once per export and degrade to
//! placeholders when they cannot be loaded.

pub mod arena;
pub mod error;
pub mod job;
pub mod manager;
pub mod model;
pub mod progress;
pub mod resolver;
pub mod sanitize;
pub mod sink;
pub mod traits;
pub mod types;
pub mod typesetter;
pub mod walker;

pub mod converters;
pub mod formats;

use std::sync::Arc;

// Re-export main types
pub use error::{ExportError, FailureKind, Result};
pub use job::{ExportJob, JobStage, JobStatus};
pub use manager::{ExportManager, ExportManagerBuilder};
pub use model::{Alignment, Cell, ContentNode, TextRun};
pub use progress::{IndicatorGuard, ProgressIndicator, TracingIndicator};
pub use resolver::{ImageFetcher, ReqwestFetcher, ResolvedImage, ResolvedImages, ResourceResolver};
pub use sink::{ArtifactSink, DirectorySink, MemorySink};
pub use traits::{Emission, Emitter};
pub use types::{EmittedArtifact, ExportOptions, ExportReport, FormatInfo, TargetFormat};
pub use walker::{Event, walk};

// Re-export emitters
pub use formats::{DocxEmitter, HtmlEmitter, RasterEmitter};

// Re-export converters
pub use converters::parse_html;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Create an export manager with all emitters registered, saving into `sink`.
pub fn default_export_manager(sink: Arc<dyn ArtifactSink>) -> Result<ExportManager> {
    export_manager_with_options(sink, ExportOptions::default())
}

/// Like [`default_export_manager`], with custom options.
pub fn export_manager_with_options(
    sink: Arc<dyn ArtifactSink>,
    options: ExportOptions,
) -> Result<ExportManager> {
    let mut manager = ExportManager::builder()
        .sink(sink)
        .options(options)
        .build()?;
    manager.register(RasterEmitter::with_typesetter(manager.typesetter()))?;
    manager.register(DocxEmitter::new())?;
    manager.register(HtmlEmitter::new())?;
    Ok(manager)
}
