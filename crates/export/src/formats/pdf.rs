//! Raster PDF export format implementation using Typst.
//!
//! The document is laid out on a single US Letter page, rendered to a PNG
//! snapshot and then wrapped full-bleed in a one-page PDF. Only the first page
//! is kept; overflow is reported as a warning.

use std::sync::Arc;

use async_trait::async_trait;

use crate::arena::RenderArena;
use crate::converters::{EventsToTypstConverter, TypstMarkup};
use crate::error::{ExportError, Result};
use crate::traits::{Emission, Emitter};
use crate::typesetter::{Typesetter, escape_typst_string};
use crate::types::{ExportOptions, FormatInfo, TargetFormat};
use crate::walker::Event;

/// CSS pixels per point.
const PX_PER_PT: f32 = 96.0 / 72.0;
const SNAPSHOT_PATH: &str = "snapshot.png";

/// A rendered first page.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Pages the content laid out onto before truncation.
    pub pages: usize,
    pub skipped_images: Vec<String>,
}

/// Raster PDF exporter using Typst.
pub struct RasterEmitter {
    typesetter: Arc<Typesetter>,
}

impl RasterEmitter {
    /// Create a new raster emitter with its own font set.
    pub fn new() -> Self {
        Self::with_typesetter(Arc::new(Typesetter::new()))
    }

    /// Create a raster emitter sharing an existing typesetter.
    pub fn with_typesetter(typesetter: Arc<Typesetter>) -> Self {
        Self { typesetter }
    }

    /// Lay out `events` and render the first page.
    pub fn render_snapshot(
        &self,
        events: &[Event],
        title: &str,
        arena: &mut RenderArena,
        options: &ExportOptions,
    ) -> Result<Snapshot> {
        let (source, markup) = generate_typst_source(events, title, arena);
        tracing::debug!("Generated Typst source: {} characters", source.len());

        let document = self.typesetter.compile(source, arena.files())?;
        let page = document
            .pages
            .first()
            .ok_or_else(|| ExportError::rendering("layout produced no page"))?;

        let pixel_per_pt = options.raster_scale * PX_PER_PT;
        let pixmap = typst_render::render(page, pixel_per_pt);
        let png = pixmap
            .encode_png()
            .map_err(|e| ExportError::rendering(format!("PNG encoding failed: {}", e)))?;

        Ok(Snapshot {
            png,
            width: pixmap.width(),
            height: pixmap.height(),
            pages: document.pages.len(),
            skipped_images: markup.skipped_images,
        })
    }

    /// Embed a snapshot full-bleed in a one-page PDF.
    fn package(&self, snapshot: Snapshot, title: &str, arena: &mut RenderArena) -> Result<Vec<u8>> {
        let path = arena.add_file(SNAPSHOT_PATH, snapshot.png);
        let source = format!(
            "#set document(title: \"{}\")\n\
             #set page(width: 8.5in, height: 11in, margin: 0pt)\n\
             #image(\"{}\", width: 100%, height: 100%, fit: \"stretch\")\n",
            escape_typst_string(title),
            path
        );

        let document = self
            .typesetter
            .compile(source, arena.files())
            .map_err(|e| ExportError::packaging(e.to_string()))?;
        self.typesetter.pdf(&document)
    }
}

impl Default for RasterEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Emitter for RasterEmitter {
    fn format_info(&self) -> FormatInfo {
        FormatInfo::new(TargetFormat::Pdf, "PDF Document")
    }

    async fn emit(
        &self,
        events: &[Event],
        title: &str,
        arena: &mut RenderArena,
        options: &ExportOptions,
    ) -> Result<Emission> {
        let snapshot = self.render_snapshot(events, title, arena, options)?;
        tracing::info!(
            "Rendered raster snapshot {}x{} for '{}'",
            snapshot.width,
            snapshot.height,
            title
        );

        let mut warnings = Vec::new();
        if snapshot.pages > 1 {
            tracing::warn!(
                "Content of '{}' overflows one page ({} pages), keeping the first",
                title,
                snapshot.pages
            );
            warnings.push(format!(
                "content spans {} pages; only the first page was exported",
                snapshot.pages
            ));
        }
        for uri in &snapshot.skipped_images {
            warnings.push(format!("image '{}' could not be embedded", uri));
        }

        let bytes = self.package(snapshot, title, arena)?;
        Ok(Emission { bytes, warnings })
    }
}

/// Complete Typst source for the snapshot page.
pub fn generate_typst_source(
    events: &[Event],
    title: &str,
    arena: &mut RenderArena,
) -> (String, TypstMarkup) {
    let markup = EventsToTypstConverter::new(arena).convert(events);

    let mut content = String::new();

    // Document setup
    content.push_str(&format!(
        "#set document(title: \"{}\")\n",
        escape_typst_string(title)
    ));

    // Page setup
    content.push_str("#set page(\n");
    content.push_str("  width: 8.5in,\n");
    content.push_str("  height: 11in,\n");
    content.push_str("  margin: 1in,\n");
    content.push_str("  fill: white,\n");
    content.push_str(")\n\n");

    // Text formatting
    content.push_str("#set text(size: 12pt)\n");
    content.push_str("#set par(leading: 0.65em)\n\n");

    content.push_str(&markup.body);

    (content, markup)
}
