//! Export manager coordinating resolution, emission and saving.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::arena::RenderArena;
use crate::converters::parse_html;
use crate::error::{ExportError, Result};
use crate::job::{ExportJob, JobStage};
use crate::model::ContentNode;
use crate::progress::{IndicatorGuard, ProgressIndicator, TracingIndicator};
use crate::resolver::{ImageFetcher, ReqwestFetcher, ResourceResolver};
use crate::sink::{ArtifactSink, MemorySink};
use crate::traits::Emitter;
use crate::types::{EmittedArtifact, ExportOptions, ExportReport, FormatInfo, TargetFormat};
use crate::typesetter::Typesetter;
use crate::walker::walk;

/// Manager for export operations.
///
/// Holds only immutable shared resources (emitters, fonts, HTTP client,
/// collaborators). Every call gets its own job, tree copy and arena, so
/// concurrent exports never share mutable state.
pub struct ExportManager {
    emitters: HashMap<TargetFormat, Box<dyn Emitter>>,
    resolver: ResourceResolver,
    typesetter: Arc<Typesetter>,
    sink: Arc<dyn ArtifactSink>,
    indicator: Arc<dyn ProgressIndicator>,
    options: ExportOptions,
}

/// Builder for [`ExportManager`].
pub struct ExportManagerBuilder {
    fetcher: Option<Arc<dyn ImageFetcher>>,
    typesetter: Option<Arc<Typesetter>>,
    sink: Option<Arc<dyn ArtifactSink>>,
    indicator: Option<Arc<dyn ProgressIndicator>>,
    options: ExportOptions,
}

impl ExportManagerBuilder {
    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn typesetter(mut self, typesetter: Arc<Typesetter>) -> Self {
        self.typesetter = Some(typesetter);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn indicator(mut self, indicator: Arc<dyn ProgressIndicator>) -> Self {
        self.indicator = Some(indicator);
        self
    }

    pub fn options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a manager with no emitters registered.
    pub fn build(self) -> Result<ExportManager> {
        self.options.validate()?;

        let typesetter = self
            .typesetter
            .unwrap_or_else(|| Arc::new(Typesetter::new()));
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(ReqwestFetcher::new()));

        Ok(ExportManager {
            emitters: HashMap::new(),
            resolver: ResourceResolver::new(fetcher, Arc::clone(&typesetter)),
            typesetter,
            sink: self.sink.unwrap_or_else(|| Arc::new(MemorySink::new())),
            indicator: self.indicator.unwrap_or_else(|| Arc::new(TracingIndicator)),
            options: self.options,
        })
    }
}

impl ExportManager {
    pub fn builder() -> ExportManagerBuilder {
        ExportManagerBuilder {
            fetcher: None,
            typesetter: None,
            sink: None,
            indicator: None,
            options: ExportOptions::default(),
        }
    }

    /// Register an emitter.
    pub fn register<E: Emitter + 'static>(&mut self, emitter: E) -> Result<()> {
        let format = emitter.format_info().format;

        if self.emitters.contains_key(&format) {
            return Err(ExportError::InvalidConfiguration {
                message: format!("Emitter for format '{}' already registered", format),
            });
        }

        self.emitters.insert(format, Box::new(emitter));
        Ok(())
    }

    /// Fonts shared by the raster emitter and the placeholder painter.
    pub fn typesetter(&self) -> Arc<Typesetter> {
        Arc::clone(&self.typesetter)
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export a rendered view as a single-page raster PDF.
    pub async fn export_to_pdf(
        &self,
        rendered_view: &ContentNode,
        filename: &str,
    ) -> Result<ExportReport> {
        self.export_tree(TargetFormat::Pdf, rendered_view, filename)
            .await
    }

    /// Parse `source_html` and export it as DOCX.
    pub async fn export_to_docx(&self, source_html: &str, filename: &str) -> Result<ExportReport> {
        self.export(TargetFormat::Docx, source_html, filename).await
    }

    /// Parse `source_html` and export it as standalone HTML.
    pub async fn export_to_html(&self, source_html: &str, filename: &str) -> Result<ExportReport> {
        self.export(TargetFormat::Html, source_html, filename).await
    }

    /// Parse `source_html` and export it to `format`.
    pub async fn export(
        &self,
        format: TargetFormat,
        source_html: &str,
        filename: &str,
    ) -> Result<ExportReport> {
        let tree = parse_html(source_html);
        self.export_tree(format, &tree, filename).await
    }

    /// Export a content tree to `format`.
    ///
    /// The caller's tree is never modified. Any failure is reported as a
    /// single [`ExportError::Job`]; unresolvable images are not failures.
    pub async fn export_tree(
        &self,
        format: TargetFormat,
        tree: &ContentNode,
        filename: &str,
    ) -> Result<ExportReport> {
        let mut job = ExportJob::new(format, filename, tree);
        let _indicator = IndicatorGuard::show(
            self.indicator.as_ref(),
            job.id(),
            &format!("Exporting {}", job.filename()),
        );

        job.start();
        match self.run(&mut job).await {
            Ok(report) => {
                job.succeed();
                tracing::info!(
                    "Job {}: exported '{}' ({} bytes, {} placeholders) in {}ms",
                    report.job_id,
                    report.filename,
                    report.total_size,
                    report.placeholders,
                    report.export_duration.num_milliseconds()
                );
                Ok(report)
            }
            Err(error) => Err(job.fail(error)),
        }
    }

    async fn run(&self, job: &mut ExportJob) -> Result<ExportReport> {
        let emitter = self
            .emitters
            .get(&job.format())
            .ok_or_else(|| ExportError::UnsupportedFormat {
                format: job.format().to_string(),
            })?;

        let mut arena = RenderArena::new(job.id());

        job.advance(JobStage::Resolving);
        let images = self
            .resolver
            .resolve_all(job.source(), &mut arena, &self.options)
            .await;
        let events = walk(job.source(), &images, &self.options);

        job.advance(JobStage::Emitting);
        let emission = emitter
            .emit(&events, job.title(), &mut arena, &self.options)
            .await?;
        drop(arena);

        let artifact = EmittedArtifact::new(emission.bytes, job.format(), job.filename());
        let saved_to = self
            .sink
            .save(&artifact)
            .await
            .map_err(|source| ExportError::Save {
                filename: artifact.filename.clone(),
                source,
            })?;

        job.advance(JobStage::Done);
        Ok(ExportReport {
            job_id: job.id().to_string(),
            format: job.format(),
            filename: artifact.filename.clone(),
            mime_type: artifact.mime_type.clone(),
            total_size: artifact.size(),
            saved_to,
            images: images.len() as u32,
            placeholders: images.placeholders() as u32,
            warnings: emission.warnings,
            export_duration: Utc::now().signed_duration_since(job.started_at()),
        })
    }

    /// Get format information.
    pub fn format_info(&self, format: &str) -> Option<FormatInfo> {
        let format = format.parse::<TargetFormat>().ok()?;
        self.emitters.get(&format).map(|e| e.format_info())
    }

    /// List available formats.
    pub fn available_formats(&self) -> Vec<FormatInfo> {
        let mut formats: Vec<_> = self.emitters.values().map(|e| e.format_info()).collect();
        formats.sort_by(|a, b| a.id().cmp(b.id()));
        formats
    }

    /// Check if format is supported.
    pub fn supports_format(&self, format: &str) -> bool {
        format
            .parse::<TargetFormat>()
            .is_ok_and(|format| self.emitters.contains_key(&format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{DocxEmitter, HtmlEmitter};

    fn manager() -> ExportManager {
        let mut manager = ExportManager::builder().build().unwrap();
        manager.register(HtmlEmitter::new()).unwrap();
        manager
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut manager = manager();
        let err = manager.register(HtmlEmitter::new()).unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_format_queries() {
        let mut manager = manager();
        manager.register(DocxEmitter::new()).unwrap();

        assert!(manager.supports_format("html"));
        assert!(manager.supports_format("DOCX"));
        assert!(!manager.supports_format("pdf"));
        assert!(!manager.supports_format("epub"));

        let ids: Vec<_> = manager.available_formats().iter().map(|f| f.id()).collect();
        assert_eq!(ids, ["docx", "html"]);
        assert_eq!(manager.format_info("html").unwrap().name, "HTML Document");
    }

    #[tokio::test]
    async fn test_unregistered_format_is_a_job_error() {
        let manager = manager();
        let err = manager
            .export_to_docx("<p>x</p>", "informe")
            .await
            .unwrap_err();

        match err {
            ExportError::Job { source, .. } => {
                assert!(matches!(*source, ExportError::UnsupportedFormat { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_options_rejected_at_build() {
        let options = ExportOptions {
            raster_scale: 0.0,
            ..ExportOptions::default()
        };
        assert!(ExportManager::builder().options(options).build().is_err());
    }

    #[tokio::test]
    async fn test_export_to_html_reports_success() {
        let manager = manager();
        let report = manager
            .export_to_html("<h1>Hi</h1><p>there</p>", "")
            .await
            .unwrap();

        assert_eq!(report.filename, "document.html");
        assert_eq!(report.mime_type, "text/html");
        assert_eq!(report.saved_to, "memory:document.html");
        assert_eq!(report.images, 0);
        assert!(report.total_size > 0);
    }
}
