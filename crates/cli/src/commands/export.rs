use eyre::{Result, WrapErr};
use folio_export::{
    ArtifactSink, DirectorySink, ExportManager, ExportOptions, ExportReport, MemorySink,
    ProgressIndicator, TargetFormat,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use url::Url;

use crate::config::Config;

/// Arguments of `folio export`.
#[derive(Debug)]
pub struct ExportRequest {
    pub format: TargetFormat,
    pub input: String,
    pub output: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub base_url: Option<Url>,
    pub dry_run: bool,
}

/// Prints job progress to stderr.
struct ConsoleIndicator;

impl ProgressIndicator for ConsoleIndicator {
    fn show(&self, _job_id: &str, label: &str) {
        eprintln!("⏳ {}...", label);
    }

    fn hide(&self, job_id: &str) {
        tracing::debug!("Job {} finished", job_id);
    }
}

pub async fn handle_export_command(request: ExportRequest, config: &Config) -> Result<()> {
    let source = read_input(&request.input).await?;
    let name = output_name(&request);

    let mut options = config.export_options();
    if let Some(base_url) = &request.base_url {
        options.base_url = Some(base_url.to_string());
    }

    let out_dir = request
        .out_dir
        .clone()
        .or_else(|| config.export.output_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    if request.dry_run {
        println!("Would export {} to {}", request.input, request.format);
        println!("  Output dir: {}", out_dir.display());
        let sink = Arc::new(MemorySink::new());
        let report = run_export(&request, &source, &name, options, sink).await?;
        print_report(&report);
        return Ok(());
    }

    let sink = Arc::new(DirectorySink::new(&out_dir));
    let report = run_export(&request, &source, &name, options, sink).await?;
    println!("✅ Successfully exported to: {}", report.saved_to);
    print_report(&report);
    Ok(())
}

async fn run_export(
    request: &ExportRequest,
    source: &str,
    name: &str,
    options: ExportOptions,
    sink: Arc<dyn ArtifactSink>,
) -> Result<ExportReport> {
    let manager = build_manager(sink, options)?;

    match request.format {
        TargetFormat::Pdf => {
            let tree = folio_export::parse_html(source);
            manager.export_to_pdf(&tree, name).await
        }
        TargetFormat::Docx => manager.export_to_docx(source, name).await,
        TargetFormat::Html => manager.export_to_html(source, name).await,
    }
    .map_err(|e| {
        eprintln!("❌ Export failed: {}", e);
        e.into()
    })
}

fn build_manager(sink: Arc<dyn ArtifactSink>, options: ExportOptions) -> Result<ExportManager> {
    let mut manager = ExportManager::builder()
        .sink(sink)
        .indicator(Arc::new(ConsoleIndicator))
        .options(options)
        .build()?;
    manager.register(folio_export::RasterEmitter::with_typesetter(
        manager.typesetter(),
    ))?;
    manager.register(folio_export::DocxEmitter::new())?;
    manager.register(folio_export::HtmlEmitter::new())?;
    Ok(manager)
}

fn print_report(report: &ExportReport) {
    println!("  📄 File: {} ({})", report.filename, report.mime_type);
    println!("  📁 File size: {} bytes", report.total_size);
    println!(
        "  🖼️  Images: {} ({} placeholders)",
        report.images, report.placeholders
    );
    println!(
        "  ⏱️  Export time: {}ms",
        report.export_duration.num_milliseconds()
    );
    for warning in &report.warnings {
        println!("  ⚠️  {}", warning);
    }
}

async fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut source = String::new();
        tokio::io::stdin()
            .read_to_string(&mut source)
            .await
            .wrap_err("Failed to read stdin")?;
        return Ok(source);
    }

    tokio::fs::read_to_string(input)
        .await
        .wrap_err_with(|| format!("Failed to read {}", input))
}

/// `--output`, else the input file stem, else empty (the manager's default).
fn output_name(request: &ExportRequest) -> String {
    if let Some(output) = &request.output {
        return output.clone();
    }
    if request.input == "-" {
        return String::new();
    }
    Path::new(&request.input)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(format: TargetFormat, input: &str) -> ExportRequest {
        ExportRequest {
            format,
            input: input.to_string(),
            output: None,
            out_dir: None,
            base_url: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name(&request(TargetFormat::Pdf, "docs/report.html")), "report");
        assert_eq!(output_name(&request(TargetFormat::Pdf, "-")), "");

        let mut named = request(TargetFormat::Pdf, "docs/report.html");
        named.output = Some("final".to_string());
        assert_eq!(output_name(&named), "final");
    }

    #[tokio::test]
    async fn test_export_writes_into_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.html");
        tokio::fs::write(&input, "<h1>Notes</h1><p>Body</p>")
            .await
            .unwrap();

        let out_dir = dir.path().join("out");
        let mut req = request(TargetFormat::Html, &input.to_string_lossy());
        req.out_dir = Some(out_dir.clone());

        handle_export_command(req, &Config::default()).await.unwrap();

        let html = tokio::fs::read_to_string(out_dir.join("notes.html"))
            .await
            .unwrap();
        assert!(html.contains("<h1>Notes</h1>"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.html");
        tokio::fs::write(&input, "<p>Body</p>").await.unwrap();

        let out_dir = dir.path().join("out");
        let mut req = request(TargetFormat::Docx, &input.to_string_lossy());
        req.out_dir = Some(out_dir.clone());
        req.dry_run = true;

        handle_export_command(req, &Config::default()).await.unwrap();
        assert!(!out_dir.exists());
    }

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let req = request(TargetFormat::Html, "/definitely/not/here.html");
        assert!(handle_export_command(req, &Config::default()).await.is_err());
    }
}
