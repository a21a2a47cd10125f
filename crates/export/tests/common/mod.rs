//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use folio_export::resolver::ResolveError;
use folio_export::{
    ArtifactSink, EmittedArtifact, ExportManager, ExportOptions, ImageFetcher, MemorySink,
    ProgressIndicator, export_manager_with_options,
};
use url::Url;

/// Fails every lookup and counts how often it was asked.
#[derive(Default)]
pub struct FailingFetcher {
    calls: AtomicUsize,
}

impl FailingFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for FailingFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ResolveError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
        })
    }
}

/// Records indicator calls.
#[derive(Default)]
pub struct RecordingIndicator {
    pub shown: AtomicUsize,
    pub hidden: AtomicUsize,
}

impl ProgressIndicator for RecordingIndicator {
    fn show(&self, _job_id: &str, _label: &str) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self, _job_id: &str) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}

/// Refuses every artifact.
pub struct FailingSink;

#[async_trait]
impl ArtifactSink for FailingSink {
    async fn save(&self, _artifact: &EmittedArtifact) -> std::io::Result<String> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only destination",
        ))
    }
}

pub struct Harness {
    pub manager: ExportManager,
    pub sink: Arc<MemorySink>,
    pub fetcher: Arc<FailingFetcher>,
    pub indicator: Arc<RecordingIndicator>,
}

/// A manager with all emitters, an in-memory sink and a fetcher that
/// always fails.
pub fn harness() -> Harness {
    let sink = Arc::new(MemorySink::new());
    let fetcher = Arc::new(FailingFetcher::default());
    let indicator = Arc::new(RecordingIndicator::default());

    let mut manager = ExportManager::builder()
        .sink(sink.clone())
        .fetcher(fetcher.clone())
        .indicator(indicator.clone())
        .build()
        .unwrap();
    manager
        .register(folio_export::RasterEmitter::with_typesetter(manager.typesetter()))
        .unwrap();
    manager.register(folio_export::DocxEmitter::new()).unwrap();
    manager.register(folio_export::HtmlEmitter::new()).unwrap();

    Harness {
        manager,
        sink,
        fetcher,
        indicator,
    }
}

/// A default manager writing into a failing sink.
pub fn failing_sink_manager() -> ExportManager {
    export_manager_with_options(Arc::new(FailingSink), ExportOptions::default()).unwrap()
}

pub fn zip_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    out
}

pub fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// `word/document.xml` of a packaged DOCX.
pub fn document_xml(bytes: &[u8]) -> String {
    String::from_utf8(zip_entry(bytes, "word/document.xml")).unwrap()
}

/// Concatenated contents of all `<w:t>` elements, in order.
pub fn docx_text(xml: &str) -> String {
    let mut out = String::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<w:t") {
        rest = &rest[start + 4..];
        // Skip `<w:tbl`, `<w:tc` and friends.
        if !rest.starts_with('>') && !rest.starts_with(' ') {
            continue;
        }
        let Some(open_end) = rest.find('>') else { break };
        if rest[..open_end].ends_with('/') {
            rest = &rest[open_end + 1..];
            continue;
        }
        rest = &rest[open_end + 1..];
        let Some(close) = rest.find("</w:t>") else { break };
        out.push_str(&rest[..close]);
        rest = &rest[close..];
    }
    out
}

/// Values of every `<w:sz w:val="..">` in order.
pub fn run_sizes(xml: &str) -> Vec<usize> {
    xml.match_indices("<w:sz w:val=\"")
        .filter_map(|(index, pattern)| {
            let value = &xml[index + pattern.len()..];
            value[..value.find('"')?].parse().ok()
        })
        .collect()
}

pub fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}
