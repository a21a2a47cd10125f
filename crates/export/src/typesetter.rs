//! In-memory typst compilation.
//!
//! The raster emitter and the placeholder painter both lay out text with
//! typst. Sources and images live in memory only; the world never reads from
//! disk or the network.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::layout::PagedDocument;
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};

use crate::error::{ExportError, Result};

/// Fonts plus the compiler entry point. Immutable once built, so one
/// instance is shared by every job.
pub struct Typesetter {
    font_book: LazyHash<FontBook>,
    fonts: Vec<Font>,
}

impl Typesetter {
    /// Create a typesetter with the fonts bundled by `typst-assets`.
    pub fn new() -> Self {
        let mut font_book = FontBook::new();
        let fonts: Vec<Font> = typst_assets::fonts()
            .filter_map(|data| Font::new(Bytes::new(data), 0))
            .collect();

        for font in &fonts {
            font_book.push(font.info().clone());
        }

        tracing::debug!("Typesetter loaded {} fonts", fonts.len());

        Self {
            font_book: LazyHash::new(font_book),
            fonts,
        }
    }

    /// Compile `markup` into a paged document.
    ///
    /// `files` maps virtual paths (e.g. `/images/0.png`) to their bytes.
    pub fn compile(&self, markup: String, files: &HashMap<String, Bytes>) -> Result<PagedDocument> {
        let world = TypstWorld::new(markup, self.font_book.clone(), self.fonts.clone(), files);

        let warned = typst::compile::<PagedDocument>(&world);
        for warning in &warned.warnings {
            tracing::warn!("Typst warning: {}", warning.message);
        }

        warned.output.map_err(|errors| {
            let error_msg = errors
                .iter()
                .map(|e| e.message.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::error!("Typst compilation errors: {}", error_msg);
            ExportError::rendering(format!("Typst compilation failed: {}", error_msg))
        })
    }

    /// Export a compiled document to PDF bytes.
    pub fn pdf(&self, document: &PagedDocument) -> Result<Vec<u8>> {
        typst_pdf::pdf(document, &typst_pdf::PdfOptions::default()).map_err(|errors| {
            let error_msg = errors
                .iter()
                .map(|e| e.message.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            ExportError::packaging(format!("PDF generation failed: {}", error_msg))
        })
    }
}

impl Default for Typesetter {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal typst world over in-memory sources and files.
struct TypstWorld {
    main_id: FileId,
    main: Source,
    library: LazyHash<Library>,
    font_book: LazyHash<FontBook>,
    fonts: Vec<Font>,
    files: HashMap<FileId, Bytes>,
}

impl TypstWorld {
    fn new(
        content: String,
        font_book: LazyHash<FontBook>,
        fonts: Vec<Font>,
        files: &HashMap<String, Bytes>,
    ) -> Self {
        let main_id = FileId::new(None, VirtualPath::new("main.typ"));
        let main = Source::new(main_id, content);

        let files = files
            .iter()
            .map(|(path, bytes)| (FileId::new(None, VirtualPath::new(path)), bytes.clone()))
            .collect();

        Self {
            main_id,
            main,
            library: LazyHash::new(Library::builder().build()),
            font_book,
            fonts,
            files,
        }
    }
}

impl World for TypstWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.font_book
    }

    fn main(&self) -> FileId {
        self.main_id
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main_id {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        self.files
            .get(&id)
            .cloned()
            .ok_or_else(|| FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(now.year(), now.month() as u8, now.day() as u8)
    }
}

/// Escape text for safe use in typst markup.
///
/// Besides the markup sigils this also escapes characters that start list
/// items, headings, comments or typographic shorthands, so text always
/// renders literally.
pub fn escape_typst(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '#'
                | '@'
                | '<'
                | '>'
                | '['
                | ']'
                | '{'
                | '}'
                | '$'
                | '_'
                | '*'
                | '`'
                | '~'
                | '-'
                | '+'
                | '='
                | '/'
                | '\''
                | '"'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape text for a typst string literal.
pub fn escape_typst_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_typst() {
        assert_eq!(escape_typst("Hello #world"), "Hello \\#world");
        assert_eq!(escape_typst("Test [brackets]"), "Test \\[brackets\\]");
        assert_eq!(escape_typst("Math $x = 1$"), "Math \\$x \\= 1\\$");
        assert_eq!(escape_typst("- not a list"), "\\- not a list");
        assert_eq!(escape_typst("http://x"), "http:\\/\\/x");
    }

    #[test]
    fn test_escape_typst_string() {
        assert_eq!(escape_typst_string(r#"a "b" \c"#), r#"a \"b\" \\c"#);
    }

    #[test]
    fn test_compile_simple_document() {
        let typesetter = Typesetter::new();
        let document = typesetter
            .compile("= Hello\n\nWorld".to_string(), &HashMap::new())
            .unwrap();
        assert_eq!(document.pages.len(), 1);

        let pdf = typesetter.pdf(&document).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_compile_error_is_rendering_failure() {
        let typesetter = Typesetter::new();
        let err = typesetter
            .compile("#image(\"/missing.png\")".to_string(), &HashMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Rendering);
    }
}
