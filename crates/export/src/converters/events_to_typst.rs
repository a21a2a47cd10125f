//! Emission events to Typst markup, for the raster snapshot.
//!
//! Images are registered as in-memory files in the job's arena and
//! referenced by virtual path, so compiling the markup never touches the
//! network or the disk.

use crate::arena::RenderArena;
use crate::formats::heading_size;
use crate::model::{Alignment, TextRun};
use crate::typesetter::escape_typst;
use crate::walker::Event;

/// Points per CSS pixel.
pub const PT_PER_PX: f32 = 72.0 / 96.0;

/// Typst body markup generated from an event sequence.
#[derive(Debug, Clone, Default)]
pub struct TypstMarkup {
    pub body: String,
    /// Images left out because their bytes could not be turned into PNG.
    pub skipped_images: Vec<String>,
}

/// Converter from events to Typst markup.
pub struct EventsToTypstConverter<'a> {
    arena: &'a mut RenderArena,
    output: String,
    skipped_images: Vec<String>,
    image_count: usize,
}

enum Block {
    Heading(u8, Alignment),
    Paragraph(Alignment),
}

impl<'a> EventsToTypstConverter<'a> {
    pub fn new(arena: &'a mut RenderArena) -> Self {
        Self {
            arena,
            output: String::new(),
            skipped_images: Vec::new(),
            image_count: 0,
        }
    }

    /// Convert `events` into Typst markup.
    pub fn convert(mut self, events: &[Event]) -> TypstMarkup {
        let mut open: Option<Block> = None;
        let mut table: Option<TableState> = None;

        for event in events {
            match event {
                Event::BeginHeading { level, alignment } => {
                    open = Some(Block::Heading(*level, *alignment));
                }
                Event::BeginParagraph { alignment } => {
                    open = Some(Block::Paragraph(*alignment));
                }
                Event::Text(runs) => {
                    let content = runs_to_typst(runs);
                    match open.take() {
                        Some(Block::Heading(level, alignment)) => {
                            self.heading(level, alignment, &content)
                        }
                        Some(Block::Paragraph(alignment)) => self.paragraph(alignment, &content),
                        None => self.paragraph(Alignment::Left, &content),
                    }
                }
                Event::EndBlock => open = None,
                Event::BeginTable {
                    cols, header_rows, ..
                } => {
                    table = Some(TableState {
                        cols: *cols,
                        header_rows: header_rows.clone(),
                        cells: Vec::new(),
                    });
                }
                Event::TableCell { is_header, text } => {
                    if let Some(table) = table.as_mut() {
                        let text = escape_typst(text);
                        table.cells.push(if *is_header {
                            format!("[#strong[{}]]", text)
                        } else {
                            format!("[{}]", text)
                        });
                    }
                }
                Event::EndTable => {
                    if let Some(table) = table.take() {
                        self.table(table);
                    }
                }
                Event::Rule => {
                    self.output
                        .push_str("#line(length: 100%, stroke: 0.75pt + luma(128))\n\n");
                }
                Event::EmbeddedImage {
                    image,
                    width,
                    height,
                } => match image.png() {
                    Ok(png) => {
                        let path = self
                            .arena
                            .add_file(&format!("images/{}.png", self.image_count), png);
                        self.image_count += 1;
                        self.output.push_str(&format!(
                            "#image(\"{}\", width: {:.2}pt, height: {:.2}pt, fit: \"stretch\")\n\n",
                            path,
                            *width as f32 * PT_PER_PX,
                            *height as f32 * PT_PER_PX,
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Skipping image '{}' in raster snapshot: {}",
                            image.original_uri,
                            e
                        );
                        self.skipped_images.push(image.original_uri.clone());
                    }
                },
            }
        }

        TypstMarkup {
            body: self.output,
            skipped_images: self.skipped_images,
        }
    }

    fn heading(&mut self, level: u8, alignment: Alignment, content: &str) {
        let size = heading_size(level) as f32 / 2.0;
        let text = format!(
            "#block(above: 1.2em, below: 0.6em)[#text(size: {}pt, weight: \"bold\")[{}]]",
            size, content
        );
        self.output.push_str(&aligned(alignment, &text));
        self.output.push_str("\n\n");
    }

    fn paragraph(&mut self, alignment: Alignment, content: &str) {
        if content.is_empty() {
            self.output.push_str("#v(1em)\n\n");
            return;
        }
        let text = format!("#block[{}]", content);
        self.output.push_str(&aligned(alignment, &text));
        self.output.push_str("\n\n");
    }

    fn table(&mut self, table: TableState) {
        if table.cols == 0 {
            return;
        }

        let header_rows: Vec<String> = table
            .header_rows
            .iter()
            .enumerate()
            .filter(|(_, is_header)| **is_header)
            .map(|(row, _)| format!("{},", row))
            .collect();

        self.output.push_str("#table(\n");
        self.output.push_str(&format!("  columns: {},\n", table.cols));
        self.output.push_str("  stroke: 0.5pt + black,\n");
        self.output.push_str("  inset: 5pt,\n");
        self.output.push_str(&format!(
            "  fill: (x, y) => if ({}).contains(y) {{ rgb(\"#d9d9d9\") }},\n",
            header_rows.join(" ")
        ));
        for row in table.cells.chunks(table.cols) {
            self.output.push_str("  ");
            self.output.push_str(&row.join(", "));
            self.output.push_str(",\n");
        }
        self.output.push_str(")\n\n");
    }
}

struct TableState {
    cols: usize,
    header_rows: Vec<bool>,
    cells: Vec<String>,
}

fn aligned(alignment: Alignment, content: &str) -> String {
    match alignment {
        Alignment::Left => content.to_string(),
        Alignment::Center => format!("#align(center)[{}]", content),
        Alignment::Right => format!("#align(right)[{}]", content),
        Alignment::Justify => format!("#par(justify: true)[{}]", content),
    }
}

/// Styled runs as Typst content.
pub fn runs_to_typst(runs: &[TextRun]) -> String {
    let mut out = String::new();
    for run in runs {
        let mut text = escape_typst(&run.text);
        if run.underline {
            text = format!("#underline[{}]", text);
        }
        if run.italic {
            text = format!("#emph[{}]", text);
        }
        if run.bold {
            text = format!("#strong[{}]", text);
        }
        out.push_str(&text);
        if run.bold || run.italic || run.underline {
            // Ends the embedded call so following text cannot extend it.
            out.push(';');
        }
    }
    out
}
