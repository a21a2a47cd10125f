//! DOCX export format implementation.
//!
//! Events are first folded into an ordered block list, which is then
//! packaged with `docx-rs` on a US Letter page with one-inch margins.

use std::io::Cursor;

use async_trait::async_trait;
use docx_rs::{
    AlignmentType, BorderType, Docx, PageMargin, Paragraph, ParagraphBorder,
    ParagraphBorderPosition, ParagraphBorders, Pic, Run, ShdType, Shading, Style, StyleType, Table, TableCell,
    TableCellBorder, TableCellBorderPosition, TableRow,
};

use crate::arena::RenderArena;
use crate::error::{ExportError, Result};
use crate::formats::heading_size;
use crate::model::{Alignment, TextRun};
use crate::resolver::encode_png;
use crate::traits::{Emission, Emitter};
use crate::types::{ExportOptions, FormatInfo, TargetFormat};
use crate::walker::Event;

/// US Letter, in twips.
const PAGE_WIDTH: u32 = 12_240;
const PAGE_HEIGHT: u32 = 15_840;
/// One inch, in twips.
const MARGIN: i32 = 1_440;
/// English Metric Units per CSS pixel.
pub const EMU_PER_PX: u32 = 9_525;
const HEADER_FILL: &str = "D9D9D9";
const BORDER_COLOR: &str = "000000";
/// Eighths of a point.
const CELL_BORDER_SIZE: usize = 4;
const RULE_BORDER_SIZE: usize = 6;

/// One block of the structured document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        alignment: Alignment,
        runs: Vec<TextRun>,
    },
    Paragraph {
        alignment: Alignment,
        runs: Vec<TextRun>,
    },
    /// Empty paragraph framing an image.
    Spacer,
    Image {
        png: Vec<u8>,
        width: u32,
        height: u32,
    },
    Table {
        cols: usize,
        header_rows: Vec<bool>,
        cells: Vec<(bool, String)>,
    },
    Rule,
}

/// DOCX format emitter.
pub struct DocxEmitter;

impl DocxEmitter {
    /// Create new DOCX emitter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Emitter for DocxEmitter {
    fn format_info(&self) -> FormatInfo {
        FormatInfo::new(TargetFormat::Docx, "Word Document")
    }

    async fn emit(
        &self,
        events: &[Event],
        title: &str,
        _arena: &mut RenderArena,
        options: &ExportOptions,
    ) -> Result<Emission> {
        let blocks = build_blocks(events, options.max_image_width);
        tracing::debug!("Packaging '{}' as DOCX with {} blocks", title, blocks.len());

        let bytes = package(&blocks)?;
        Ok(Emission::new(bytes))
    }
}

/// Fold the event sequence into blocks.
///
/// An image whose pixels cannot be converted to PNG is logged and left out
/// together with its spacers; the rest of the document is unaffected.
pub fn build_blocks(events: &[Event], max_width: u32) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut open: Option<Block> = None;
    let mut table: Option<Block> = None;

    for event in events {
        match event {
            Event::BeginHeading { level, alignment } => {
                open = Some(Block::Heading {
                    level: *level,
                    alignment: *alignment,
                    runs: Vec::new(),
                });
            }
            Event::BeginParagraph { alignment } => {
                open = Some(Block::Paragraph {
                    alignment: *alignment,
                    runs: Vec::new(),
                });
            }
            Event::Text(text) => match open.as_mut() {
                Some(Block::Heading { runs, .. }) | Some(Block::Paragraph { runs, .. }) => {
                    runs.extend(text.iter().cloned());
                }
                _ => {}
            },
            Event::EndBlock => blocks.extend(open.take()),
            Event::BeginTable {
                cols, header_rows, ..
            } => {
                table = Some(Block::Table {
                    cols: *cols,
                    header_rows: header_rows.clone(),
                    cells: Vec::new(),
                });
            }
            Event::TableCell { is_header, text } => {
                if let Some(Block::Table { cells, .. }) = table.as_mut() {
                    cells.push((*is_header, text.clone()));
                }
            }
            Event::EndTable => blocks.extend(table.take()),
            Event::Rule => blocks.push(Block::Rule),
            Event::EmbeddedImage {
                image,
                width,
                height,
            } => match encode_png(&image.data) {
                Ok((png, _, _)) => {
                    let (width, height) = clamp_width(*width, *height, max_width);
                    blocks.push(Block::Spacer);
                    blocks.push(Block::Image { png, width, height });
                    blocks.push(Block::Spacer);
                }
                Err(e) => {
                    tracing::warn!(
                        "Omitting image '{}' from DOCX: {}",
                        image.original_uri,
                        e
                    );
                }
            },
        }
    }

    blocks
}

/// Pixels to EMU, saturating at the largest extent OOXML can carry.
fn to_emu(px: u32) -> u32 {
    (px as u64 * EMU_PER_PX as u64).min(u32::MAX as u64) as u32
}

fn clamp_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let height = (height as u64 * max_width as u64 / width as u64) as u32;
    (max_width, height.max(1))
}

/// Package blocks into DOCX bytes.
pub fn package(blocks: &[Block]) -> Result<Vec<u8>> {
    let mut docx = Docx::new()
        .page_size(PAGE_WIDTH, PAGE_HEIGHT)
        .page_margin(
            PageMargin::new()
                .top(MARGIN)
                .bottom(MARGIN)
                .left(MARGIN)
                .right(MARGIN),
        );

    for level in 1..=6u8 {
        docx = docx.add_style(
            Style::new(&format!("Heading{}", level), StyleType::Paragraph)
                .name(&format!("Heading {}", level))
                .size(heading_size(level))
                .bold(),
        );
    }

    for block in blocks {
        docx = match block {
            Block::Heading {
                level,
                alignment,
                runs,
            } => {
                let size = heading_size(*level);
                let paragraph = runs.iter().fold(
                    Paragraph::new()
                        .style(&format!("Heading{}", level))
                        .align(alignment_type(*alignment)),
                    |paragraph, run| paragraph.add_run(styled_run(run).size(size).bold()),
                );
                docx.add_paragraph(paragraph)
            }
            Block::Paragraph { alignment, runs } => {
                let paragraph = runs.iter().fold(
                    Paragraph::new().align(alignment_type(*alignment)),
                    |paragraph, run| paragraph.add_run(styled_run(run)),
                );
                docx.add_paragraph(paragraph)
            }
            Block::Spacer => docx.add_paragraph(Paragraph::new()),
            Block::Image { png, width, height } => {
                let pic = Pic::new(png).size(to_emu(*width), to_emu(*height));
                docx.add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)))
            }
            Block::Table {
                cols,
                header_rows,
                cells,
            } => {
                if *cols == 0 {
                    docx
                } else {
                    docx.add_table(table(*cols, header_rows, cells))
                }
            }
            Block::Rule => docx.add_paragraph(
                Paragraph::new().set_borders(
                    ParagraphBorders::with_empty().set(
                        ParagraphBorder::new(ParagraphBorderPosition::Top)
                            .val(BorderType::Single)
                            .size(RULE_BORDER_SIZE)
                            .color(BORDER_COLOR),
                    ),
                ),
            ),
        };
    }

    let mut buffer = Vec::new();
    docx.build()
        .pack(&mut Cursor::new(&mut buffer))
        .map_err(|e| ExportError::packaging(format!("Failed to pack DOCX: {}", e)))?;

    Ok(buffer)
}

fn table(cols: usize, header_rows: &[bool], cells: &[(bool, String)]) -> Table {
    let rows = cells
        .chunks(cols)
        .enumerate()
        .map(|(index, row)| {
            let shaded = header_rows.get(index).copied().unwrap_or(false);
            TableRow::new(
                row.iter()
                    .map(|(is_header, text)| table_cell(*is_header, text, shaded))
                    .collect(),
            )
        })
        .collect();

    Table::new(rows)
}

fn table_cell(is_header: bool, text: &str, shaded: bool) -> TableCell {
    let mut run = Run::new().add_text(text);
    if is_header {
        run = run.bold();
    }

    let mut cell = TableCell::new().add_paragraph(Paragraph::new().add_run(run));
    for position in [
        TableCellBorderPosition::Top,
        TableCellBorderPosition::Left,
        TableCellBorderPosition::Bottom,
        TableCellBorderPosition::Right,
    ] {
        cell = cell.set_border(
            TableCellBorder::new(position)
                .border_type(BorderType::Single)
                .size(CELL_BORDER_SIZE)
                .color(BORDER_COLOR),
        );
    }

    if shaded {
        cell = cell.shading(Shading::new().shd_type(ShdType::Clear).fill(HEADER_FILL));
    }
    cell
}

fn styled_run(run: &TextRun) -> Run {
    let mut styled = Run::new().add_text(&run.text);
    if run.bold {
        styled = styled.bold();
    }
    if run.italic {
        styled = styled.italic();
    }
    if run.underline {
        styled = styled.underline("single");
    }
    styled
}

fn alignment_type(alignment: Alignment) -> AlignmentType {
    match alignment {
        Alignment::Left => AlignmentType::Left,
        Alignment::Center => AlignmentType::Center,
        Alignment::Right => AlignmentType::Right,
        Alignment::Justify => AlignmentType::Both,
    }
}
