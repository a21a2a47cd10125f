//! Single traversal of the content tree into format-independent events.
//!
//! Every emitter consumes the same event sequence, so traversal order, text
//! sanitization, table header detection and image sizing are decided here
//! exactly once.

use std::sync::Arc;

use crate::model::{Alignment, Cell, ContentNode, TextRun};
use crate::resolver::{ResolvedImage, ResolvedImages};
use crate::sanitize::sanitize_text;
use crate::types::ExportOptions;

/// One normalized instruction describing a piece of output content.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BeginHeading {
        level: u8,
        alignment: Alignment,
    },
    BeginParagraph {
        alignment: Alignment,
    },
    /// Sanitized runs of the block opened by the last `Begin*` event.
    Text(Vec<TextRun>),
    /// Closes a heading or paragraph.
    EndBlock,
    /// Opens a table; exactly `rows * cols` `TableCell` events follow, row by row.
    BeginTable {
        rows: usize,
        cols: usize,
        /// Per row: composed entirely of header cells.
        header_rows: Vec<bool>,
    },
    TableCell {
        is_header: bool,
        text: String,
    },
    EndTable,
    Rule,
    EmbeddedImage {
        image: Arc<ResolvedImage>,
        width: u32,
        height: u32,
    },
}

/// Walk `tree` in document order and produce its event sequence.
///
/// `images` must come from resolving the same tree: image nodes are matched
/// to their resolution by document-order ordinal.
pub fn walk(tree: &ContentNode, images: &ResolvedImages, options: &ExportOptions) -> Vec<Event> {
    let mut walker = Walker {
        images,
        max_width: options.max_image_width,
        next_image: 0,
        events: Vec::new(),
    };
    walker.visit(tree);
    walker.events
}

struct Walker<'a> {
    images: &'a ResolvedImages,
    max_width: u32,
    next_image: usize,
    events: Vec<Event>,
}

impl Walker<'_> {
    fn visit(&mut self, node: &ContentNode) {
        match node {
            ContentNode::Heading {
                level,
                alignment,
                runs,
            } => {
                self.events.push(Event::BeginHeading {
                    level: (*level).clamp(1, 6),
                    alignment: *alignment,
                });
                self.text(runs);
            }
            ContentNode::Paragraph { alignment, runs } => {
                self.events.push(Event::BeginParagraph {
                    alignment: *alignment,
                });
                self.text(runs);
            }
            ContentNode::Table { rows } => self.table(rows),
            ContentNode::Image { width, height, .. } => {
                let ordinal = self.next_image;
                self.next_image += 1;

                let Some(image) = self.images.get(ordinal) else {
                    tracing::warn!("No resolution for image #{}, skipping it", ordinal);
                    return;
                };
                let (width, height) = fit_image(
                    *width,
                    *height,
                    (image.width, image.height),
                    self.max_width,
                );
                self.events.push(Event::EmbeddedImage {
                    image: Arc::clone(image),
                    width,
                    height,
                });
            }
            ContentNode::HorizontalRule => self.events.push(Event::Rule),
            ContentNode::GenericContainer { children } => {
                for child in children {
                    self.visit(child);
                }
            }
        }
    }

    fn text(&mut self, runs: &[TextRun]) {
        let runs: Vec<TextRun> = runs
            .iter()
            .map(|run| TextRun {
                text: sanitize_text(&run.text),
                ..run.clone()
            })
            .filter(|run| !run.text.is_empty())
            .collect();
        self.events.push(Event::Text(runs));
        self.events.push(Event::EndBlock);
    }

    fn table(&mut self, rows: &[Vec<Cell>]) {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let header_rows = detect_header_rows(rows);

        self.events.push(Event::BeginTable {
            rows: rows.len(),
            cols,
            header_rows,
        });
        for row in rows {
            for cell in row {
                self.events.push(Event::TableCell {
                    is_header: cell.is_header,
                    text: sanitize_text(&cell.text),
                });
            }
            for _ in row.len()..cols {
                self.events.push(Event::TableCell {
                    is_header: false,
                    text: String::new(),
                });
            }
        }
        self.events.push(Event::EndTable);
    }
}

/// Rows made up entirely of header cells.
pub fn detect_header_rows(rows: &[Vec<Cell>]) -> Vec<bool> {
    rows.iter()
        .map(|row| !row.is_empty() && row.iter().all(|cell| cell.is_header))
        .collect()
}

/// Longest side, in pixels, any embedded image is laid out or encoded at.
pub const MAX_IMAGE_DIMENSION: u32 = 10_000;

/// Target size for an image, always preserving the natural aspect ratio
/// unless both dimensions are declared, then clamping the width to
/// `max_width` and the height to [`MAX_IMAGE_DIMENSION`], the other side
/// scaled to match.
pub fn fit_image(
    declared_width: Option<u32>,
    declared_height: Option<u32>,
    natural: (u32, u32),
    max_width: u32,
) -> (u32, u32) {
    let natural_width = natural.0.max(1) as f64;
    let natural_height = natural.1.max(1) as f64;

    let (width, height) = match (declared_width, declared_height) {
        (Some(w), Some(h)) => (w as f64, h as f64),
        (Some(w), None) => (w as f64, w as f64 * natural_height / natural_width),
        (None, Some(h)) => (h as f64 * natural_width / natural_height, h as f64),
        (None, None) => (natural_width, natural_height),
    };

    let max_width = max_width.max(1) as f64;
    let (width, height) = if width > max_width {
        (max_width, height * max_width / width)
    } else {
        (width, height)
    };

    let max_height = MAX_IMAGE_DIMENSION as f64;
    let (width, height) = if height > max_height {
        (width * max_height / height, max_height)
    } else {
        (width, height)
    };

    (
        (width.round() as u32).max(1),
        (height.round() as u32).max(1),
    )
}

/// Concatenated text of the text blocks and table cells in `events`.
pub fn plain_text(events: &[Event]) -> String {
    let mut out = String::new();
    for event in events {
        match event {
            Event::Text(runs) => out.extend(runs.iter().map(|r| r.text.as_str())),
            Event::TableCell { text, .. } => out.push_str(text),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk_plain(tree: &ContentNode) -> Vec<Event> {
        walk(tree, &ResolvedImages::default(), &ExportOptions::default())
    }

    #[test]
    fn test_document_order_and_block_framing() {
        let tree = ContentNode::document(vec![
            ContentNode::heading(1, vec![TextRun::plain("Title")]),
            ContentNode::GenericContainer {
                children: vec![ContentNode::paragraph("Body")],
            },
            ContentNode::HorizontalRule,
        ]);

        assert_eq!(
            walk_plain(&tree),
            vec![
                Event::BeginHeading {
                    level: 1,
                    alignment: Alignment::Left,
                },
                Event::Text(vec![TextRun::plain("Title")]),
                Event::EndBlock,
                Event::BeginParagraph {
                    alignment: Alignment::Left,
                },
                Event::Text(vec![TextRun::plain("Body")]),
                Event::EndBlock,
                Event::Rule,
            ]
        );
    }

    #[test]
    fn test_text_is_sanitized() {
        let tree = ContentNode::document(vec![ContentNode::Paragraph {
            alignment: Alignment::Justify,
            runs: vec![
                TextRun::plain("a\u{0}b\nc"),
                TextRun::plain("\u{7}").bold(),
            ],
        }]);

        let events = walk_plain(&tree);
        assert_eq!(events[1], Event::Text(vec![TextRun::plain("ab c")]));
        assert_eq!(plain_text(&events), "ab c");
    }

    #[test]
    fn test_table_header_prepass_and_padding() {
        let rows = vec![
            vec![Cell::header("A"), Cell::header("B")],
            vec![Cell::data("1")],
            vec![Cell::header("x"), Cell::data("y")],
        ];
        let tree = ContentNode::document(vec![ContentNode::Table { rows }]);

        let events = walk_plain(&tree);
        assert_eq!(
            events[0],
            Event::BeginTable {
                rows: 3,
                cols: 2,
                header_rows: vec![true, false, false],
            }
        );
        let cells = events
            .iter()
            .filter(|e| matches!(e, Event::TableCell { .. }))
            .count();
        assert_eq!(cells, 6);
        assert_eq!(
            events[4],
            Event::TableCell {
                is_header: false,
                text: String::new(),
            }
        );
        assert_eq!(events.last(), Some(&Event::EndTable));
    }

    #[test]
    fn test_empty_rows_are_not_header_rows() {
        assert_eq!(detect_header_rows(&[vec![]]), vec![false]);
    }

    #[test]
    fn test_fit_image_preserves_aspect_ratio() {
        assert_eq!(fit_image(None, None, (300, 150), 500), (300, 150));
        assert_eq!(fit_image(None, None, (1000, 500), 500), (500, 250));
        assert_eq!(fit_image(Some(100), None, (400, 200), 500), (100, 50));
        assert_eq!(fit_image(None, Some(50), (400, 200), 500), (100, 50));
        assert_eq!(fit_image(Some(800), Some(200), (10, 10), 500), (500, 125));
        assert_eq!(fit_image(Some(200), Some(100), (200, 100), 500), (200, 100));
    }

    #[test]
    fn test_fit_image_caps_height() {
        assert_eq!(fit_image(Some(10), Some(500_000), (10, 10), 500), (1, 10_000));
        assert_eq!(fit_image(None, None, (400, 40_000), 500), (100, 10_000));
        assert_eq!(
            fit_image(Some(u32::MAX), Some(u32::MAX), (1, 1), 500),
            (500, 500)
        );
    }

    #[test]
    fn test_missing_resolution_skips_image() {
        let tree = ContentNode::document(vec![ContentNode::image("x.png", None, None)]);
        assert!(walk_plain(&tree).is_empty());
    }

    #[test]
    fn test_empty_tree_yields_no_events() {
        assert!(walk_plain(&ContentNode::document(vec![])).is_empty());
    }
}
