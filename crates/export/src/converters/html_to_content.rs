//! HTML to content tree conversion.
//!
//! The editor hands the pipeline HTML. This module maps it onto the closed
//! [`ContentNode`] variant using the `scraper` crate. Elements without a
//! dedicated mapping become [`ContentNode::GenericContainer`] so their content
//! is still exported.

use scraper::{ElementRef, Html, Node};

use crate::model::{Alignment, Cell, ContentNode, TextRun};
use crate::walker::MAX_IMAGE_DIMENSION;

/// Inline styles inherited while descending through inline elements.
#[derive(Debug, Clone, Copy, Default)]
struct InlineStyle {
    bold: bool,
    italic: bool,
    underline: bool,
}

impl InlineStyle {
    /// Style for the content of an element named `name`.
    fn apply(mut self, name: &str) -> Self {
        match name {
            "strong" | "b" => self.bold = true,
            "em" | "i" => self.italic = true,
            "u" | "ins" => self.underline = true,
            _ => {}
        }
        self
    }

    fn run(&self, text: &str) -> TextRun {
        TextRun {
            text: text.to_string(),
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
        }
    }
}

/// Parse an HTML document or fragment into a content tree.
///
/// The returned root is always a [`ContentNode::GenericContainer`].
pub fn parse_html(html: &str) -> ContentNode {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "body")
        .unwrap_or(root);

    ContentNode::GenericContainer {
        children: convert_children(&body),
    }
}

/// Convert the children of a block container.
///
/// Loose inline content between blocks is gathered into implicit paragraphs.
fn convert_children(element: &ElementRef) -> Vec<ContentNode> {
    let mut nodes = Vec::new();
    let mut pending: Vec<TextRun> = Vec::new();

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                push_text(&mut pending, &text.text, InlineStyle::default());
            }
            Node::Element(_) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child_ref.value().name();
                if is_skipped(name) {
                    continue;
                }
                if is_inline(name) {
                    if name == "br" {
                        push_text(&mut pending, " ", InlineStyle::default());
                        continue;
                    }
                    let mut images = Vec::new();
                    let style = InlineStyle::default().apply(name);
                    collect_inline(&child_ref, style, &mut pending, &mut images);
                    if !images.is_empty() {
                        flush_implicit(&mut pending, &mut nodes);
                        nodes.extend(images);
                    }
                    continue;
                }

                flush_implicit(&mut pending, &mut nodes);
                nodes.extend(convert_block(&child_ref));
            }
            _ => {}
        }
    }

    flush_implicit(&mut pending, &mut nodes);
    nodes
}

/// Convert one block-level element. Images nested inside a text block are
/// lifted out as sibling nodes, so this can yield several nodes.
fn convert_block(element: &ElementRef) -> Vec<ContentNode> {
    let name = element.value().name();
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = heading_level(name);
            let alignment = element_alignment(element);
            convert_text_block(element, |runs| ContentNode::Heading {
                level,
                alignment,
                runs,
            })
        }
        "p" => {
            let alignment = element_alignment(element);
            convert_text_block(element, |runs| ContentNode::Paragraph { alignment, runs })
        }
        "table" => vec![convert_table(element)],
        "img" => vec![convert_image(element)],
        "hr" => vec![ContentNode::HorizontalRule],
        _ => vec![ContentNode::GenericContainer {
            children: convert_children(element),
        }],
    }
}

fn convert_text_block<F>(element: &ElementRef, make: F) -> Vec<ContentNode>
where
    F: Fn(Vec<TextRun>) -> ContentNode,
{
    let mut runs = Vec::new();
    let mut images = Vec::new();
    collect_inline(element, InlineStyle::default(), &mut runs, &mut images);
    let runs = finish_runs(runs);

    if images.is_empty() {
        return vec![make(runs)];
    }

    let mut nodes = Vec::with_capacity(images.len() + 1);
    if !runs.is_empty() {
        nodes.push(make(runs));
    }
    nodes.extend(images);
    nodes
}

/// Gather text runs below `element`, applying inline styles on the way down.
fn collect_inline(
    element: &ElementRef,
    style: InlineStyle,
    runs: &mut Vec<TextRun>,
    images: &mut Vec<ContentNode>,
) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_text(runs, &text.text, style),
            Node::Element(_) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child_ref.value().name();
                if is_skipped(name) {
                    continue;
                }

                match name {
                    "br" => push_text(runs, " ", style),
                    "img" => images.push(convert_image(&child_ref)),
                    _ => collect_inline(&child_ref, style.apply(name), runs, images),
                }
            }
            _ => {}
        }
    }
}

fn convert_table(element: &ElementRef) -> ContentNode {
    let mut rows = Vec::new();

    for child in element.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(convert_row(&child)),
            "thead" | "tbody" | "tfoot" => {
                for row in child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr")
                {
                    rows.push(convert_row(&row));
                }
            }
            _ => {}
        }
    }

    ContentNode::Table { rows }
}

fn convert_row(row: &ElementRef) -> Vec<Cell> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter_map(|cell| {
            let is_header = match cell.value().name() {
                "th" => true,
                "td" => false,
                _ => return None,
            };
            let raw: String = cell.text().collect();
            Some(Cell {
                is_header,
                text: collapse_whitespace(&raw).trim().to_string(),
            })
        })
        .collect()
}

fn convert_image(element: &ElementRef) -> ContentNode {
    let value = element.value();
    let style = value.attr("style").unwrap_or_default();
    ContentNode::Image {
        source: value.attr("src").unwrap_or_default().trim().to_string(),
        width: value
            .attr("width")
            .and_then(parse_dimension)
            .or_else(|| style_property(style, "width").and_then(parse_dimension)),
        height: value
            .attr("height")
            .and_then(parse_dimension)
            .or_else(|| style_property(style, "height").and_then(parse_dimension)),
    }
}

fn heading_level(name: &str) -> u8 {
    name.chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .map(|d| d as u8)
        .unwrap_or(1)
        .clamp(1, 6)
}

fn element_alignment(element: &ElementRef) -> Alignment {
    let value = element.value();
    if let Some(align) = value
        .attr("style")
        .and_then(|style| style_property(style, "text-align"))
    {
        return Alignment::parse(align);
    }
    value.attr("align").map(Alignment::parse).unwrap_or_default()
}

/// Look up one declaration in an inline `style` attribute.
fn style_property<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    style.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(property)
            .then(|| value.trim())
    })
}

/// Parse `"200"`, `"200px"` or `"200.4"` into whole layout units, capped at
/// [`MAX_IMAGE_DIMENSION`].
fn parse_dimension(value: &str) -> Option<u32> {
    let number = value.trim().trim_end_matches("px").trim();
    let parsed: f64 = number.parse().ok()?;
    (parsed.is_finite() && parsed >= 1.0)
        .then(|| parsed.min(MAX_IMAGE_DIMENSION as f64).round() as u32)
}

fn is_skipped(name: &str) -> bool {
    matches!(
        name,
        "script" | "style" | "head" | "template" | "noscript" | "title" | "meta" | "link"
    )
}

fn is_inline(name: &str) -> bool {
    matches!(
        name,
        "a" | "abbr"
            | "b"
            | "br"
            | "cite"
            | "code"
            | "em"
            | "font"
            | "i"
            | "ins"
            | "kbd"
            | "label"
            | "mark"
            | "q"
            | "s"
            | "small"
            | "span"
            | "strike"
            | "strong"
            | "sub"
            | "sup"
            | "u"
    )
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out
}

/// Append text to `runs`, collapsing whitespace across run boundaries and
/// merging with the previous run when the styles match.
fn push_text(runs: &mut Vec<TextRun>, text: &str, style: InlineStyle) {
    let mut collapsed = collapse_whitespace(text);
    let ends_with_space = runs
        .iter()
        .rev()
        .find(|r| !r.text.is_empty())
        .is_none_or(|r| r.text.ends_with(' '));
    if ends_with_space && collapsed.starts_with(' ') {
        collapsed.remove(0);
    }
    if collapsed.is_empty() {
        return;
    }

    let run = style.run(&collapsed);
    match runs.last_mut() {
        Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
        _ => runs.push(run),
    }
}

/// Trim the outer whitespace of a block and drop runs left empty.
fn finish_runs(mut runs: Vec<TextRun>) -> Vec<TextRun> {
    if let Some(last) = runs.last_mut() {
        let trimmed = last.text.trim_end().len();
        last.text.truncate(trimmed);
    }
    runs.retain(|r| !r.text.is_empty());
    runs
}

fn flush_implicit(pending: &mut Vec<TextRun>, nodes: &mut Vec<ContentNode>) {
    let runs = finish_runs(std::mem::take(pending));
    if !runs.is_empty() {
        nodes.push(ContentNode::Paragraph {
            alignment: Alignment::Left,
            runs,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children(node: ContentNode) -> Vec<ContentNode> {
        match node {
            ContentNode::GenericContainer { children } => children,
            other => panic!("expected container, got {:?}", other),
        }
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let html = r#"
            <h2 style="text-align: center">INFORME</h2>
            <p>This is a <strong>bold</strong> move.</p>
        "#;

        let nodes = children(parse_html(html));
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[0],
            ContentNode::Heading {
                level: 2,
                alignment: Alignment::Center,
                runs: vec![TextRun::plain("INFORME")],
            }
        );
        assert_eq!(
            nodes[1],
            ContentNode::Paragraph {
                alignment: Alignment::Left,
                runs: vec![
                    TextRun::plain("This is a "),
                    TextRun::plain("bold").bold(),
                    TextRun::plain(" move."),
                ],
            }
        );
    }

    #[test]
    fn test_nested_inline_styles() {
        let nodes = children(parse_html("<p><b>a<i>b<u>c</u></i></b></p>"));
        match &nodes[0] {
            ContentNode::Paragraph { runs, .. } => {
                assert_eq!(
                    runs,
                    &vec![
                        TextRun::plain("a").bold(),
                        TextRun::plain("b").bold().italic(),
                        TextRun::plain("c").bold().italic().underline(),
                    ]
                );
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let nodes = children(parse_html("<p>\n   lots   of\n\n space  <em> here </em> </p>"));
        match &nodes[0] {
            ContentNode::Paragraph { runs, .. } => {
                let text: String = runs.iter().map(|r| r.text.as_str()).collect();
                assert_eq!(text, "lots of space here");
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_table_with_header_row() {
        let html = r#"
            <table>
              <thead><tr><th>A</th><th>B</th></tr></thead>
              <tbody><tr><td>1</td><td> 2 </td></tr></tbody>
            </table>
        "#;

        let nodes = children(parse_html(html));
        assert_eq!(
            nodes[0],
            ContentNode::Table {
                rows: vec![
                    vec![Cell::header("A"), Cell::header("B")],
                    vec![Cell::data("1"), Cell::data("2")],
                ],
            }
        );
    }

    #[test]
    fn test_image_dimensions() {
        let html = r#"<img src="https://example.com/a.png" width="200px" style="height: 100px">"#;
        let nodes = children(parse_html(html));
        assert_eq!(
            nodes[0],
            ContentNode::image("https://example.com/a.png", Some(200), Some(100))
        );
    }

    #[test]
    fn test_oversized_dimensions_are_capped() {
        let html = r#"<img src="https://example.com/tall.png" width="10" height="500000">"#;
        let nodes = children(parse_html(html));
        assert_eq!(
            nodes[0],
            ContentNode::image("https://example.com/tall.png", Some(10), Some(10_000))
        );
        assert_eq!(parse_dimension("1e300"), Some(10_000));
        assert_eq!(parse_dimension("0.2"), None);
    }

    #[test]
    fn test_image_inside_paragraph_is_lifted() {
        let nodes = children(parse_html(r#"<p>Logo: <img src="logo.png"></p>"#));
        assert_eq!(nodes.len(), 2);
        assert!(matches!(nodes[0], ContentNode::Paragraph { .. }));
        assert_eq!(nodes[1], ContentNode::image("logo.png", None, None));
    }

    #[test]
    fn test_unknown_elements_become_containers() {
        let html = "<section><custom-widget><p>inside</p></custom-widget></section><hr>";
        let nodes = children(parse_html(html));
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            ContentNode::GenericContainer { children } => match &children[0] {
                ContentNode::GenericContainer { children } => {
                    assert_eq!(children[0], ContentNode::paragraph("inside"));
                }
                other => panic!("unexpected node {:?}", other),
            },
            other => panic!("unexpected node {:?}", other),
        }
        assert_eq!(nodes[1], ContentNode::HorizontalRule);
    }

    #[test]
    fn test_loose_text_becomes_paragraph() {
        let nodes = children(parse_html("<div>Loose <b>text</b><p>Para</p>tail</div>"));
        let inner = children(nodes.into_iter().next().unwrap());
        assert_eq!(inner.len(), 3);
        assert_eq!(
            inner[0],
            ContentNode::Paragraph {
                alignment: Alignment::Left,
                runs: vec![TextRun::plain("Loose "), TextRun::plain("text").bold()],
            }
        );
        assert_eq!(inner[1], ContentNode::paragraph("Para"));
        assert_eq!(inner[2], ContentNode::paragraph("tail"));
    }

    #[test]
    fn test_scripts_and_styles_skipped() {
        let html = "<html><head><style>p{}</style></head><body><script>x()</script><p>ok</p></body></html>";
        let nodes = children(parse_html(html));
        assert_eq!(nodes, vec![ContentNode::paragraph("ok")]);
    }

    #[test]
    fn test_legacy_align_attribute() {
        let nodes = children(parse_html(r#"<p align="right">r</p><p style="text-align: sideways">l</p>"#));
        assert!(matches!(
            nodes[0],
            ContentNode::Paragraph {
                alignment: Alignment::Right,
                ..
            }
        ));
        assert!(matches!(
            nodes[1],
            ContentNode::Paragraph {
                alignment: Alignment::Left,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(parse_html(""), ContentNode::document(vec![]));
    }
}
