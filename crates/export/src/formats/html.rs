//! Standalone HTML export format implementation.
//!
//! The document carries its own stylesheet and every image as a data URI,
//! so the file renders the same with no network access.

use async_trait::async_trait;

use crate::arena::RenderArena;
use crate::error::Result;
use crate::formats::heading_size;
use crate::model::{Alignment, TextRun};
use crate::traits::{Emission, Emitter};
use crate::types::{ExportOptions, FormatInfo, TargetFormat};
use crate::walker::Event;

/// Standalone HTML format emitter.
pub struct HtmlEmitter;

impl HtmlEmitter {
    /// Create new HTML emitter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Emitter for HtmlEmitter {
    fn format_info(&self) -> FormatInfo {
        FormatInfo::new(TargetFormat::Html, "HTML Document")
    }

    async fn emit(
        &self,
        events: &[Event],
        title: &str,
        _arena: &mut RenderArena,
        _options: &ExportOptions,
    ) -> Result<Emission> {
        let document = generate_html_document(&events_to_html(events), title);
        Ok(Emission::new(document.into_bytes()))
    }
}

/// Wrap body markup in a complete document with the embedded stylesheet.
pub fn generate_html_document(body: &str, title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="Folio">
    <title>{title}</title>
    <style>
{base_css}
{heading_css}
    </style>
</head>
<body>
    <article class="document">
{body}
    </article>
</body>
</html>
"#,
        title = html_escape(title),
        base_css = BASE_CSS,
        heading_css = heading_css(),
        body = body,
    )
}

/// Body markup for an event sequence.
pub fn events_to_html(events: &[Event]) -> String {
    let mut out = String::new();
    let mut close_tag: Option<String> = None;
    let mut table: Option<(usize, Vec<bool>, usize)> = None;

    for event in events {
        match event {
            Event::BeginHeading { level, alignment } => {
                out.push_str(&format!("<h{}{}>", level, align_attr(*alignment)));
                close_tag = Some(format!("</h{}>\n", level));
            }
            Event::BeginParagraph { alignment } => {
                out.push_str(&format!("<p{}>", align_attr(*alignment)));
                close_tag = Some("</p>\n".to_string());
            }
            Event::Text(runs) => out.push_str(&runs_to_html(runs)),
            Event::EndBlock => {
                if let Some(tag) = close_tag.take() {
                    out.push_str(&tag);
                }
            }
            Event::BeginTable {
                cols, header_rows, ..
            } => {
                out.push_str("<table>\n");
                table = Some((*cols, header_rows.clone(), 0));
            }
            Event::TableCell { is_header, text } => {
                if let Some((cols, header_rows, seen)) = table.as_mut() {
                    let row = *seen / *cols;
                    if *seen % *cols == 0 {
                        if header_rows.get(row).copied().unwrap_or(false) {
                            out.push_str("<tr class=\"header\">");
                        } else {
                            out.push_str("<tr>");
                        }
                    }
                    let tag = if *is_header { "th" } else { "td" };
                    out.push_str(&format!("<{tag}>{}</{tag}>", html_escape(text)));
                    *seen += 1;
                    if *seen % *cols == 0 {
                        out.push_str("</tr>\n");
                    }
                }
            }
            Event::EndTable => {
                table = None;
                out.push_str("</table>\n");
            }
            Event::Rule => out.push_str("<hr>\n"),
            Event::EmbeddedImage {
                image,
                width,
                height,
            } => {
                let class = if image.is_placeholder {
                    " class=\"placeholder\""
                } else {
                    ""
                };
                out.push_str(&format!(
                    "<p class=\"image\"><img src=\"{}\" width=\"{}\" height=\"{}\"{} alt=\"\"></p>\n",
                    html_escape(&image.data_uri()),
                    width,
                    height,
                    class,
                ));
            }
        }
    }

    out
}

fn runs_to_html(runs: &[TextRun]) -> String {
    let mut out = String::new();
    for run in runs {
        let mut text = html_escape(&run.text);
        if run.underline {
            text = format!("<u>{}</u>", text);
        }
        if run.italic {
            text = format!("<em>{}</em>", text);
        }
        if run.bold {
            text = format!("<strong>{}</strong>", text);
        }
        out.push_str(&text);
    }
    out
}

fn align_attr(alignment: Alignment) -> String {
    match alignment {
        Alignment::Left => String::new(),
        other => format!(" style=\"text-align: {}\"", other.as_css()),
    }
}

fn heading_css() -> String {
    (1..=6u8)
        .map(|level| {
            format!(
                ".document h{} {{ font-size: {}pt; }}\n",
                level,
                heading_size(level) as f32 / 2.0
            )
        })
        .collect()
}

/// Escape HTML special characters.
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Base CSS for the exported document.
const BASE_CSS: &str = r#"
*, *::before, *::after {
    box-sizing: border-box;
}

body {
    margin: 0;
    padding: 0;
    font-family: 'Libertinus Serif', 'Times New Roman', Georgia, serif;
    font-size: 12pt;
    line-height: 1.5;
    color: #000;
    background: #fff;
}

/* Letter page with one-inch margins */
.document {
    max-width: 8.5in;
    margin: 0 auto;
    padding: 1in;
}

.document h1,
.document h2,
.document h3,
.document h4,
.document h5,
.document h6 {
    margin-top: 1.2em;
    margin-bottom: 0.6em;
    font-weight: bold;
    line-height: 1.25;
}

.document p {
    margin-top: 0;
    margin-bottom: 0.8em;
}

.document table {
    border-collapse: collapse;
    margin-bottom: 1em;
}

.document th,
.document td {
    border: 0.5pt solid #000;
    padding: 5pt;
    text-align: left;
}

.document tr.header {
    background: #d9d9d9;
}

.document hr {
    border: none;
    border-top: 0.75pt solid #808080;
    margin: 1em 0;
}

.document p.image img {
    display: block;
    max-width: 100%;
    height: auto;
}

.document img.placeholder {
    border: 2px solid #999;
}

@media print {
    .document {
        padding: 0;
    }
}
"#;
