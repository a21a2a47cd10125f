//! In-memory content tree consumed by the export pipeline.

use serde::{Deserialize, Serialize};

/// Horizontal alignment of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// Map a source alignment value. Anything unrecognized is `Left`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "center" | "centre" | "middle" => Alignment::Center,
            "right" | "end" => Alignment::Right,
            "justify" | "both" => Alignment::Justify,
            _ => Alignment::Left,
        }
    }

    /// CSS `text-align` keyword.
    pub fn as_css(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

/// A run of text sharing one set of inline styles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl TextRun {
    /// Create an unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Mark the run bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Mark the run italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Mark the run underlined.
    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub(crate) fn same_style(&self, other: &TextRun) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.underline == other.underline
    }
}

/// One table cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub is_header: bool,
    pub text: String,
}

impl Cell {
    pub fn header(text: impl Into<String>) -> Self {
        Self {
            is_header: true,
            text: text.into(),
        }
    }

    pub fn data(text: impl Into<String>) -> Self {
        Self {
            is_header: false,
            text: text.into(),
        }
    }
}

/// One node of a rich-text document.
///
/// Headings, paragraphs, tables, images and rules are leaves. Everything the
/// parser does not recognize becomes a [`ContentNode::GenericContainer`] so
/// that its children are still exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentNode {
    Heading {
        level: u8,
        #[serde(default)]
        alignment: Alignment,
        runs: Vec<TextRun>,
    },
    Paragraph {
        #[serde(default)]
        alignment: Alignment,
        runs: Vec<TextRun>,
    },
    Table {
        rows: Vec<Vec<Cell>>,
    },
    Image {
        source: String,
        width: Option<u32>,
        height: Option<u32>,
    },
    HorizontalRule,
    GenericContainer {
        children: Vec<ContentNode>,
    },
}

impl ContentNode {
    /// A container holding `children`, typically the document root.
    pub fn document(children: Vec<ContentNode>) -> Self {
        ContentNode::GenericContainer { children }
    }

    /// A heading; the level is clamped into 1..=6.
    pub fn heading(level: u8, runs: Vec<TextRun>) -> Self {
        ContentNode::Heading {
            level: level.clamp(1, 6),
            alignment: Alignment::Left,
            runs,
        }
    }

    /// A left-aligned paragraph of unstyled text.
    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentNode::Paragraph {
            alignment: Alignment::Left,
            runs: vec![TextRun::plain(text)],
        }
    }

    pub fn image(source: impl Into<String>, width: Option<u32>, height: Option<u32>) -> Self {
        ContentNode::Image {
            source: source.into(),
            width,
            height,
        }
    }

    /// Image nodes in document order, the same order the walker visits them.
    pub fn images(&self) -> Vec<&ContentNode> {
        let mut found = Vec::new();
        collect_images(self, &mut found);
        found
    }

    /// Number of block (non-container) nodes in the tree.
    pub fn block_count(&self) -> usize {
        match self {
            ContentNode::GenericContainer { children } => {
                children.iter().map(ContentNode::block_count).sum()
            }
            _ => 1,
        }
    }
}

fn collect_images<'a>(node: &'a ContentNode, found: &mut Vec<&'a ContentNode>) {
    match node {
        ContentNode::Image { .. } => found.push(node),
        ContentNode::GenericContainer { children } => {
            for child in children {
                collect_images(child, found);
            }
        }
        _ => {}
    }
}
