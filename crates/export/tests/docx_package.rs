//! DOCX packaging checks against the written OOXML.

mod common;

use common::*;
use folio_export::{Cell, ContentNode, TargetFormat, TextRun};

fn informe() -> ContentNode {
    ContentNode::document(vec![
        ContentNode::heading(2, vec![TextRun::plain("INFORME")]),
        ContentNode::Table {
            rows: vec![
                vec![Cell::header("Item"), Cell::header("Total")],
                vec![Cell::data("Paper"), Cell::data("12")],
            ],
        },
        ContentNode::image("https://unreachable.invalid/logo.png", Some(200), Some(100)),
    ])
}

#[tokio::test]
async fn test_informe_package() {
    let h = harness();
    let report = h
        .manager
        .export_tree(TargetFormat::Docx, &informe(), "informe")
        .await
        .unwrap();

    assert_eq!(report.filename, "informe.docx");
    assert_eq!(report.images, 1);
    assert_eq!(report.placeholders, 1);
    assert_eq!(h.fetcher.calls(), 1);

    let bytes = h.sink.last().unwrap().bytes;
    let xml = document_xml(&bytes);

    // Heading level 2 maps to 36 half-points.
    assert!(run_sizes(&xml).contains(&36));
    assert_eq!(docx_text(&xml), "INFORMEItemTotalPaper12");

    // Every cell is bordered; only the header row is shaded.
    assert_eq!(xml.matches("<w:tcBorders>").count(), 4);
    assert_eq!(xml.matches("D9D9D9").count(), 2);

    // 200x100 px at 9525 EMU per px.
    assert!(xml.contains("cx=\"1905000\""));
    assert!(xml.contains("cy=\"952500\""));

    let media: Vec<_> = zip_names(&bytes)
        .into_iter()
        .filter(|name| name.starts_with("word/media/") && !name.ends_with('/'))
        .collect();
    assert_eq!(media.len(), 1);

    let png = zip_entry(&bytes, &media[0]);
    assert_eq!(png_dimensions(&png), (200, 100));

    // The caption leaves dark pixels well inside the border.
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    let dark = (20..80)
        .flat_map(|y| (20..180).map(move |x| (x, y)))
        .filter(|&(x, y)| img.get_pixel(x, y).0[0] < 0x80)
        .count();
    assert!(dark > 0, "no caption pixels in placeholder");
}

#[tokio::test]
async fn test_absurdly_tall_image_becomes_bounded_placeholder() {
    let h = harness();
    let tree = ContentNode::document(vec![ContentNode::image(
        "https://unreachable.invalid/tall.png",
        Some(10),
        Some(500_000),
    )]);

    let report = h
        .manager
        .export_tree(TargetFormat::Docx, &tree, "tall")
        .await
        .unwrap();
    assert_eq!(report.placeholders, 1);

    let bytes = h.sink.last().unwrap().bytes;
    let xml = document_xml(&bytes);
    // Fitted to 1x10000 px.
    assert!(xml.contains("cx=\"9525\""));
    assert!(xml.contains("cy=\"95250000\""));

    let media = zip_names(&bytes)
        .into_iter()
        .find(|name| name.starts_with("word/media/") && !name.ends_with('/'))
        .unwrap();
    assert_eq!(png_dimensions(&zip_entry(&bytes, &media)), (1, 10_000));
}

#[tokio::test]
async fn test_heading_sizes_decrease_with_level() {
    let h = harness();
    let headings = (1..=6)
        .map(|level| ContentNode::heading(level, vec![TextRun::plain(format!("H{level}"))]))
        .collect();

    h.manager
        .export_tree(TargetFormat::Docx, &ContentNode::document(headings), "levels")
        .await
        .unwrap();
    let xml = document_xml(&h.sink.last().unwrap().bytes);

    let mut sizes = run_sizes(&xml);
    sizes.dedup();
    assert_eq!(sizes, [48, 36, 28, 24, 20, 18]);
}

#[tokio::test]
async fn test_paragraph_styles_survive() {
    let h = harness();
    h.manager
        .export_to_docx(
            "<p style=\"text-align: center\">plain <b>bold</b> <i>it</i> <u>under</u></p>",
            "styles",
        )
        .await
        .unwrap();
    let xml = document_xml(&h.sink.last().unwrap().bytes);

    assert!(xml.contains("<w:jc w:val=\"center\""));
    assert!(xml.contains("<w:b ") || xml.contains("<w:b/>"));
    assert!(xml.contains("<w:i ") || xml.contains("<w:i/>"));
    assert!(xml.contains("<w:u w:val=\"single\""));
    assert_eq!(docx_text(&xml), "plain bold it under");
}
