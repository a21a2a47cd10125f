//! Stand-in graphics for images that could not be resolved.

use std::collections::HashMap;
use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::{ExportError, Result};
use crate::typesetter::{Typesetter, escape_typst_string};

const BACKGROUND: [u8; 4] = [0xee, 0xee, 0xee, 0xff];
const BORDER: [u8; 4] = [0x99, 0x99, 0x99, 0xff];
const BORDER_WIDTH: u32 = 2;

/// Paint a `width`×`height` PNG placeholder with `caption` centered in it.
///
/// The caption is laid out by typst; if that fails the placeholder is still
/// produced, without caption.
pub fn paint(typesetter: &Typesetter, width: u32, height: u32, caption: &str) -> Vec<u8> {
    let width = width.max(1);
    let height = height.max(1);

    match typeset(typesetter, width, height, caption) {
        Ok(png) => png,
        Err(e) => {
            tracing::warn!("Typeset placeholder failed, drawing plain frame: {}", e);
            plain_frame(width, height)
        }
    }
}

/// Caption size in points, legible but never overflowing small frames.
fn caption_size(width: u32, height: u32) -> f32 {
    let by_height = height as f32 / 4.0;
    let by_width = width as f32 / 10.0;
    by_height.min(by_width).clamp(6.0, 14.0)
}

fn typeset(typesetter: &Typesetter, width: u32, height: u32, caption: &str) -> Result<Vec<u8>> {
    // One point per pixel, so the page size is the pixel size.
    let markup = format!(
        "#set page(width: {width}pt, height: {height}pt, margin: 0pt, fill: rgb(\"#eeeeee\"))\n\
         #box(width: 100%, height: 100%, stroke: {border}pt + rgb(\"#999999\"), inset: 4pt)[\n\
         #align(center + horizon)[#text(size: {size}pt, fill: rgb(\"#555555\"))[#\"{caption}\"]]\n\
         ]\n",
        border = BORDER_WIDTH,
        size = caption_size(width, height),
        caption = escape_typst_string(caption),
    );

    let document = typesetter.compile(markup, &HashMap::new())?;
    let page = document
        .pages
        .first()
        .ok_or_else(|| ExportError::rendering("placeholder produced no page"))?;

    typst_render::render(page, 1.0)
        .encode_png()
        .map_err(|e| ExportError::rendering(format!("placeholder encoding failed: {}", e)))
}

pub(crate) fn plain_frame(width: u32, height: u32) -> Vec<u8> {
    let mut frame = RgbaImage::from_pixel(width, height, Rgba(BACKGROUND));
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        if x < BORDER_WIDTH
            || y < BORDER_WIDTH
            || x + BORDER_WIDTH >= width
            || y + BORDER_WIDTH >= height
        {
            *pixel = Rgba(BORDER);
        }
    }

    let mut png = Vec::new();
    if let Err(e) = frame.write_to(&mut Cursor::new(&mut png), ImageFormat::Png) {
        // Encoding an in-memory RGBA buffer only fails on allocation.
        tracing::error!("Placeholder frame encoding failed: {}", e);
    }
    png
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimensions(png: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(png).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_placeholder_has_exact_size() {
        let typesetter = Typesetter::new();
        let png = paint(&typesetter, 200, 100, "Image unavailable");
        assert_eq!(dimensions(&png), (200, 100));
    }

    #[test]
    fn test_placeholder_caption_is_escaped() {
        let typesetter = Typesetter::new();
        let png = paint(&typesetter, 120, 40, "\"quoted\" #caption");
        assert_eq!(dimensions(&png), (120, 40));
    }

    #[test]
    fn test_plain_frame_draws_border() {
        let png = plain_frame(10, 6);
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (10, 6));
        assert_eq!(img.get_pixel(0, 0).0, BORDER);
        assert_eq!(img.get_pixel(5, 3).0, BACKGROUND);
    }

    #[test]
    fn test_caption_size_bounds() {
        assert_eq!(caption_size(200, 100), 14.0);
        assert_eq!(caption_size(10, 10), 6.0);
    }
}
