//! Export format implementations.

pub mod docx;
pub mod html;
pub mod pdf;

// Re-export emitters
pub use docx::DocxEmitter;
pub use html::HtmlEmitter;
pub use pdf::RasterEmitter;

/// Font size tiers per heading level, in half-points. Level 1 is the largest.
const HEADING_SIZES: [usize; 6] = [48, 36, 28, 24, 20, 18];

/// Font size of a heading of `level`, in half-points.
///
/// Strictly decreasing over 1..=6; out-of-range levels are clamped.
pub fn heading_size(level: u8) -> usize {
    HEADING_SIZES[(level.clamp(1, 6) - 1) as usize]
}
