//! Conversions in and out of the content tree.
//!
//! `html_to_content` parses editor HTML into a [`ContentNode`](crate::ContentNode)
//! tree; `events_to_typst` turns emission events into Typst markup for the
//! raster snapshot.

pub mod events_to_typst;
pub mod html_to_content;

// Re-export main types and functions
pub use events_to_typst::{EventsToTypstConverter, TypstMarkup, runs_to_typst};
pub use html_to_content::parse_html;
