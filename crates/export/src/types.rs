//! Core types for export operations.

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Target representations the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Pdf,
    Docx,
    Html,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] = [TargetFormat::Pdf, TargetFormat::Docx, TargetFormat::Html];

    /// Identifier used for registration and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Docx => "docx",
            TargetFormat::Html => "html",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.id()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "application/pdf",
            TargetFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            TargetFormat::Html => "text/html",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TargetFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(TargetFormat::Pdf),
            "docx" | "word" => Ok(TargetFormat::Docx),
            "html" | "htm" => Ok(TargetFormat::Html),
            other => Err(ExportError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Information about an export format.
#[derive(Debug, Clone)]
pub struct FormatInfo {
    /// Target format.
    pub format: TargetFormat,
    /// Human-readable name (e.g., "PDF Document").
    pub name: String,
    /// MIME type of the produced artifact.
    pub mime_type: String,
}

impl FormatInfo {
    /// Create new format info; the MIME type comes from the format.
    pub fn new(format: TargetFormat, name: impl Into<String>) -> Self {
        Self {
            format,
            name: name.into(),
            mime_type: format.mime_type().to_string(),
        }
    }

    pub fn id(&self) -> &'static str {
        self.format.id()
    }
}

/// Export configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Upper bound for fetching and decoding one image, in milliseconds.
    pub image_timeout_ms: u64,
    /// Maximum image width in layout units (CSS pixels).
    pub max_image_width: u32,
    /// Placeholder width when the image node declares none.
    pub placeholder_width: u32,
    /// Placeholder height when the image node declares none.
    pub placeholder_height: u32,
    /// Caption stamped into placeholders.
    pub placeholder_caption: String,
    /// Device pixels per CSS pixel for the raster snapshot.
    pub raster_scale: f32,
    /// Base URL relative image sources are resolved against.
    pub base_url: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            image_timeout_ms: 3_000,
            max_image_width: 500,
            placeholder_width: 200,
            placeholder_height: 100,
            placeholder_caption: "Image unavailable".to_string(),
            raster_scale: 2.0,
            base_url: None,
        }
    }
}

impl ExportOptions {
    /// Create new options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-image timeout.
    pub fn with_image_timeout(mut self, timeout: StdDuration) -> Self {
        self.image_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the base URL for relative image sources.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn image_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.image_timeout_ms)
    }

    /// Check the options for values no export could work with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_image_width == 0 {
            return Err(ExportError::InvalidConfiguration {
                message: "max_image_width must be positive".to_string(),
            });
        }
        if self.placeholder_width == 0 || self.placeholder_height == 0 {
            return Err(ExportError::InvalidConfiguration {
                message: "placeholder dimensions must be positive".to_string(),
            });
        }
        if !(self.raster_scale.is_finite() && self.raster_scale > 0.0) {
            return Err(ExportError::InvalidConfiguration {
                message: format!("invalid raster scale: {}", self.raster_scale),
            });
        }
        if let Some(base) = &self.base_url {
            url::Url::parse(base).map_err(|e| ExportError::InvalidConfiguration {
                message: format!("invalid base URL '{}': {}", base, e),
            })?;
        }
        Ok(())
    }
}

/// Bytes produced by a successful job, ready to be saved.
#[derive(Debug, Clone)]
pub struct EmittedArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Suggested filename, extension included.
    pub filename: String,
}

impl EmittedArtifact {
    pub fn new(bytes: Vec<u8>, format: TargetFormat, filename: &str) -> Self {
        Self {
            bytes,
            mime_type: format.mime_type().to_string(),
            filename: artifact_filename(filename, format),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Normalize a caller-supplied filename: empty becomes `document`, path
/// separators are replaced and the format extension is appended when missing.
pub fn artifact_filename(filename: &str, format: TargetFormat) -> String {
    let trimmed = filename.trim();
    let stem = if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '\0' => '_',
                c => c,
            })
            .collect()
    };

    let suffix = format!(".{}", format.extension());
    if stem.to_ascii_lowercase().ends_with(&suffix) {
        stem
    } else {
        format!("{}{}", stem, suffix)
    }
}

/// Result of a successful export job.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub job_id: String,
    pub format: TargetFormat,
    pub filename: String,
    pub mime_type: String,
    /// Total output size in bytes.
    pub total_size: u64,
    /// Where the save collaborator put the artifact.
    pub saved_to: String,
    /// Image nodes embedded (placeholders included).
    pub images: u32,
    /// Image nodes that fell back to a placeholder.
    pub placeholders: u32,
    /// Non-fatal problems, such as raster content overflowing the page.
    pub warnings: Vec<String>,
    /// Time taken.
    pub export_duration: Duration,
}
