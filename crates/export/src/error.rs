//! Error types for export operations.

use std::fmt;

use thiserror::Error;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Error types for export operations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Format is not registered with the manager.
    #[error("Unsupported export format: '{format}'")]
    UnsupportedFormat { format: String },

    /// The raster snapshot could not be produced.
    #[error("Rendering failed: {message}")]
    Rendering { message: String },

    /// Serializing into the target format failed.
    #[error("Packaging failed: {message}")]
    Packaging { message: String },

    /// Handing the artifact to the save collaborator failed.
    #[error("Saving '{filename}' failed")]
    Save {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The single normalized error an export job reports to its caller.
    #[error("Export of '{filename}' to {format} failed ({kind})")]
    Job {
        job_id: String,
        format: String,
        filename: String,
        kind: FailureKind,
        #[source]
        source: Box<ExportError>,
    },
}

/// Classification of a failed export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Rendering,
    Packaging,
    Save,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Rendering => "rendering",
            FailureKind::Packaging => "packaging",
            FailureKind::Save => "save",
            FailureKind::Other => "other",
        };
        f.write_str(name)
    }
}

impl ExportError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ExportError::Rendering { .. } => FailureKind::Rendering,
            ExportError::Packaging { .. } => FailureKind::Packaging,
            ExportError::Save { .. } => FailureKind::Save,
            ExportError::Job { kind, .. } => *kind,
            ExportError::UnsupportedFormat { .. }
            | ExportError::InvalidConfiguration { .. } => FailureKind::Other,
        }
    }

    pub(crate) fn rendering(message: impl Into<String>) -> Self {
        ExportError::Rendering {
            message: message.into(),
        }
    }

    pub(crate) fn packaging(message: impl Into<String>) -> Self {
        ExportError::Packaging {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_keeps_inner_kind() {
        let inner = ExportError::rendering("typst failed");
        let err = ExportError::Job {
            job_id: "job".to_string(),
            format: "pdf".to_string(),
            filename: "document.pdf".to_string(),
            kind: inner.kind(),
            source: Box::new(inner),
        };

        assert_eq!(err.kind(), FailureKind::Rendering);
        assert_eq!(
            err.to_string(),
            "Export of 'document.pdf' to pdf failed (rendering)"
        );
    }

    #[test]
    fn test_configuration_errors_are_other() {
        let err = ExportError::InvalidConfiguration {
            message: "max_image_width must be positive".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::Other);
    }
}
