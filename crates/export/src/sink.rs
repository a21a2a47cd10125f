//! Save collaborators that receive finished artifacts.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::EmittedArtifact;

/// Receives each successfully emitted artifact.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Save `artifact` and return where it went.
    async fn save(&self, artifact: &EmittedArtifact) -> std::io::Result<String>;
}

/// Writes artifacts into a directory, creating it when missing.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn save(&self, artifact: &EmittedArtifact) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&artifact.filename);
        tokio::fs::write(&path, &artifact.bytes).await?;

        tracing::info!("Saved {} ({} bytes)", path.display(), artifact.size());
        Ok(path.display().to_string())
    }
}

/// Keeps artifacts in memory. Useful for dry runs and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<EmittedArtifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts saved so far, oldest first.
    pub fn artifacts(&self) -> Vec<EmittedArtifact> {
        self.artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The most recently saved artifact.
    pub fn last(&self) -> Option<EmittedArtifact> {
        self.artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn save(&self, artifact: &EmittedArtifact) -> std::io::Result<String> {
        self.artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(artifact.clone());
        Ok(format!("memory:{}", artifact.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TargetFormat;

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let artifact = EmittedArtifact::new(b"<html></html>".to_vec(), TargetFormat::Html, "");

        let location = sink.save(&artifact).await.unwrap();
        assert!(location.ends_with("document.html"));

        let written = tokio::fs::read(dir.path().join("out").join("document.html"))
            .await
            .unwrap();
        assert_eq!(written, b"<html></html>");
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_artifacts() {
        let sink = MemorySink::new();
        let artifact = EmittedArtifact::new(vec![1, 2, 3], TargetFormat::Pdf, "informe");

        assert_eq!(sink.save(&artifact).await.unwrap(), "memory:informe.pdf");
        assert_eq!(sink.artifacts().len(), 1);
        assert_eq!(sink.last().unwrap().mime_type, "application/pdf");
    }
}
