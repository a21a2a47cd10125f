//! State of one export invocation.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{ExportError, FailureKind};
use crate::model::ContentNode;
use crate::types::{TargetFormat, artifact_filename};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Rendering,
    Succeeded,
    Failed(FailureKind),
}

/// Pipeline stage: `Idle -> Resolving -> Emitting -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobStage {
    Idle,
    Resolving,
    Emitting,
    Done,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Idle => "idle",
            JobStage::Resolving => "resolving",
            JobStage::Emitting => "emitting",
            JobStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// One export of one tree to one format. Owns a private copy of the tree.
#[derive(Debug)]
pub struct ExportJob {
    id: String,
    format: TargetFormat,
    filename: String,
    source: ContentNode,
    status: JobStatus,
    stage: JobStage,
    started_at: DateTime<Utc>,
}

impl ExportJob {
    pub fn new(format: TargetFormat, filename: &str, source: &ContentNode) -> Self {
        let job = Self {
            id: uuid::Uuid::new_v4().to_string(),
            format,
            filename: artifact_filename(filename, format),
            source: source.clone(),
            status: JobStatus::Pending,
            stage: JobStage::Idle,
            started_at: Utc::now(),
        };
        tracing::debug!("Job {} created for '{}' ({})", job.id, job.filename, format);
        job
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format(&self) -> TargetFormat {
        self.format
    }

    /// Artifact filename, extension included.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Filename without the format extension.
    pub fn title(&self) -> &str {
        let suffix_len = self.format.extension().len() + 1;
        self.filename
            .get(..self.filename.len().saturating_sub(suffix_len))
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.filename)
    }

    pub fn source(&self) -> &ContentNode {
        &self.source
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn start(&mut self) {
        self.status = JobStatus::Rendering;
        tracing::info!("Job {}: exporting '{}' to {}", self.id, self.filename, self.format);
    }

    /// Move to `next`. Stages only move forward.
    pub fn advance(&mut self, next: JobStage) {
        if next <= self.stage {
            tracing::warn!("Job {}: ignoring stage change {} -> {}", self.id, self.stage, next);
            return;
        }
        tracing::debug!("Job {}: {} -> {}", self.id, self.stage, next);
        self.stage = next;
    }

    pub fn succeed(&mut self) {
        self.status = JobStatus::Succeeded;
        self.stage = JobStage::Done;
    }

    /// Mark the job failed and wrap `error` into the normalized job error.
    pub fn fail(&mut self, error: ExportError) -> ExportError {
        let kind = error.kind();
        self.status = JobStatus::Failed(kind);
        tracing::error!(
            "Job {} failed while {} ({} to {}): {}",
            self.id,
            self.stage,
            self.filename,
            self.format,
            error
        );
        self.stage = JobStage::Done;

        ExportError::Job {
            job_id: self.id.clone(),
            format: self.format.to_string(),
            filename: self.filename.clone(),
            kind,
            source: Box::new(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let tree = ContentNode::document(vec![]);
        let mut job = ExportJob::new(TargetFormat::Docx, "", &tree);
        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(job.stage(), JobStage::Idle);
        assert_eq!(job.filename(), "document.docx");
        assert_eq!(job.title(), "document");

        job.start();
        job.advance(JobStage::Resolving);
        job.advance(JobStage::Emitting);
        job.advance(JobStage::Resolving);
        assert_eq!(job.stage(), JobStage::Emitting);

        job.succeed();
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(job.stage(), JobStage::Done);
    }

    #[test]
    fn test_fail_wraps_error() {
        let tree = ContentNode::document(vec![]);
        let mut job = ExportJob::new(TargetFormat::Pdf, "informe", &tree);
        job.start();

        let err = job.fail(ExportError::packaging("bad"));
        assert_eq!(job.status(), JobStatus::Failed(FailureKind::Packaging));
        match err {
            ExportError::Job {
                job_id,
                filename,
                kind,
                ..
            } => {
                assert_eq!(job_id, job.id());
                assert_eq!(filename, "informe.pdf");
                assert_eq!(kind, FailureKind::Packaging);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_jobs_have_distinct_ids() {
        let tree = ContentNode::document(vec![]);
        let a = ExportJob::new(TargetFormat::Html, "a", &tree);
        let b = ExportJob::new(TargetFormat::Html, "a", &tree);
        assert_ne!(a.id(), b.id());
    }
}
