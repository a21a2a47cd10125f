//! Per-job scratch storage.
//!
//! A [`RenderArena`] is created when a job starts and dropped when it ends,
//! whichever way it ends. Nothing in it outlives the job, so two jobs never
//! observe each other's images or intermediate files.

use std::collections::HashMap;
use std::sync::Arc;

use typst::foundations::Bytes;

use crate::resolver::ResolvedImage;

pub struct RenderArena {
    job_id: String,
    images: HashMap<String, Arc<ResolvedImage>>,
    files: HashMap<String, Bytes>,
    bytes_held: usize,
}

impl RenderArena {
    pub fn new(job_id: impl Into<String>) -> Self {
        let job_id = job_id.into();
        tracing::debug!("Rendering arena acquired for job {}", job_id);
        Self {
            job_id,
            images: HashMap::new(),
            files: HashMap::new(),
            bytes_held: 0,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Resolved image for `uri`, if this job already fetched it.
    pub fn cached_image(&self, uri: &str) -> Option<Arc<ResolvedImage>> {
        self.images.get(uri).cloned()
    }

    pub fn cache_image(&mut self, uri: String, image: Arc<ResolvedImage>) {
        self.bytes_held += image.data.len();
        self.images.insert(uri, image);
    }

    /// Register an in-memory file for the typesetter and return its virtual path.
    pub fn add_file(&mut self, name: &str, data: Vec<u8>) -> String {
        let path = format!("/{}", name.trim_start_matches('/'));
        self.bytes_held += data.len();
        self.files.insert(path.clone(), Bytes::new(data));
        path
    }

    /// Files registered so far, keyed by virtual path.
    pub fn files(&self) -> &HashMap<String, Bytes> {
        &self.files
    }

    /// Bytes of image data and files currently held.
    pub fn bytes_held(&self) -> usize {
        self.bytes_held
    }
}

impl Drop for RenderArena {
    fn drop(&mut self) {
        tracing::debug!(
            "Rendering arena released for job {} ({} images, {} files, {} bytes)",
            self.job_id,
            self.images.len(),
            self.files.len(),
            self.bytes_held
        );
    }
}
