//! Core trait for target emitters.

use async_trait::async_trait;

use crate::arena::RenderArena;
use crate::error::Result;
use crate::types::{ExportOptions, FormatInfo};
use crate::walker::Event;

/// Output of one emitter run.
#[derive(Debug, Clone, Default)]
pub struct Emission {
    pub bytes: Vec<u8>,
    /// Non-fatal problems worth reporting to the caller.
    pub warnings: Vec<String>,
}

impl Emission {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            warnings: Vec::new(),
        }
    }
}

/// Turns an emission event sequence into one target format.
#[async_trait]
pub trait Emitter: Send + Sync {
    /// Get format information.
    fn format_info(&self) -> FormatInfo;

    /// Encode `events` into the target format.
    ///
    /// `title` is the artifact's display name. Scratch data goes into
    /// `arena`, which the caller releases when the job ends.
    async fn emit(
        &self,
        events: &[Event],
        title: &str,
        arena: &mut RenderArena,
        options: &ExportOptions,
    ) -> Result<Emission>;
}
