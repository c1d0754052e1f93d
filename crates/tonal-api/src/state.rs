//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::upstream::Upstream;

/// Largest accepted audio upload, in bytes.
pub const DEFAULT_MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
///
/// Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Provider the proxy forwards to.
    pub upstream: Arc<dyn Upstream>,
    /// Maximum size of an uploaded recording.
    pub max_audio_bytes: usize,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self {
            upstream,
            max_audio_bytes: DEFAULT_MAX_AUDIO_BYTES,
            start_time: Instant::now(),
        }
    }

    pub fn with_max_audio_bytes(mut self, max: usize) -> Self {
        self.max_audio_bytes = max;
        self
    }
}
