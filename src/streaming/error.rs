use tracing::{error, warn};

use crate::engine::PipelineError;

/// Policy for handling a failed substream pipeline
pub trait ErrorPolicy: Send + Sync {
    /// Handle a pipeline failure (transform error or panic)
    /// Return true to drop only the failing key, false to abort the operator
    fn handle_pipeline_error(&self, error: &PipelineError) -> bool;
}

/// Abort the whole operator on the first failed pipeline (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnError;

impl ErrorPolicy for AbortOnError {
    fn handle_pipeline_error(&self, error: &PipelineError) -> bool {
        error!(%error, "Pipeline failed (aborting)");
        false
    }
}

/// Close the failing key without a value and keep the other keys running
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolateKey;

impl ErrorPolicy for IsolateKey {
    fn handle_pipeline_error(&self, error: &PipelineError) -> bool {
        warn!(%error, "Pipeline failed (isolating key)");
        true
    }
}

/// Silent isolation - drop failing keys without logging
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentIsolate;

impl ErrorPolicy for SilentIsolate {
    fn handle_pipeline_error(&self, _error: &PipelineError) -> bool {
        true
    }
}
