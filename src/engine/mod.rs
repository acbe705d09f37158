pub mod error;
pub mod merger;
pub mod pipeline;
pub mod router;

// Re-export commonly used types
pub use error::{OperatorError, PipelineError};
pub use merger::{MergeResults, Merger};
pub use pipeline::{SpawnLauncher, SubstreamHandle, SubstreamOutput, SubstreamPipeline};
pub use router::{KeyRouter, RouterStats};
