pub mod concurrent;
pub mod error;
pub mod traits;

// Re-export commonly used types
pub use concurrent::{RouteOutcome, SubstreamRegistry};
pub use error::RegistryError;
pub use traits::PipelineLauncher;
