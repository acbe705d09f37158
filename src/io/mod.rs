pub mod error;
pub mod lines;

// Re-export commonly used types
pub use error::SourceError;
pub use lines::LineSource;
