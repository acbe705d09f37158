pub mod error;
pub mod processor;

// Re-export commonly used types
pub use error::{AbortOnError, ErrorPolicy, IsolateKey, SilentIsolate};
pub use processor::{MultiGroupBy, OperatorHandle};
