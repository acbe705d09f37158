pub mod classifier;
pub mod error;
pub mod substream;
pub mod transform;

// Re-export commonly used types
pub use classifier::{Classifier, ClassifierFn, KeysFn, RoutedPair, classify_fn, keys_fn};
pub use error::{BoxError, DomainError};
pub use substream::SubstreamStatus;
pub use transform::{
    Batcher, MapWindow, TransformFn, WindowTransform, bracketed, map_window, transform_fn,
};
