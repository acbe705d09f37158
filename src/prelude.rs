//! Prelude module for convenient imports
//!
//! Import everything you need with: `use multigroup::prelude::*;`

// Domain types
pub use crate::domain::{
    BoxError, Classifier, DomainError, RoutedPair, SubstreamStatus, WindowTransform, bracketed,
    classify_fn, keys_fn, map_window, transform_fn,
};

// Registry types
pub use crate::registry::{PipelineLauncher, RegistryError, RouteOutcome, SubstreamRegistry};

// Engine types
pub use crate::engine::{MergeResults, OperatorError, PipelineError, RouterStats, SubstreamOutput};

// IO types
pub use crate::io::{LineSource, SourceError};

// Config types
pub use crate::config::{ConfigError, GroupByConfig};

// Streaming types
pub use crate::streaming::{
    AbortOnError, ErrorPolicy, IsolateKey, MultiGroupBy, OperatorHandle, SilentIsolate,
};
