use thiserror::Error;

use super::substream::SubstreamStatus;

/// Boxed error returned by user-supplied classifiers and transforms
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Domain-level errors representing substream lifecycle violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid substream transition: {from} -> {to}")]
    InvalidTransition {
        from: SubstreamStatus,
        to: SubstreamStatus,
    },
}
