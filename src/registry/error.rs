use thiserror::Error;

use crate::domain::DomainError;

/// Registry-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Cardinality exceeded: key {key} would exceed {max} concurrent substreams")]
    CardinalityExceeded { max: usize, key: String },

    #[error("Input already ended, cannot route key {0}")]
    InputEnded(String),

    #[error("Unknown substream: {0}")]
    UnknownSubstream(String),

    #[error("{0} substreams not closed after merge")]
    Unsettled(usize),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
