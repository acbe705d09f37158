use thiserror::Error;
use tokio::task::JoinError;

use crate::config::ConfigError;
use crate::domain::BoxError;
use crate::io::SourceError;
use crate::registry::RegistryError;

/// Errors raised inside one substream pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Transform failed for key {key}: {source}")]
    Transform {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Pipeline for key {key} panicked")]
    Panicked { key: String },

    #[error("Pipeline cancelled")]
    Cancelled,
}

/// Operator-level errors delivered to the result consumer
#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Classification failure: {0}")]
    ClassificationFailure(#[source] BoxError),

    #[error("Cardinality exceeded: key {key} would exceed {max} concurrent substreams")]
    CardinalityExceeded { max: usize, key: String },

    #[error("Pipeline transform failure: {0}")]
    PipelineTransformFailure(#[source] PipelineError),

    #[error("Source failure: {0}")]
    SourceFailure(#[from] SourceError),

    #[error("Operator cancelled")]
    Cancelled,

    #[error("Registry error: {0}")]
    Registry(RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Operator task failed: {0}")]
    Join(#[from] JoinError),
}

impl From<RegistryError> for OperatorError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::CardinalityExceeded { max, key } => {
                OperatorError::CardinalityExceeded { max, key }
            }
            other => OperatorError::Registry(other),
        }
    }
}

impl From<PipelineError> for OperatorError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::Cancelled => OperatorError::Cancelled,
            other => OperatorError::PipelineTransformFailure(other),
        }
    }
}
