use std::io;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

use crate::domain::BoxError;

/// Failures of the element source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Line decoding error: {0}")]
    Lines(#[from] LinesCodecError),

    #[error("Upstream error: {0}")]
    Upstream(#[source] BoxError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        assert_eq!(
            SourceError::Upstream("feed closed".into()).to_string(),
            "Upstream error: feed closed"
        );
        assert_eq!(
            SourceError::Lines(LinesCodecError::MaxLineLengthExceeded).to_string(),
            "Line decoding error: max line length exceeded"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let wrapped = SourceError::from(io_err);

        match wrapped {
            SourceError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }
}
