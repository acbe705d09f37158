use std::fmt;

use super::error::DomainError;

/// Lifecycle status of one per-key substream
///
/// `(unseen) -> Open -> Closing -> Closed`. `Open -> Closed` is only taken when
/// a substream is torn down early (isolated failure or cancellation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstreamStatus {
    /// Accepting elements
    Open,

    /// End of input reached, pipeline still flushing
    Closing,

    /// Terminal value taken (or discarded); no further transitions
    Closed,
}

impl SubstreamStatus {
    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(self, next: SubstreamStatus) -> Result<SubstreamStatus, DomainError> {
        use SubstreamStatus::*;

        match (self, next) {
            (Open, Closing) | (Closing, Closed) | (Open, Closed) => Ok(next),
            (from, to) => Err(DomainError::InvalidTransition { from, to }),
        }
    }

    pub fn is_open(self) -> bool {
        self == SubstreamStatus::Open
    }

    pub fn is_closed(self) -> bool {
        self == SubstreamStatus::Closed
    }
}

impl fmt::Display for SubstreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubstreamStatus::Open => "open",
            SubstreamStatus::Closing => "closing",
            SubstreamStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_moves_to_closing_then_closed() {
        let status = SubstreamStatus::Open
            .transition(SubstreamStatus::Closing)
            .unwrap();
        assert_eq!(status, SubstreamStatus::Closing);

        let status = status.transition(SubstreamStatus::Closed).unwrap();
        assert!(status.is_closed());
    }

    #[test]
    fn open_can_close_early() {
        let status = SubstreamStatus::Open
            .transition(SubstreamStatus::Closed)
            .unwrap();
        assert!(status.is_closed());
    }

    #[test]
    fn closed_is_terminal() {
        for next in [
            SubstreamStatus::Open,
            SubstreamStatus::Closing,
            SubstreamStatus::Closed,
        ] {
            assert_eq!(
                SubstreamStatus::Closed.transition(next),
                Err(DomainError::InvalidTransition {
                    from: SubstreamStatus::Closed,
                    to: next,
                })
            );
        }
    }

    #[test]
    fn closing_cannot_reopen() {
        assert!(
            SubstreamStatus::Closing
                .transition(SubstreamStatus::Open)
                .is_err()
        );
    }

    #[test]
    fn open_to_open_is_rejected() {
        assert!(SubstreamStatus::Open.transition(SubstreamStatus::Open).is_err());
    }
}
