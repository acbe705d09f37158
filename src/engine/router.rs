use std::pin::pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::error::OperatorError;
use crate::domain::{Classifier, RoutedPair};
use crate::io::SourceError;
use crate::registry::{PipelineLauncher, RouteOutcome, SubstreamRegistry};

/// Counters collected while routing one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Elements pulled from the source
    pub elements: u64,
    /// Routed pairs (one per element/key combination)
    pub pairs: u64,
    /// Elements that matched no key
    pub unclassified: u64,
    /// Pairs dropped because their substream was already closed
    pub discarded: u64,
}

/// Single producer pulling from the source and routing by key
pub struct KeyRouter<E, C, L>
where
    C: Classifier<E>,
{
    classifier: C,
    launcher: L,
    registry: Arc<SubstreamRegistry<C::Key, E>>,
    cancel: CancellationToken,
}

impl<E, C, L> KeyRouter<E, C, L>
where
    E: Clone + Send,
    C: Classifier<E>,
    L: PipelineLauncher<C::Key, E>,
{
    pub fn new(
        classifier: C,
        launcher: L,
        registry: Arc<SubstreamRegistry<C::Key, E>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            classifier,
            launcher,
            registry,
            cancel,
        }
    }

    /// Route the whole source, then signal end of input to the registry
    ///
    /// The launcher is dropped when this returns, which tells the merger that
    /// no further substreams can appear.
    pub async fn run<S>(self, source: S) -> Result<RouterStats, OperatorError>
    where
        S: Stream<Item = Result<E, SourceError>>,
    {
        let mut source = pin!(source);
        let mut stats = RouterStats::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(OperatorError::Cancelled),
                next = source.next() => next,
            };

            let Some(item) = next else {
                break;
            };
            let element = item?;
            stats.elements += 1;

            let keys = self
                .classifier
                .classify(&element)
                .map_err(OperatorError::ClassificationFailure)?;

            if keys.is_empty() {
                stats.unclassified += 1;
                trace!(element = stats.elements, "Element matched no keys");
                continue;
            }

            for pair in RoutedPair::expand(element, keys) {
                let outcome = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(OperatorError::Cancelled),
                    outcome = self.registry.route(pair, &self.launcher) => outcome?,
                };

                stats.pairs += 1;
                if outcome == RouteOutcome::Discarded {
                    stats.discarded += 1;
                }
            }
        }

        let closing = self.registry.end_of_input();
        debug!(
            elements = stats.elements,
            pairs = stats.pairs,
            unclassified = stats.unclassified,
            closing,
            "Source exhausted"
        );

        Ok(stats)
    }
}
