use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{OperatorError, PipelineError};
use super::pipeline::{SubstreamHandle, SubstreamOutput};
use super::router::RouterStats;
use crate::registry::{RegistryError, SubstreamRegistry};
use crate::streaming::ErrorPolicy;

/// Final result of one operator run
///
/// Substreams are listed in completion order, which is unrelated to the order
/// their keys were first seen.
#[derive(Debug, Clone)]
pub struct MergeResults<K, O> {
    pub substreams: Vec<SubstreamOutput<K, O>>,
    pub stats: RouterStats,
}

impl<K, O> MergeResults<K, O> {
    /// All terminal values, substream by substream
    pub fn values(&self) -> impl Iterator<Item = &O> {
        self.substreams.iter().flat_map(|output| output.values.iter())
    }

    pub fn into_values(self) -> Vec<O> {
        self.substreams
            .into_iter()
            .flat_map(|output| output.values)
            .collect()
    }

    /// Number of substreams that produced values
    pub fn total_substreams(&self) -> usize {
        self.substreams.len()
    }

    pub fn get(&self, key: &K) -> Option<&SubstreamOutput<K, O>>
    where
        K: PartialEq,
    {
        self.substreams.iter().find(|output| &output.key == key)
    }
}

/// Collects terminal values from every launched pipeline
pub struct Merger<K, E, O, P> {
    registry: Arc<SubstreamRegistry<K, E>>,
    error_policy: P,
    cancel: CancellationToken,
    _phantom: PhantomData<fn() -> O>,
}

impl<K, E, O, P> Merger<K, E, O, P>
where
    K: Eq + Hash + Clone + Debug,
    E: Send,
    P: ErrorPolicy,
{
    pub fn new(
        registry: Arc<SubstreamRegistry<K, E>>,
        error_policy: P,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            error_policy,
            cancel,
            _phantom: PhantomData,
        }
    }

    /// Await every pipeline announced on `launched`
    ///
    /// Returns once the launch channel is closed (no new substreams can
    /// appear), every launched pipeline finished, and the registry reports all
    /// substreams closed.
    pub async fn collect(
        self,
        mut launched: mpsc::UnboundedReceiver<SubstreamHandle<K, O>>,
    ) -> Result<Vec<SubstreamOutput<K, O>>, OperatorError> {
        let mut running = FuturesUnordered::new();
        let mut launching = true;
        let mut collected = Vec::new();

        while launching || !running.is_empty() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(OperatorError::Cancelled),
                handle = launched.recv(), if launching => match handle {
                    Some(handle) => running.push(handle.join()),
                    None => launching = false,
                },
                Some((key, result)) = running.next(), if !running.is_empty() => {
                    if let Some(output) = self.settle(key, result)? {
                        collected.push(output);
                    }
                }
            }
        }

        let unsettled = self.registry.unsettled();
        if unsettled > 0 {
            return Err(RegistryError::Unsettled(unsettled).into());
        }

        debug!(substreams = collected.len(), "Merge complete");
        Ok(collected)
    }

    /// Close the key and decide what its pipeline result contributes
    fn settle(
        &self,
        key: K,
        result: Result<SubstreamOutput<K, O>, PipelineError>,
    ) -> Result<Option<SubstreamOutput<K, O>>, OperatorError> {
        match result {
            Ok(output) => {
                self.registry.mark_closed(&key)?;
                debug!(
                    key = ?key,
                    values = output.values.len(),
                    elements = output.elements,
                    "Substream completed"
                );
                Ok((!output.is_empty()).then_some(output))
            }
            Err(PipelineError::Cancelled) => Err(OperatorError::Cancelled),
            Err(error) => {
                self.registry.mark_closed(&key)?;
                if self.error_policy.handle_pipeline_error(&error) {
                    return Ok(None);
                }
                self.cancel.cancel();
                Err(error.into())
            }
        }
    }
}
