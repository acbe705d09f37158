use std::marker::PhantomData;
use std::sync::Arc;

use futures::{Stream, stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{AbortOnError, ErrorPolicy};
use crate::config::GroupByConfig;
use crate::domain::{Classifier, WindowTransform};
use crate::engine::{KeyRouter, MergeResults, Merger, OperatorError, SpawnLauncher};
use crate::io::SourceError;
use crate::registry::SubstreamRegistry;

type OperatorResult<K, O> = Result<MergeResults<K, O>, OperatorError>;

/// Primary API: fan a source out by key, transform each substream, merge
///
/// Every element is classified into zero or more keys. Each distinct key gets
/// its own substream running concurrently in a tokio task, at most
/// `max_concurrent_keys` at once. Substreams are cut into windows of
/// `batch_size` elements (one window when unset), each window is transformed
/// into one terminal value, and all values are merged into a single result.
pub struct MultiGroupBy<E, C, T, P = AbortOnError> {
    classifier: C,
    transform: Arc<T>,
    error_policy: P,
    config: GroupByConfig,
    _phantom: PhantomData<fn(E)>,
}

impl<E, C, T> MultiGroupBy<E, C, T, AbortOnError>
where
    C: Classifier<E>,
    T: WindowTransform<C::Key, E>,
{
    /// Create an operator with default settings
    ///
    /// # Arguments
    /// * `max_concurrent_keys` - Upper bound on simultaneously open substreams
    /// * `classifier` - Maps each element to its keys
    /// * `transform` - Turns each window into a terminal value
    ///
    /// # Example
    /// ```rust,ignore
    /// let topics = keys_fn(|msg: &String| {
    ///     if msg.starts_with('1') { vec![1] } else { vec![1, 2] }
    /// });
    /// let formatter = map_window(|key: &u32, window: Vec<String>| bracketed(key, &window));
    /// let results = MultiGroupBy::new(2, topics, formatter)
    ///     .process_iter(messages)
    ///     .await?;
    /// ```
    pub fn new(max_concurrent_keys: usize, classifier: C, transform: T) -> Self {
        Self::from_config(GroupByConfig::new(max_concurrent_keys), classifier, transform)
    }

    /// Create an operator from loaded settings
    pub fn from_config(config: GroupByConfig, classifier: C, transform: T) -> Self {
        Self {
            classifier,
            transform: Arc::new(transform),
            error_policy: AbortOnError,
            config,
            _phantom: PhantomData,
        }
    }
}

impl<E, C, T, P> MultiGroupBy<E, C, T, P>
where
    E: Clone + Send + 'static,
    C: Classifier<E>,
    T: WindowTransform<C::Key, E> + 'static,
    P: ErrorPolicy,
{
    /// Cut each substream into windows of `size` elements (defaults to one window)
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = Some(size);
        self
    }

    /// Set the capacity of each per-key inbox (defaults to 16)
    ///
    /// A full inbox suspends routing, which stops pulling from the source.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Choose what a failed pipeline does to the operator (defaults to AbortOnError)
    ///
    /// # Example
    /// ```rust,ignore
    /// // Drop values of a failing key, keep the others
    /// operator.with_error_policy(IsolateKey)
    /// ```
    pub fn with_error_policy<Q: ErrorPolicy>(self, error_policy: Q) -> MultiGroupBy<E, C, T, Q> {
        MultiGroupBy {
            classifier: self.classifier,
            transform: self.transform,
            error_policy,
            config: self.config,
            _phantom: PhantomData,
        }
    }

    pub fn config(&self) -> &GroupByConfig {
        &self.config
    }

    /// Run the operator to completion on the current task
    ///
    /// Resolves once the source is exhausted and every substream delivered
    /// its values, or with the first fatal error. Dropping the returned future
    /// cancels every running substream.
    pub async fn process<S>(self, source: S) -> OperatorResult<C::Key, T::Output>
    where
        S: Stream<Item = Result<E, SourceError>>,
    {
        self.run(source, CancellationToken::new()).await
    }

    /// Run the operator over an infallible in-memory source
    pub async fn process_iter<I>(self, elements: I) -> OperatorResult<C::Key, T::Output>
    where
        I: IntoIterator<Item = E>,
    {
        self.process(stream::iter(elements.into_iter().map(Ok))).await
    }

    /// Run the operator on its own tokio task
    ///
    /// # Example
    /// ```rust,ignore
    /// let handle = operator.spawn(LineSource::from_file("feed.txt").await?);
    /// // ...
    /// handle.cancel();
    /// assert!(matches!(handle.join().await, Err(OperatorError::Cancelled)));
    /// ```
    pub fn spawn<S>(self, source: S) -> OperatorHandle<C::Key, T::Output>
    where
        S: Stream<Item = Result<E, SourceError>> + Send + 'static,
        C: 'static,
        P: 'static,
    {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(source, cancel.clone()));

        OperatorHandle { cancel, task }
    }

    async fn run<S>(self, source: S, cancel: CancellationToken) -> OperatorResult<C::Key, T::Output>
    where
        S: Stream<Item = Result<E, SourceError>>,
    {
        let settings = self.config.validate()?;
        // Cancels every pipeline once this call returns or is dropped
        let _guard = cancel.clone().drop_guard();

        let registry = Arc::new(SubstreamRegistry::new(
            settings.max_concurrent_keys,
            settings.buffer_capacity,
        ));
        let (launched_tx, launched_rx) = mpsc::unbounded_channel();

        let launcher = SpawnLauncher::new(
            self.transform,
            settings.batch_size,
            cancel.clone(),
            launched_tx,
        );
        let router = KeyRouter::new(
            self.classifier,
            launcher,
            Arc::clone(&registry),
            cancel.clone(),
        );
        let merger = Merger::new(Arc::clone(&registry), self.error_policy, cancel.clone());

        debug!(
            max_concurrent_keys = settings.max_concurrent_keys.get(),
            batch_size = ?settings.batch_size,
            buffer_capacity = settings.buffer_capacity.get(),
            "Starting multi group-by"
        );

        match tokio::try_join!(router.run(source), merger.collect(launched_rx)) {
            Ok((stats, substreams)) => {
                debug!(
                    substreams = substreams.len(),
                    elements = stats.elements,
                    discarded = stats.discarded,
                    "Multi group-by complete"
                );
                Ok(MergeResults { substreams, stats })
            }
            Err(error) => {
                cancel.cancel();
                let closed = registry.close_all();
                warn!(%error, closed, "Multi group-by failed");
                Err(error)
            }
        }
    }
}

/// Handle to an operator running on its own task
pub struct OperatorHandle<K, O> {
    cancel: CancellationToken,
    task: JoinHandle<OperatorResult<K, O>>,
}

impl<K, O> OperatorHandle<K, O> {
    /// Stop routing and every substream; `join` then yields `Cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> OperatorResult<K, O> {
        self.task.await?
    }
}
