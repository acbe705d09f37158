use std::fmt::Debug;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::error::PipelineError;
use crate::domain::{Batcher, WindowTransform};
use crate::registry::PipelineLauncher;

/// Terminal values of one completed substream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstreamOutput<K, O> {
    pub key: K,
    /// One value per emitted window, in window order
    pub values: Vec<O>,
    /// Number of elements the substream received
    pub elements: usize,
}

impl<K, O> SubstreamOutput<K, O> {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-key batching + transform stage
pub struct SubstreamPipeline<K, E, T>
where
    T: WindowTransform<K, E>,
{
    key: K,
    transform: Arc<T>,
    batcher: Batcher<E>,
    values: Vec<T::Output>,
    elements: usize,
}

impl<K, E, T> SubstreamPipeline<K, E, T>
where
    K: Debug,
    T: WindowTransform<K, E>,
{
    /// Create a pipeline for `key`
    ///
    /// # Arguments
    /// * `transform` - Shared window transform
    /// * `batch_size` - Window size; `None` emits one window on finish
    pub fn new(key: K, transform: Arc<T>, batch_size: Option<NonZeroUsize>) -> Self {
        Self {
            key,
            transform,
            batcher: Batcher::new(batch_size),
            values: Vec::new(),
            elements: 0,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Append one element, transforming the window if it filled up
    pub fn push(&mut self, element: E) -> Result<(), PipelineError> {
        self.elements += 1;

        if let Some(window) = self.batcher.push(element) {
            self.emit(window)?;
        }
        Ok(())
    }

    /// No more input for this key: flush the partial window and hand over the values
    pub fn finish(mut self) -> Result<SubstreamOutput<K, T::Output>, PipelineError> {
        if let Some(window) = self.batcher.finish() {
            self.emit(window)?;
        }

        Ok(SubstreamOutput {
            key: self.key,
            values: self.values,
            elements: self.elements,
        })
    }

    fn emit(&mut self, window: Vec<E>) -> Result<(), PipelineError> {
        trace!(key = ?self.key, size = window.len(), "Emitting window");

        let value = self
            .transform
            .apply(&self.key, window)
            .map_err(|source| PipelineError::Transform {
                key: format!("{:?}", self.key),
                source,
            })?;
        self.values.push(value);
        Ok(())
    }

    /// Drain `inbox` until it closes, then finish
    ///
    /// Cancellation stops immediately and nothing is emitted.
    pub async fn run(
        mut self,
        mut inbox: mpsc::Receiver<E>,
        cancel: CancellationToken,
    ) -> Result<SubstreamOutput<K, T::Output>, PipelineError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                next = inbox.recv() => next,
            };

            match next {
                Some(element) => self.push(element)?,
                None => break,
            }
        }

        self.finish()
    }
}

/// A launched pipeline task awaiting collection
pub struct SubstreamHandle<K, O> {
    key: K,
    task: JoinHandle<Result<SubstreamOutput<K, O>, PipelineError>>,
}

impl<K, O> SubstreamHandle<K, O>
where
    K: Debug,
{
    pub fn new(key: K, task: JoinHandle<Result<SubstreamOutput<K, O>, PipelineError>>) -> Self {
        Self { key, task }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Wait for the pipeline, folding task failures into `PipelineError`
    pub async fn join(self) -> (K, Result<SubstreamOutput<K, O>, PipelineError>) {
        let SubstreamHandle { key, task } = self;

        let result = match task.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(PipelineError::Panicked {
                key: format!("{key:?}"),
            }),
            Err(_) => Err(PipelineError::Cancelled),
        };
        (key, result)
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Launcher that spawns each pipeline as a tokio task and forwards its handle
/// to the merger
pub struct SpawnLauncher<K, E, T>
where
    T: WindowTransform<K, E>,
{
    transform: Arc<T>,
    batch_size: Option<NonZeroUsize>,
    cancel: CancellationToken,
    launched: mpsc::UnboundedSender<SubstreamHandle<K, T::Output>>,
    _phantom: PhantomData<fn(E)>,
}

impl<K, E, T> SpawnLauncher<K, E, T>
where
    T: WindowTransform<K, E>,
{
    pub fn new(
        transform: Arc<T>,
        batch_size: Option<NonZeroUsize>,
        cancel: CancellationToken,
        launched: mpsc::UnboundedSender<SubstreamHandle<K, T::Output>>,
    ) -> Self {
        Self {
            transform,
            batch_size,
            cancel,
            launched,
            _phantom: PhantomData,
        }
    }
}

impl<K, E, T> PipelineLauncher<K, E> for SpawnLauncher<K, E, T>
where
    K: Debug + Clone + Send + Sync + 'static,
    E: Send + 'static,
    T: WindowTransform<K, E> + 'static,
{
    fn launch(&self, key: K, inbox: mpsc::Receiver<E>) {
        let pipeline =
            SubstreamPipeline::new(key.clone(), Arc::clone(&self.transform), self.batch_size);
        let task = tokio::spawn(pipeline.run(inbox, self.cancel.clone()));

        // Merger already gone: nobody will collect this pipeline
        if let Err(mpsc::error::SendError(handle)) =
            self.launched.send(SubstreamHandle::new(key, task))
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoxError, bracketed, map_window, transform_fn};

    fn formatter() -> Arc<impl WindowTransform<&'static str, &'static str, Output = String>> {
        Arc::new(map_window(|key: &&'static str, window: Vec<&'static str>| {
            bracketed(key, &window)
        }))
    }

    #[test]
    fn unbatched_pipeline_emits_single_window() {
        let mut pipeline = SubstreamPipeline::new("2", formatter(), None);
        pipeline.push("all: c").unwrap();
        pipeline.push("all: d").unwrap();

        let output = pipeline.finish().unwrap();
        assert_eq!(output.key, "2");
        assert_eq!(output.values, vec!["2[all: c, all: d]".to_string()]);
        assert_eq!(output.elements, 2);
    }

    #[test]
    fn batched_pipeline_emits_windows_in_order() {
        let mut pipeline = SubstreamPipeline::new("1", formatter(), NonZeroUsize::new(2));
        for element in ["a", "b", "c", "d", "e"] {
            pipeline.push(element).unwrap();
        }

        let output = pipeline.finish().unwrap();
        assert_eq!(
            output.values,
            vec![
                "1[a, b]".to_string(),
                "1[c, d]".to_string(),
                "1[e]".to_string()
            ]
        );
        assert_eq!(output.elements, 5);
    }

    #[test]
    fn pipeline_without_elements_emits_nothing() {
        let pipeline = SubstreamPipeline::new("1", formatter(), NonZeroUsize::new(3));
        let output = pipeline.finish().unwrap();
        assert!(output.is_empty());
        assert_eq!(output.elements, 0);
    }

    #[test]
    fn transform_error_names_key() {
        let transform = Arc::new(transform_fn(
            |_key: &u8, _window: Vec<u8>| -> Result<u8, BoxError> { Err("window rejected".into()) },
        ));

        let mut pipeline = SubstreamPipeline::new(9u8, transform, NonZeroUsize::new(1));
        let err = pipeline.push(1).unwrap_err();

        match err {
            PipelineError::Transform { key, source } => {
                assert_eq!(key, "9");
                assert_eq!(source.to_string(), "window rejected");
            }
            other => panic!("Expected Transform error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_drains_inbox_until_closed() {
        let (tx, rx) = mpsc::channel(4);
        let pipeline = SubstreamPipeline::new("1", formatter(), None);
        let task = tokio::spawn(pipeline.run(rx, CancellationToken::new()));

        for element in ["1: a", "1: b", "all: c"] {
            tx.send(element).await.unwrap();
        }
        drop(tx);

        let output = task.await.unwrap().unwrap();
        assert_eq!(output.values, vec!["1[1: a, 1: b, all: c]".to_string()]);
    }

    #[tokio::test]
    async fn cancelled_run_emits_nothing() {
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let pipeline = SubstreamPipeline::new("1", formatter(), None);
        let task = tokio::spawn(pipeline.run(rx, cancel.clone()));

        tx.send("1: a").await.unwrap();
        cancel.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn launcher_forwards_handles() {
        let (launched_tx, mut launched_rx) = mpsc::unbounded_channel();
        let launcher = SpawnLauncher::new(formatter(), None, CancellationToken::new(), launched_tx);

        let (tx, rx) = mpsc::channel(4);
        launcher.launch("2", rx);
        tx.send("all: c").await.unwrap();
        drop(tx);

        let handle = launched_rx.recv().await.unwrap();
        assert_eq!(*handle.key(), "2");

        let (key, result) = handle.join().await;
        assert_eq!(key, "2");
        assert_eq!(result.unwrap().values, vec!["2[all: c]".to_string()]);
    }

    #[tokio::test]
    async fn panicking_task_is_reported() {
        let task = tokio::spawn(async {
            if true {
                panic!("transform blew up");
            }
            Ok::<_, PipelineError>(SubstreamOutput {
                key: 1u8,
                values: Vec::<u8>::new(),
                elements: 0,
            })
        });

        let (key, result) = SubstreamHandle::new(1u8, task).join().await;
        assert_eq!(key, 1);
        assert!(matches!(result, Err(PipelineError::Panicked { .. })));
    }
}
