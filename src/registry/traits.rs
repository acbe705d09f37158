use tokio::sync::mpsc;

/// Starts the pipeline behind a newly admitted key
///
/// Called by the registry exactly once per key, after the key's slot is
/// recorded and before its first element is sent. The pipeline owns `inbox`
/// and must drain it until it closes.
pub trait PipelineLauncher<K, E>: Send + Sync {
    fn launch(&self, key: K, inbox: mpsc::Receiver<E>);
}
