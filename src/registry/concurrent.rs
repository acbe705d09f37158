use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::{DashMap, Entry};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::error::RegistryError;
use super::traits::PipelineLauncher;
use crate::domain::{DomainError, RoutedPair, SubstreamStatus};

/// What happened to a routed pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Element appended to the substream's inbox
    Delivered,

    /// Key's substream was already closed; element dropped
    Discarded,
}

/// Per-key bookkeeping held in the registry
struct SubstreamSlot<E> {
    status: SubstreamStatus,
    inbox: Option<mpsc::Sender<E>>,
    routed: usize,
}

impl<E> SubstreamSlot<E> {
    fn open(inbox: mpsc::Sender<E>) -> Self {
        Self {
            status: SubstreamStatus::Open,
            inbox: Some(inbox),
            routed: 0,
        }
    }

    /// Apply a status transition, dropping the inbox once the slot stops
    /// accepting input. Returns whether the slot was open before.
    fn advance(&mut self, next: SubstreamStatus) -> Result<bool, DomainError> {
        let was_open = self.status.is_open();
        self.status = self.status.transition(next)?;
        if !self.status.is_open() {
            self.inbox = None;
        }
        Ok(was_open)
    }
}

enum Admission<E> {
    Send(mpsc::Sender<E>),
    Discard,
}

/// Bounded key -> substream registry backed by DashMap
///
/// Mutations of one key are serialized by its shard lock; unrelated keys in
/// other shards never wait on each other. The open counter is reserved with a
/// compare-and-swap so concurrent admissions cannot overshoot the bound.
pub struct SubstreamRegistry<K, E> {
    substreams: DashMap<K, SubstreamSlot<E>>,
    open: AtomicUsize,
    input_ended: AtomicBool,
    max_concurrent_keys: usize,
    buffer_capacity: usize,
}

impl<K, E> SubstreamRegistry<K, E>
where
    K: Eq + Hash + Clone + Debug,
    E: Send,
{
    /// Create an empty registry
    ///
    /// # Arguments
    /// * `max_concurrent_keys` - Maximum number of substreams open at once
    /// * `buffer_capacity` - Inbox capacity of each substream (backpressure bound)
    pub fn new(max_concurrent_keys: NonZeroUsize, buffer_capacity: NonZeroUsize) -> Self {
        Self {
            substreams: DashMap::new(),
            open: AtomicUsize::new(0),
            input_ended: AtomicBool::new(false),
            max_concurrent_keys: max_concurrent_keys.get(),
            buffer_capacity: buffer_capacity.get(),
        }
    }

    /// Route one pair to its key's substream
    ///
    /// Opens the substream (and launches its pipeline) on first sight of the
    /// key. Suspends while the substream's inbox is full.
    pub async fn route<L>(
        &self,
        pair: RoutedPair<E, K>,
        launcher: &L,
    ) -> Result<RouteOutcome, RegistryError>
    where
        L: PipelineLauncher<K, E>,
    {
        let RoutedPair { element, key } = pair;

        let inbox = match self.admit(&key, launcher)? {
            Admission::Send(inbox) => inbox,
            Admission::Discard => return Ok(RouteOutcome::Discarded),
        };

        trace!(key = ?key, "Routing element");

        // Receiver gone: the pipeline failed or was cancelled
        if inbox.send(element).await.is_err() {
            debug!(key = ?key, "Substream inbox closed, discarding element");
            return Ok(RouteOutcome::Discarded);
        }

        if let Some(mut slot) = self.substreams.get_mut(&key) {
            slot.routed += 1;
        }
        Ok(RouteOutcome::Delivered)
    }

    fn admit<L>(&self, key: &K, launcher: &L) -> Result<Admission<E>, RegistryError>
    where
        L: PipelineLauncher<K, E>,
    {
        if self.input_ended.load(Ordering::Acquire) {
            return Err(RegistryError::InputEnded(format!("{key:?}")));
        }

        match self.substreams.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let slot = entry.get();
                match (&slot.inbox, slot.status) {
                    (Some(inbox), SubstreamStatus::Open) => Ok(Admission::Send(inbox.clone())),
                    _ => {
                        debug!(
                            key = ?key,
                            status = %slot.status,
                            "Discarding element for closed substream"
                        );
                        Ok(Admission::Discard)
                    }
                }
            }
            Entry::Vacant(entry) => {
                let open = self.reserve(key)?;
                let (inbox, receiver) = mpsc::channel(self.buffer_capacity);

                entry.insert(SubstreamSlot::open(inbox.clone()));

                debug!(key = ?key, open, max = self.max_concurrent_keys, "Opened substream");
                launcher.launch(key.clone(), receiver);

                Ok(Admission::Send(inbox))
            }
        }
    }

    /// Claim one open slot, returning the new open count
    fn reserve(&self, key: &K) -> Result<usize, RegistryError> {
        let max = self.max_concurrent_keys;

        self.open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                (open < max).then_some(open + 1)
            })
            .map(|previous| previous + 1)
            .map_err(|_| {
                warn!(key = ?key, max, "Cardinality bound reached");
                RegistryError::CardinalityExceeded {
                    max,
                    key: format!("{key:?}"),
                }
            })
    }

    /// Signal that the source is exhausted
    ///
    /// Every open substream moves to `Closing` and its inbox is released so the
    /// pipeline drains and finishes. Returns how many substreams transitioned.
    pub fn end_of_input(&self) -> usize {
        if self.input_ended.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let mut closing = 0;
        for mut slot in self.substreams.iter_mut() {
            if !slot.status.is_open() {
                continue;
            }
            if let Ok(true) = slot.advance(SubstreamStatus::Closing) {
                self.open.fetch_sub(1, Ordering::AcqRel);
                closing += 1;
            }
        }

        debug!(closing, total = self.substreams.len(), "End of input");
        closing
    }

    /// Mark a substream `Closed` once its terminal value was taken
    ///
    /// Accepts `Closing` (normal completion) and `Open` (isolated failure).
    pub fn mark_closed(&self, key: &K) -> Result<(), RegistryError> {
        let mut slot = self
            .substreams
            .get_mut(key)
            .ok_or_else(|| RegistryError::UnknownSubstream(format!("{key:?}")))?;

        if slot.advance(SubstreamStatus::Closed)? {
            self.open.fetch_sub(1, Ordering::AcqRel);
        }

        trace!(key = ?key, routed = slot.routed, "Substream closed");
        Ok(())
    }

    /// Close every substream without further emission (cancellation path)
    ///
    /// Also rejects any later routing. Returns how many substreams were closed.
    pub fn close_all(&self) -> usize {
        self.input_ended.store(true, Ordering::Release);

        let mut closed = 0;
        for mut slot in self.substreams.iter_mut() {
            if slot.status.is_closed() {
                continue;
            }
            if let Ok(was_open) = slot.advance(SubstreamStatus::Closed) {
                if was_open {
                    self.open.fetch_sub(1, Ordering::AcqRel);
                }
                closed += 1;
            }
        }

        debug!(closed, "Closed all substreams");
        closed
    }

    /// True when every substream ever created is `Closed`
    pub fn all_closed(&self) -> bool {
        self.substreams.iter().all(|slot| slot.status.is_closed())
    }

    /// Number of substreams not yet `Closed`
    pub fn unsettled(&self) -> usize {
        self.substreams
            .iter()
            .filter(|slot| !slot.status.is_closed())
            .count()
    }

    pub fn status(&self, key: &K) -> Option<SubstreamStatus> {
        self.substreams.get(key).map(|slot| slot.status)
    }

    /// Number of elements delivered into `key`'s inbox
    pub fn routed(&self, key: &K) -> Option<usize> {
        self.substreams.get(key).map(|slot| slot.routed)
    }

    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    pub fn max_concurrent_keys(&self) -> usize {
        self.max_concurrent_keys
    }

    /// Number of substreams ever created
    pub fn len(&self) -> usize {
        self.substreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substreams.is_empty()
    }
}
