use std::fmt::Display;
use std::num::NonZeroUsize;

use super::error::BoxError;

/// Per-key transform applied to each window of a substream
pub trait WindowTransform<K, E>: Send + Sync {
    type Output: Send + 'static;

    fn apply(&self, key: &K, window: Vec<E>) -> Result<Self::Output, BoxError>;
}

/// Transform backed by a fallible closure
#[derive(Clone)]
pub struct TransformFn<F> {
    f: F,
}

/// Build a window transform from a closure that may fail
pub fn transform_fn<K, E, O, F>(f: F) -> TransformFn<F>
where
    F: Fn(&K, Vec<E>) -> Result<O, BoxError>,
{
    TransformFn { f }
}

impl<K, E, O, F> WindowTransform<K, E> for TransformFn<F>
where
    F: Fn(&K, Vec<E>) -> Result<O, BoxError> + Send + Sync,
    O: Send + 'static,
{
    type Output = O;

    fn apply(&self, key: &K, window: Vec<E>) -> Result<O, BoxError> {
        (self.f)(key, window)
    }
}

/// Transform backed by a closure that always succeeds
#[derive(Clone)]
pub struct MapWindow<F> {
    f: F,
}

/// Build a window transform from an infallible closure
///
/// # Example
/// ```rust,ignore
/// let transform = map_window(|topic: &String, window: Vec<String>| bracketed(topic, &window));
/// ```
pub fn map_window<K, E, O, F>(f: F) -> MapWindow<F>
where
    F: Fn(&K, Vec<E>) -> O,
{
    MapWindow { f }
}

impl<K, E, O, F> WindowTransform<K, E> for MapWindow<F>
where
    F: Fn(&K, Vec<E>) -> O + Send + Sync,
    O: Send + 'static,
{
    type Output = O;

    fn apply(&self, key: &K, window: Vec<E>) -> Result<O, BoxError> {
        Ok((self.f)(key, window))
    }
}

/// Format a window as `key[e1, e2, ...]`
pub fn bracketed<K, E>(key: &K, window: &[E]) -> String
where
    K: Display,
    E: Display,
{
    let body = window
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{key}[{body}]")
}

/// Groups elements into fixed-size windows in arrival order
///
/// Without a size the whole substream becomes a single window on `finish`.
#[derive(Debug)]
pub struct Batcher<E> {
    size: Option<NonZeroUsize>,
    window: Vec<E>,
}

impl<E> Batcher<E> {
    pub fn new(size: Option<NonZeroUsize>) -> Self {
        Self {
            size,
            window: Vec::with_capacity(size.map_or(0, NonZeroUsize::get)),
        }
    }

    /// Append an element, returning the window if it just filled up
    pub fn push(&mut self, element: E) -> Option<Vec<E>> {
        self.window.push(element);

        let size = self.size?.get();
        if self.window.len() < size {
            return None;
        }
        Some(std::mem::replace(&mut self.window, Vec::with_capacity(size)))
    }

    /// Take the trailing partial window, if any
    pub fn finish(&mut self) -> Option<Vec<E>> {
        if self.window.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.window))
        }
    }

    pub fn pending(&self) -> usize {
        self.window.len()
    }
}
