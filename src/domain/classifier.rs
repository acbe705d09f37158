use std::fmt::Debug;
use std::hash::Hash;

use super::error::BoxError;

/// Maps one element to the ordered keys it belongs to
///
/// Must be deterministic for identical input within one run. Returning no keys
/// drops the element; returning several keys duplicates it across substreams.
/// An error is fatal for the whole operator.
pub trait Classifier<E>: Send + Sync {
    type Key: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    fn classify(&self, element: &E) -> Result<Vec<Self::Key>, BoxError>;
}

/// Classifier backed by a fallible closure
#[derive(Clone)]
pub struct ClassifierFn<F> {
    f: F,
}

/// Build a classifier from a closure that may fail
///
/// # Example
/// ```rust,ignore
/// let classifier = classify_fn(|line: &String| {
///     let (topics, _) = line.split_once(':').ok_or("missing topic prefix")?;
///     Ok(topics.split(',').map(str::to_owned).collect())
/// });
/// ```
pub fn classify_fn<E, K, F>(f: F) -> ClassifierFn<F>
where
    F: Fn(&E) -> Result<Vec<K>, BoxError>,
{
    ClassifierFn { f }
}

impl<E, K, F> Classifier<E> for ClassifierFn<F>
where
    F: Fn(&E) -> Result<Vec<K>, BoxError> + Send + Sync,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    type Key = K;

    fn classify(&self, element: &E) -> Result<Vec<K>, BoxError> {
        (self.f)(element)
    }
}

/// Classifier backed by a closure that always succeeds
#[derive(Clone)]
pub struct KeysFn<F> {
    f: F,
}

/// Build a classifier from an infallible closure
pub fn keys_fn<E, K, F>(f: F) -> KeysFn<F>
where
    F: Fn(&E) -> Vec<K>,
{
    KeysFn { f }
}

impl<E, K, F> Classifier<E> for KeysFn<F>
where
    F: Fn(&E) -> Vec<K> + Send + Sync,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    type Key = K;

    fn classify(&self, element: &E) -> Result<Vec<K>, BoxError> {
        Ok((self.f)(element))
    }
}

/// One element paired with one of its keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedPair<E, K> {
    pub element: E,
    pub key: K,
}

impl<E: Clone, K> RoutedPair<E, K> {
    pub fn new(element: E, key: K) -> Self {
        Self { element, key }
    }

    /// Expand an element into one pair per key, in key order
    ///
    /// The element is cloned for every key but the last, which takes ownership.
    pub fn expand(element: E, mut keys: Vec<K>) -> Vec<RoutedPair<E, K>> {
        let Some(last) = keys.pop() else {
            return Vec::new();
        };

        let mut pairs: Vec<_> = keys
            .into_iter()
            .map(|key| RoutedPair::new(element.clone(), key))
            .collect();
        pairs.push(RoutedPair::new(element, last));
        pairs
    }
}
