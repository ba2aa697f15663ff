use crate::FetchError;

/// Produces content for a source locator (a path, URL, asset name, ...).
///
/// Runs on the queue's worker threads, so implementations must be `Send + Sync`. Blocking is
/// expected; a fetch that never returns occupies one concurrency slot for good, so enforce
/// timeouts here if the transport can stall.
pub trait Fetch<V>: Send + Sync + 'static {
    fn fetch(&self, source: &str) -> Result<V, FetchError>;
}

impl<V, F> Fetch<V> for F
where
    F: Fn(&str) -> Result<V, FetchError> + Send + Sync + 'static,
{
    fn fetch(&self, source: &str) -> Result<V, FetchError> {
        self(source)
    }
}

/// The cache cost of a loaded value, in pixels.
pub trait PixelCost {
    fn pixel_count(&self) -> u64;
}
