//! Consumer capability.

/// Receives dispatched messages for the key it is subscribed to.
///
/// `consume` runs on the queue's worker thread, so implementations should be
/// fast and must not block indefinitely; a slow consumer delays every other
/// key. Failures are the consumer's own business: a panic that escapes is
/// caught by the worker, logged, and the message still counts as delivered.
pub trait Consumer: Send + Sync {
    fn consume(&self);
}

/// Adapter turning a closure into a [`Consumer`].
#[derive(Debug, Clone, Copy)]
pub struct FnConsumer<F>(F);

impl<F> Consumer for FnConsumer<F>
where
    F: Fn() + Send + Sync,
{
    fn consume(&self) {
        (self.0)()
    }
}

/// Build a consumer from a closure.
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use keyqueue::{Consumer, consumer_fn};
///
/// let hits = Arc::new(AtomicU32::new(0));
/// let counter = hits.clone();
/// let consumer = consumer_fn(move || {
///     counter.fetch_add(1, Ordering::Relaxed);
/// });
/// consumer.consume();
/// assert_eq!(hits.load(Ordering::Relaxed), 1);
/// ```
pub fn consumer_fn<F>(f: F) -> FnConsumer<F>
where
    F: Fn() + Send + Sync,
{
    FnConsumer(f)
}
