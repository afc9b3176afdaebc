//! Cold, restartable pull sources
//!
//! A `LazySequence` is a recipe for a stream: every `open` runs the
//! production logic again from the start, and nothing is shared between two
//! consumptions.

use async_stream::stream;
use futures::FutureExt;
use futures_core::Stream;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::channel::{self, ChannelSender};
use crate::error::{StreamError, StreamResult};
use crate::reactive::{AbortOnDispose, DisposeOnDrop};

/// A boxed, heap-allocated Rust Stream
pub type RS2Stream<O> = BoxStream<'static, O>;

/// Pull source that can be consumed any number of times, each time afresh
pub trait LazySequence<T>: Send + Sync {
    /// Start one independent consumption.
    ///
    /// Nothing runs until the returned stream is first polled.
    fn open(&self) -> RS2Stream<StreamResult<T>>;
}

impl<T, S: LazySequence<T> + ?Sized> LazySequence<T> for Arc<S> {
    fn open(&self) -> RS2Stream<StreamResult<T>> {
        (**self).open()
    }
}

/// Sequence backed by a stream factory, see [`from_fn`]
pub struct FromFn<F> {
    factory: F,
}

/// Build a sequence that calls `factory` for every consumption.
///
/// # Examples
/// ```
/// use rs2_bridge::sequence::{from_fn, LazySequence};
/// use futures_util::stream::{self, StreamExt};
///
/// # async fn example() {
/// let seq = from_fn(|| stream::iter(vec![Ok(1), Ok(2)]));
/// let first: Vec<_> = seq.open().collect().await;
/// let second: Vec<_> = seq.open().collect().await;
/// assert_eq!(first, second);
/// # }
/// ```
pub fn from_fn<T, F, S>(factory: F) -> FromFn<F>
where
    F: Fn() -> S + Send + Sync,
    S: Stream<Item = StreamResult<T>> + Send + 'static,
{
    FromFn { factory }
}

impl<T, F, S> LazySequence<T> for FromFn<F>
where
    F: Fn() -> S + Send + Sync,
    S: Stream<Item = StreamResult<T>> + Send + 'static,
{
    fn open(&self) -> RS2Stream<StreamResult<T>> {
        (self.factory)().boxed()
    }
}

/// Sequence replaying a fixed list of items
pub fn from_iter<T>(items: Vec<T>) -> impl LazySequence<T>
where
    T: Clone + Send + Sync + 'static,
{
    from_fn(move || stream::iter(items.clone().into_iter().map(Ok)))
}

/// Sequence fed by an async producer, see [`produce`]
pub struct Produce<F> {
    capacity: usize,
    producer: Arc<F>,
}

/// Build a sequence whose items are sent by `producer` through a bounded
/// channel.
///
/// Each consumption spawns the producer on first demand. `send` suspends the
/// producer while the channel is full. The producer's `Err` ends the stream
/// with that error; dropping the stream cancels the producer.
pub fn produce<T, F, Fut>(capacity: usize, producer: F) -> Produce<F>
where
    T: Send + 'static,
    F: Fn(ChannelSender<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<()>> + Send + 'static,
{
    Produce {
        capacity,
        producer: Arc::new(producer),
    }
}

impl<T, F, Fut> LazySequence<T> for Produce<F>
where
    T: Send + 'static,
    F: Fn(ChannelSender<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<()>> + Send + 'static,
{
    fn open(&self) -> RS2Stream<StreamResult<T>> {
        let capacity = self.capacity;
        let producer = Arc::clone(&self.producer);

        stream! {
            let runtime = match Handle::try_current() {
                Ok(runtime) => runtime,
                Err(err) => {
                    yield Err(StreamError::Runtime(err.to_string()));
                    return;
                }
            };

            let (tx, mut rx) = channel::bounded(capacity);
            let closer = tx.clone();
            let producing = producer(tx);
            let task = runtime.spawn(async move {
                let cause = match AssertUnwindSafe(producing).catch_unwind().await {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(err),
                    Err(payload) => Some(StreamError::from_panic(payload)),
                };
                closer.close(cause);
            });
            let _cancel_producer = DisposeOnDrop::new(AbortOnDispose::new(task.abort_handle()));

            while let Some(item) = rx.recv().await {
                yield item;
            }
        }
        .boxed()
    }
}
