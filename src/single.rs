//! Terminal-value adapters
//!
//! One-shot results exposed as observables that emit at most one item. They
//! are thin layers over the Pull→Push bridge: a single result is just a
//! sequence of length zero or one.

use futures::FutureExt;
use futures_util::future;
use futures_util::stream::{self, StreamExt};
use std::future::Future;
use tokio::task::JoinHandle;

use crate::error::{StreamError, StreamResult};
use crate::pull_to_push::sequence_to_observable;
use crate::reactive::Observable;
use crate::sequence::from_fn;

/// Emit the output of a running task to every subscriber.
///
/// All subscribers share the one task. A task that was cancelled or panicked
/// fails the subscription; since a single must yield a value, cancellation of
/// the task itself is an error here rather than a graceful stop.
pub fn task_to_single<T>(task: JoinHandle<T>) -> impl Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    let result = task
        .map(|joined| {
            joined.map_err(|err| {
                if err.is_cancelled() {
                    StreamError::Upstream("task was cancelled".to_string())
                } else {
                    StreamError::from(err)
                }
            })
        })
        .boxed()
        .shared();
    sequence_to_observable(from_fn(move || stream::once(result.clone())))
}

/// Run `factory` for every subscriber and emit its value, if any.
pub fn deferred_to_maybe<T, F, Fut>(factory: F) -> impl Observable<T>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<Option<T>>> + Send + 'static,
{
    sequence_to_observable(from_fn(move || {
        stream::once(factory()).filter_map(|result| future::ready(result.transpose()))
    }))
}

/// Run `factory` for every subscriber and emit its value. A missing value
/// fails with `StreamError::NoElements`.
pub fn deferred_to_single<T, F, Fut>(factory: F) -> impl Observable<T>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<Option<T>>> + Send + 'static,
{
    sequence_to_observable(from_fn(move || {
        stream::once(factory()).map(|result| result.and_then(|value| value.ok_or(StreamError::NoElements)))
    }))
}
