//! Push→Pull: consume an `Observable` as a lazy pull sequence
//!
//! Every consumption subscribes to the source once, on first demand. Pushed
//! values land in a bounded channel that the consumer drains; a full channel
//! blocks the pushing callback, which is how a slow consumer holds back the
//! source. Dropping the stream disposes the upstream subscription, and a
//! subscription handle that shows up after that is disposed on arrival.
//!
//! A hot source that pushes on a current-thread runtime worker cannot be held
//! back: once the buffer is full the consumption fails with
//! `StreamError::Runtime` and the upstream is disposed.

use async_stream::stream;
use futures_util::stream::StreamExt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::channel::{self, ChannelError, ChannelSender};
use crate::error::{StreamError, StreamResult};
use crate::reactive::{BoxDisposable, DisposeOnDrop, Observable, Observer};
use crate::registry::SubscriptionSlot;
use crate::sequence::{LazySequence, RS2Stream};
use crate::stream_configuration::BridgeConfig;

/// A push source viewed as a restartable pull sequence
pub struct ObservableSequence<O> {
    source: Arc<O>,
    config: BridgeConfig,
}

impl<O> Clone for ObservableSequence<O> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            config: self.config.clone(),
        }
    }
}

/// Bridge `source` into a lazy sequence buffering at most `capacity` items.
pub fn observable_to_sequence<T, O>(source: O, capacity: usize) -> ObservableSequence<O>
where
    T: Send + 'static,
    O: Observable<T> + 'static,
{
    observable_to_sequence_with(source, BridgeConfig::default().with_buffer_capacity(capacity))
}

/// Bridge `source` into a lazy sequence using `config`.
pub fn observable_to_sequence_with<T, O>(source: O, config: BridgeConfig) -> ObservableSequence<O>
where
    T: Send + 'static,
    O: Observable<T> + 'static,
{
    ObservableSequence {
        source: Arc::new(source),
        config,
    }
}

/// Single-use convenience: one consumption of `source` as a stream.
///
/// # Examples
/// ```
/// use rs2_bridge::push_to_pull::observable_to_stream;
/// use rs2_bridge::reactive::from_iter;
/// use futures_util::stream::StreamExt;
///
/// # async fn example() {
/// let items: Vec<_> = observable_to_stream(from_iter(vec![1, 2, 3]), 16).collect().await;
/// assert_eq!(items, vec![Ok(1), Ok(2), Ok(3)]);
/// # }
/// ```
pub fn observable_to_stream<T, O>(source: O, capacity: usize) -> RS2Stream<StreamResult<T>>
where
    T: Send + 'static,
    O: Observable<T> + 'static,
{
    observable_to_sequence(source, capacity).open()
}

impl<O> ObservableSequence<O> {
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl<T, O> LazySequence<T> for ObservableSequence<O>
where
    T: Send + 'static,
    O: Observable<T> + 'static,
{
    fn open(&self) -> RS2Stream<StreamResult<T>> {
        let source = Arc::clone(&self.source);
        let capacity = self.config.buffer_capacity;
        let runtime = self.config.runtime.clone();

        stream! {
            let runtime = match runtime.map(Ok).unwrap_or_else(Handle::try_current) {
                Ok(runtime) => runtime,
                Err(err) => {
                    yield Err(StreamError::Runtime(err.to_string()));
                    return;
                }
            };

            let (tx, mut rx) = channel::bounded(capacity);
            let slot = Arc::new(SubscriptionSlot::new());
            let _dispose_upstream = DisposeOnDrop::new(Arc::clone(&slot));

            let observer = ChannelObserver {
                sender: Some(tx.clone()),
                slot: Arc::clone(&slot),
            };
            log::debug!("Subscribing to push source (buffer capacity {})", capacity);
            // Synchronous sources emit from inside `subscribe`, so it runs
            // where blocking sends are allowed.
            let _subscribing = runtime.spawn_blocking(move || {
                let closer = tx;
                let subscribed = channel::in_blocking_region(|| {
                    catch_unwind(AssertUnwindSafe(|| source.subscribe(Box::new(observer))))
                });
                if let Err(payload) = subscribed {
                    closer.close(Some(StreamError::from_panic(payload)));
                }
            });

            while let Some(item) = rx.recv().await {
                yield item;
            }
        }
        .boxed()
    }
}

/// Observer feeding one consumption's channel
struct ChannelObserver<T> {
    sender: Option<ChannelSender<T>>,
    slot: Arc<SubscriptionSlot>,
}

impl<T: Send + 'static> Observer<T> for ChannelObserver<T> {
    fn on_subscribe(&mut self, handle: BoxDisposable) {
        if !self.slot.set_once(handle) {
            log::debug!("Consumer already gone; disposed late subscription");
        }
    }

    fn on_next(&mut self, item: T) {
        if self.slot.is_disposed() {
            return;
        }
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        match sender.send_blocking(item) {
            Ok(()) => {}
            Err(ChannelError::WouldBlock(_)) => {
                // Hot source emitting on a current-thread worker that would
                // have to wait for its own consumer.
                log::warn!("Push source overran the buffer on a current-thread runtime worker");
                sender.close(Some(StreamError::Runtime(
                    "push source emitted into a full buffer on a current-thread runtime worker".to_string(),
                )));
                self.sender = None;
                self.slot.dispose();
            }
            Err(err) => {
                log::debug!("Dropping pushed item: {}", err);
                self.sender = None;
                self.slot.dispose();
            }
        }
    }

    fn on_error(&mut self, err: StreamError) {
        match self.sender.take() {
            Some(sender) => {
                sender.close(Some(err));
            }
            None => log::trace!("Ignoring error after termination: {}", err),
        }
    }

    fn on_complete(&mut self) {
        if let Some(sender) = self.sender.take() {
            sender.close(None);
        }
    }
}
