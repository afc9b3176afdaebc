//! Pull→Push: expose a lazy sequence as a cold push source
//!
//! Every subscriber gets its own bridging task that opens the sequence afresh
//! and pulls it to the end, pushing each item as it arrives. Disposing the
//! subscription aborts that task and nothing else; other subscribers keep
//! running.
//!
//! Per subscriber:
//!
//! ```text
//!   Created ──▶ Pulling ──▶ Completed | Errored | Cancelled
//! ```

use futures::FutureExt;
use futures_util::stream::StreamExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::error::{StreamError, StreamResult};
use crate::reactive::{
    AbortOnDispose, BoxObserver, BoxSubscriber, Disposable, Downstream, Emitter, EmitterHandle,
    Observable, Publisher, Subscription,
};
use crate::sequence::{LazySequence, RS2Stream};
use crate::stream_configuration::BridgeConfig;
use crate::terminal::{BridgeState, Terminal, UndeliverablePolicy};

/// A lazy sequence exposed as a cold `Observable`
pub struct SequenceObservable<S> {
    sequence: Arc<S>,
    config: BridgeConfig,
}

impl<S> Clone for SequenceObservable<S> {
    fn clone(&self) -> Self {
        Self {
            sequence: Arc::clone(&self.sequence),
            config: self.config.clone(),
        }
    }
}

/// Expose `sequence` as a cold observable.
pub fn sequence_to_observable<T, S>(sequence: S) -> SequenceObservable<S>
where
    T: Send + 'static,
    S: LazySequence<T> + 'static,
{
    sequence_to_observable_with(sequence, BridgeConfig::default())
}

/// Expose `sequence` as a cold observable using `config`.
pub fn sequence_to_observable_with<T, S>(sequence: S, config: BridgeConfig) -> SequenceObservable<S>
where
    T: Send + 'static,
    S: LazySequence<T> + 'static,
{
    SequenceObservable {
        sequence: Arc::new(sequence),
        config,
    }
}

impl<S> SequenceObservable<S> {
    /// Route errors whose subscriber is already gone through `policy`.
    pub fn with_undeliverable(mut self, policy: UndeliverablePolicy) -> Self {
        self.config.undeliverable = policy;
        self
    }
}

impl<S> SequenceObservable<S> {
    /// Subscribe and keep a handle on the bridging subscription.
    pub fn subscribe_tracked<T>(&self, observer: BoxObserver<T>) -> EmitterHandle<T, BoxObserver<T>>
    where
        T: Send + 'static,
        S: LazySequence<T> + 'static,
    {
        let emitter = Emitter::attach(observer, self.config.undeliverable.clone());
        spawn_bridge(&*self.sequence, &self.config, emitter.clone(), None);
        emitter.handle()
    }
}

impl<T, S> Observable<T> for SequenceObservable<S>
where
    T: Send + 'static,
    S: LazySequence<T> + 'static,
{
    fn subscribe(&self, observer: BoxObserver<T>) {
        self.subscribe_tracked(observer);
    }
}

/// A lazy sequence exposed as a demand-driven `Publisher`
pub struct SequencePublisher<S> {
    sequence: Arc<S>,
    config: BridgeConfig,
}

impl<S> Clone for SequencePublisher<S> {
    fn clone(&self) -> Self {
        Self {
            sequence: Arc::clone(&self.sequence),
            config: self.config.clone(),
        }
    }
}

/// Expose `sequence` as a publisher that only pulls what was requested.
pub fn sequence_to_publisher<T, S>(sequence: S) -> SequencePublisher<S>
where
    T: Send + 'static,
    S: LazySequence<T> + 'static,
{
    sequence_to_publisher_with(sequence, BridgeConfig::default())
}

/// Expose `sequence` as a demand-driven publisher using `config`.
pub fn sequence_to_publisher_with<T, S>(sequence: S, config: BridgeConfig) -> SequencePublisher<S>
where
    T: Send + 'static,
    S: LazySequence<T> + 'static,
{
    SequencePublisher {
        sequence: Arc::new(sequence),
        config,
    }
}

impl<S> SequencePublisher<S> {
    /// Subscribe and keep a handle on the bridging subscription.
    pub fn subscribe_tracked<T>(&self, mut subscriber: BoxSubscriber<T>) -> Arc<BridgeSubscription<T>>
    where
        T: Send + 'static,
        S: LazySequence<T> + 'static,
    {
        let emitter: Emitter<T, BoxSubscriber<T>> = Emitter::detached(self.config.undeliverable.clone());
        let demand = Arc::new(Demand::new());
        let subscription = Arc::new(BridgeSubscription {
            handle: emitter.handle(),
            demand: Arc::clone(&demand),
        });
        subscriber.on_subscribe(subscription.clone());
        emitter.install(subscriber);
        spawn_bridge(&*self.sequence, &self.config, emitter, Some(demand));
        subscription
    }
}

impl<T, S> Publisher<T> for SequencePublisher<S>
where
    T: Send + 'static,
    S: LazySequence<T> + 'static,
{
    fn subscribe(&self, subscriber: BoxSubscriber<T>) {
        self.subscribe_tracked(subscriber);
    }
}

/// Outstanding demand of one publisher subscription
struct Demand {
    requested: AtomicU64,
    invalid: AtomicBool,
    notify: Notify,
}

impl Demand {
    fn new() -> Self {
        Self {
            requested: AtomicU64::new(0),
            invalid: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    fn add(&self, n: u64) {
        if n == 0 {
            self.invalid.store(true, Ordering::Release);
        } else {
            let _ = self
                .requested
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    Some(current.saturating_add(n))
                });
        }
        self.notify.notify_one();
    }

    /// Take one unit of demand, waiting until there is some.
    /// `u64::MAX` is unbounded and never decremented.
    async fn acquire(&self) -> StreamResult<()> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.invalid.load(Ordering::Acquire) {
                return Err(StreamError::InvalidRequest(0));
            }
            let taken = self
                .requested
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match current {
                    0 => None,
                    u64::MAX => Some(u64::MAX),
                    n => Some(n - 1),
                });
            if taken.is_ok() {
                return Ok(());
            }
            notified.await;
        }
    }
}

/// Subscription handed to publisher subscribers
pub struct BridgeSubscription<T: 'static> {
    handle: EmitterHandle<T, BoxSubscriber<T>>,
    demand: Arc<Demand>,
}

impl<T: 'static> BridgeSubscription<T> {
    /// Lifecycle state, see [`EmitterHandle::state`]
    pub fn state(&self) -> BridgeState {
        self.handle.state()
    }

    /// Demand not yet consumed; `u64::MAX` means unbounded
    pub fn outstanding(&self) -> u64 {
        self.demand.requested.load(Ordering::Acquire)
    }
}

impl<T: 'static> Subscription for BridgeSubscription<T> {
    fn request(&self, n: u64) {
        self.demand.add(n);
    }

    fn cancel(&self) {
        self.handle.dispose();
    }
}

/// Open `sequence` and start a bridging task for `emitter`.
fn spawn_bridge<T, S, D>(
    sequence: &S,
    config: &BridgeConfig,
    emitter: Emitter<T, D>,
    demand: Option<Arc<Demand>>,
) where
    T: Send + 'static,
    S: LazySequence<T> + ?Sized,
    D: Downstream<T> + 'static,
{
    if emitter.is_disposed() {
        log::debug!("Subscriber disposed during subscribe; not starting bridging task");
        return;
    }
    let runtime = match config.runtime_handle() {
        Ok(runtime) => runtime,
        Err(err) => {
            emitter.on_error(err);
            return;
        }
    };
    // Pulling starts together with the task; disposal from here on cancels it.
    if !emitter.start() {
        log::debug!("Subscriber disposed before the bridging task started");
        return;
    }
    let task = runtime.spawn(pump(sequence.open(), emitter.clone(), demand));
    // Disposal that already happened aborts the task right here.
    emitter.set_cancellable(Box::new(AbortOnDispose::new(task.abort_handle())));
}

/// Pull `stream` to the end, pushing every item into `emitter`.
async fn pump<T, D>(mut stream: RS2Stream<StreamResult<T>>, emitter: Emitter<T, D>, demand: Option<Arc<Demand>>)
where
    T: Send + 'static,
    D: Downstream<T> + 'static,
{
    loop {
        if emitter.is_disposed() {
            return;
        }
        if let Some(demand) = &demand {
            if let Err(err) = demand.acquire().await {
                emitter.on_error(err);
                return;
            }
            if emitter.is_disposed() {
                return;
            }
        }

        let pulled = match AssertUnwindSafe(stream.next()).catch_unwind().await {
            Ok(pulled) => pulled,
            Err(payload) => Some(Err(StreamError::from_panic(payload))),
        };
        match Terminal::classify(pulled) {
            Terminal::Next(item) => emitter.on_next(item),
            Terminal::Complete => {
                log::debug!("Sequence finished; completing subscriber");
                emitter.on_complete();
                return;
            }
            Terminal::Error(err) => {
                log::debug!("Sequence failed: {}", err);
                // Undeliverable errors go to the emitter's policy.
                emitter.on_error(err);
                return;
            }
        }
    }
}
