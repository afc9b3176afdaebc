//! Recording observers for tests and diagnostics

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::StreamError;
use crate::reactive::{BoxDisposable, BoxObserver, BoxSubscriber, Observer, Subscriber, Subscription};

struct Recorded<T> {
    values: Vec<T>,
    errors: Vec<StreamError>,
    completions: usize,
    subscriptions: usize,
}

struct Recorder<T> {
    events: Mutex<Recorded<T>>,
    notify: Notify,
}

impl<T> Recorder<T> {
    fn new() -> Self {
        Self {
            events: Mutex::new(Recorded {
                values: Vec::new(),
                errors: Vec::new(),
                completions: 0,
                subscriptions: 0,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorded<T>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, f: impl FnOnce(&mut Recorded<T>)) {
        f(&mut self.lock());
        self.notify.notify_waiters();
    }

    async fn wait_until(&self, timeout: Duration, cond: impl Fn(&Recorded<T>) -> bool) -> bool {
        let waiting = async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                let done = cond(&self.lock());
                if done {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, waiting).await.is_ok()
    }
}

macro_rules! recorder_accessors {
    () => {
        pub fn values(&self) -> Vec<T>
        where
            T: Clone,
        {
            self.recorder.lock().values.clone()
        }

        pub fn errors(&self) -> Vec<StreamError> {
            self.recorder.lock().errors.clone()
        }

        pub fn completions(&self) -> usize {
            self.recorder.lock().completions
        }

        /// Completions plus errors; anything above one breaks the protocol
        pub fn terminal_count(&self) -> usize {
            let events = self.recorder.lock();
            events.completions + events.errors.len()
        }

        pub fn subscriptions(&self) -> usize {
            self.recorder.lock().subscriptions
        }

        /// Wait until a terminal event arrives
        pub async fn await_terminal(&self, timeout: Duration) -> bool {
            self.recorder
                .wait_until(timeout, |e| e.completions + e.errors.len() > 0)
                .await
        }

        /// Wait until at least `n` values arrived
        pub async fn await_count(&self, n: usize, timeout: Duration) -> bool {
            self.recorder.wait_until(timeout, |e| e.values.len() >= n).await
        }
    };
}

/// Records everything an `Observable` delivers
pub struct TestObserver<T> {
    recorder: Arc<Recorder<T>>,
    handle: Arc<Mutex<Option<BoxDisposable>>>,
}

impl<T> Clone for TestObserver<T> {
    fn clone(&self) -> Self {
        Self {
            recorder: Arc::clone(&self.recorder),
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<T: Send + 'static> TestObserver<T> {
    pub fn new() -> Self {
        Self {
            recorder: Arc::new(Recorder::new()),
            handle: Arc::new(Mutex::new(None)),
        }
    }

    /// The observer half to pass to `subscribe`
    pub fn observer(&self) -> BoxObserver<T> {
        Box::new(self.clone())
    }

    pub fn dispose(&self) {
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = handle.as_ref() {
            handle.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        handle.as_ref().map_or(false, |h| h.is_disposed())
    }

    recorder_accessors!();
}

impl<T: Send + 'static> Default for TestObserver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Observer<T> for TestObserver<T> {
    fn on_subscribe(&mut self, handle: BoxDisposable) {
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        self.recorder.record(|e| e.subscriptions += 1);
    }

    fn on_next(&mut self, item: T) {
        self.recorder.record(|e| e.values.push(item));
    }

    fn on_error(&mut self, err: StreamError) {
        self.recorder.record(|e| e.errors.push(err));
    }

    fn on_complete(&mut self) {
        self.recorder.record(|e| e.completions += 1);
    }
}

/// Records everything a `Publisher` delivers and drives its demand
pub struct TestSubscriber<T> {
    recorder: Arc<Recorder<T>>,
    subscription: Arc<Mutex<Option<Arc<dyn Subscription>>>>,
    initial_request: u64,
}

impl<T> Clone for TestSubscriber<T> {
    fn clone(&self) -> Self {
        Self {
            recorder: Arc::clone(&self.recorder),
            subscription: Arc::clone(&self.subscription),
            initial_request: self.initial_request,
        }
    }
}

impl<T: Send + 'static> TestSubscriber<T> {
    /// A subscriber that requests everything on subscribe
    pub fn new() -> Self {
        Self::with_initial_request(u64::MAX)
    }

    /// A subscriber that requests `n` on subscribe; `0` requests nothing
    pub fn with_initial_request(n: u64) -> Self {
        Self {
            recorder: Arc::new(Recorder::new()),
            subscription: Arc::new(Mutex::new(None)),
            initial_request: n,
        }
    }

    /// The subscriber half to pass to `subscribe`
    pub fn subscriber(&self) -> BoxSubscriber<T> {
        Box::new(self.clone())
    }

    fn current(&self) -> Option<Arc<dyn Subscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request(&self, n: u64) {
        if let Some(subscription) = self.current() {
            subscription.request(n);
        }
    }

    pub fn cancel(&self) {
        if let Some(subscription) = self.current() {
            subscription.cancel();
        }
    }

    recorder_accessors!();
}

impl<T: Send + 'static> Default for TestSubscriber<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Subscriber<T> for TestSubscriber<T> {
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&subscription));
        self.recorder.record(|e| e.subscriptions += 1);
        if self.initial_request > 0 {
            subscription.request(self.initial_request);
        }
    }

    fn on_next(&mut self, item: T) {
        self.recorder.record(|e| e.values.push(item));
    }

    fn on_error(&mut self, err: StreamError) {
        self.recorder.record(|e| e.errors.push(err));
    }

    fn on_complete(&mut self) {
        self.recorder.record(|e| e.completions += 1);
    }
}
