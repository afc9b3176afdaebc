//! Serialized, dispose-aware event emitter
//!
//! An `Emitter` guards one downstream (observer or subscriber). It delivers at
//! most one terminal event, stops delivering once the downstream disposes, and
//! owns a cancellable that is disposed when the subscription ends either way.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StreamError;
use crate::reactive::{BoxDisposable, BoxObserver, Disposable, Downstream};
use crate::registry::SubscriptionSlot;
use crate::terminal::{BridgeState, TerminalLatch, UndeliverablePolicy};

struct EmitterInner<T, D> {
    downstream: Mutex<Option<D>>,
    latch: TerminalLatch,
    cancellable: SubscriptionSlot,
    undeliverable: UndeliverablePolicy,
    _item: PhantomData<fn(T)>,
}

/// Producer-side handle for one subscription
pub struct Emitter<T, D = BoxObserver<T>> {
    inner: Arc<EmitterInner<T, D>>,
}

impl<T, D> Clone for Emitter<T, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Emitter<T, BoxObserver<T>> {
    /// Hand the observer its subscription handle, then start emitting to it.
    pub(crate) fn attach(mut observer: BoxObserver<T>, undeliverable: UndeliverablePolicy) -> Self {
        let emitter = Self::detached(undeliverable);
        observer.on_subscribe(Box::new(emitter.handle()));
        emitter.install(observer);
        emitter
    }
}

impl<T: 'static, D: Downstream<T> + 'static> Emitter<T, D> {
    /// An emitter with no downstream yet; events are dropped until `install`.
    pub(crate) fn detached(undeliverable: UndeliverablePolicy) -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                downstream: Mutex::new(None),
                latch: TerminalLatch::new(),
                cancellable: SubscriptionSlot::new(),
                undeliverable,
                _item: PhantomData,
            }),
        }
    }

    pub(crate) fn install(&self, downstream: D) {
        let mut guard = self.lock();
        if !self.inner.latch.is_terminated() {
            *guard = Some(downstream);
        }
    }

    /// The disposable given to the downstream
    pub(crate) fn handle(&self) -> EmitterHandle<T, D> {
        EmitterHandle {
            emitter: self.clone(),
        }
    }

    /// Mark the subscription as actively producing.
    pub(crate) fn start(&self) -> bool {
        self.inner.latch.start()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<D>> {
        self.inner
            .downstream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn take_downstream(&self) -> Option<D> {
        self.lock().take()
    }

    pub fn on_next(&self, item: T) {
        if self.inner.latch.is_terminated() {
            return;
        }
        let mut guard = self.lock();
        if self.inner.latch.is_terminated() {
            guard.take();
            return;
        }
        if let Some(downstream) = guard.as_mut() {
            downstream.next(item);
        }
        // disposed from inside the callback
        if self.inner.latch.is_terminated() {
            guard.take();
        }
    }

    pub fn on_complete(&self) {
        if !self.inner.latch.try_complete() {
            return;
        }
        if let Some(mut downstream) = self.take_downstream() {
            downstream.complete();
        }
        self.inner.cancellable.dispose();
    }

    /// Deliver `err` unless the subscription already ended.
    ///
    /// Returns `false` when the error could not be delivered.
    pub fn try_on_error(&self, err: StreamError) -> bool {
        self.deliver_error(err).is_ok()
    }

    /// Deliver `err`, routing it to the undeliverable policy if the
    /// subscription already ended.
    pub fn on_error(&self, err: StreamError) {
        if let Err(err) = self.deliver_error(err) {
            self.inner.undeliverable.report(err);
        }
    }

    fn deliver_error(&self, err: StreamError) -> Result<(), StreamError> {
        if !self.inner.latch.try_error() {
            return Err(err);
        }
        if let Some(mut downstream) = self.take_downstream() {
            downstream.error(err);
        }
        self.inner.cancellable.dispose();
        Ok(())
    }

    /// Register the resource to release when the subscription ends.
    ///
    /// A previous cancellable is disposed. If the subscription already
    /// ended, `cancellable` is disposed immediately.
    pub fn set_cancellable(&self, cancellable: BoxDisposable) {
        self.inner.cancellable.replace(cancellable);
    }

    /// Whether the subscription ended, by disposal or a terminal event
    pub fn is_disposed(&self) -> bool {
        self.inner.latch.is_terminated()
    }

    pub fn state(&self) -> BridgeState {
        self.inner.latch.state()
    }

    /// Downstream-initiated cancellation
    pub(crate) fn dispose(&self) {
        if self.inner.latch.try_cancel() {
            log::debug!("Subscription disposed by downstream");
        }
        self.inner.cancellable.dispose();
        // The lock is held while a callback runs; whoever holds it drops the
        // downstream on the way out.
        if let Ok(mut guard) = self.inner.downstream.try_lock() {
            guard.take();
        }
    }
}

/// Disposable view of an emitter, owned by the downstream
pub struct EmitterHandle<T, D> {
    emitter: Emitter<T, D>,
}

impl<T: 'static, D: Downstream<T> + 'static> EmitterHandle<T, D> {
    /// Where the subscription is in its lifecycle.
    ///
    /// A bridged subscription is `Pulling` from the moment its task is
    /// spawned. It can only be `Cancelled` straight from `Created` when the
    /// downstream disposes inside `on_subscribe`, before any task exists.
    pub fn state(&self) -> BridgeState {
        self.emitter.state()
    }
}

impl<T: 'static, D: Downstream<T> + 'static> Disposable for EmitterHandle<T, D> {
    fn dispose(&self) {
        self.emitter.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.emitter.is_disposed()
    }
}
