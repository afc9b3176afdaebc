//! Disposable subscription handles

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::task::AbortHandle;

/// An opaque token for an active upstream relationship.
///
/// `dispose` may be called any number of times from any thread; only the
/// first call has an effect.
pub trait Disposable: Send + Sync {
    fn dispose(&self);
    fn is_disposed(&self) -> bool;
}

pub type BoxDisposable = Box<dyn Disposable>;

impl<D: Disposable + ?Sized> Disposable for std::sync::Arc<D> {
    fn dispose(&self) {
        (**self).dispose()
    }

    fn is_disposed(&self) -> bool {
        (**self).is_disposed()
    }
}

/// A disposable that only records whether it was disposed
#[derive(Debug, Default)]
pub struct BooleanDisposable {
    disposed: AtomicBool,
}

impl BooleanDisposable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Disposable for BooleanDisposable {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Runs a closure the first time it is disposed
pub struct ActionDisposable {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    disposed: AtomicBool,
}

impl ActionDisposable {
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            action: Mutex::new(Some(Box::new(action))),
            disposed: AtomicBool::new(false),
        }
    }
}

impl Disposable for ActionDisposable {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let action = self
            .action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(action) = action {
            action();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ActionDisposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDisposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Cancels a tokio task when disposed
#[derive(Debug)]
pub struct AbortOnDispose {
    handle: AbortHandle,
    disposed: AtomicBool,
}

impl AbortOnDispose {
    pub fn new(handle: AbortHandle) -> Self {
        Self {
            handle,
            disposed: AtomicBool::new(false),
        }
    }
}

impl Disposable for AbortOnDispose {
    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.handle.abort();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Disposes the wrapped handle when dropped
#[derive(Debug)]
pub struct DisposeOnDrop<D: Disposable>(D);

impl<D: Disposable> DisposeOnDrop<D> {
    pub fn new(handle: D) -> Self {
        Self(handle)
    }
}

impl<D: Disposable> Drop for DisposeOnDrop<D> {
    fn drop(&mut self) {
        self.0.dispose();
    }
}
