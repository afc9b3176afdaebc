//! Callback interfaces for push consumers

use std::sync::Arc;

use crate::error::StreamError;
use crate::reactive::BoxDisposable;

/// Receives the events of one `Observable` subscription.
///
/// Calls are serialized: `on_subscribe` first, then any number of `on_next`,
/// then at most one of `on_error` / `on_complete`.
pub trait Observer<T>: Send {
    fn on_subscribe(&mut self, handle: BoxDisposable);
    fn on_next(&mut self, item: T);
    fn on_error(&mut self, err: StreamError);
    fn on_complete(&mut self);
}

pub type BoxObserver<T> = Box<dyn Observer<T>>;

/// Demand channel handed to a `Subscriber`
pub trait Subscription: Send + Sync {
    /// Allow `n` more items. `0` is a protocol violation and fails the
    /// subscription.
    fn request(&self, n: u64);
    fn cancel(&self);
}

/// Receives the events of one `Publisher` subscription. Items only arrive
/// against outstanding `request`s.
pub trait Subscriber<T>: Send {
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>);
    fn on_next(&mut self, item: T);
    fn on_error(&mut self, err: StreamError);
    fn on_complete(&mut self);
}

pub type BoxSubscriber<T> = Box<dyn Subscriber<T>>;

/// Event sink shared by observers and subscribers once subscribed
pub trait Downstream<T>: Send {
    fn next(&mut self, item: T);
    fn error(&mut self, err: StreamError);
    fn complete(&mut self);
}

impl<T> Downstream<T> for BoxObserver<T> {
    fn next(&mut self, item: T) {
        self.on_next(item)
    }

    fn error(&mut self, err: StreamError) {
        self.on_error(err)
    }

    fn complete(&mut self) {
        self.on_complete()
    }
}

impl<T> Downstream<T> for BoxSubscriber<T> {
    fn next(&mut self, item: T) {
        self.on_next(item)
    }

    fn error(&mut self, err: StreamError) {
        self.on_error(err)
    }

    fn complete(&mut self) {
        self.on_complete()
    }
}
