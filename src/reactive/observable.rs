//! Push sources and the creation primitive

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::StreamError;
use crate::reactive::{BoxObserver, BoxSubscriber, Emitter};
use crate::terminal::UndeliverablePolicy;

/// A push source that delivers `on_next*` followed by one terminal event to
/// each observer that subscribes.
pub trait Observable<T>: Send + Sync {
    fn subscribe(&self, observer: BoxObserver<T>);
}

pub type ObservableRef<T> = Arc<dyn Observable<T>>;

impl<T, O: Observable<T> + ?Sized> Observable<T> for Arc<O> {
    fn subscribe(&self, observer: BoxObserver<T>) {
        (**self).subscribe(observer)
    }
}

/// A push source that honours subscriber demand
pub trait Publisher<T>: Send + Sync {
    fn subscribe(&self, subscriber: BoxSubscriber<T>);
}

impl<T, P: Publisher<T> + ?Sized> Publisher<T> for Arc<P> {
    fn subscribe(&self, subscriber: BoxSubscriber<T>) {
        (**self).subscribe(subscriber)
    }
}

/// Observable built from an emitter callback, see [`create`]
pub struct Create<F> {
    on_subscribe: F,
    undeliverable: UndeliverablePolicy,
}

impl<F> Create<F> {
    /// Route errors emitted after termination through `policy`.
    pub fn with_undeliverable(mut self, policy: UndeliverablePolicy) -> Self {
        self.undeliverable = policy;
        self
    }
}

/// Create an observable whose subscriptions are driven by `f`.
///
/// `f` runs once per subscriber, after the observer has received its handle.
/// A panic inside `f` is delivered as `StreamError::Panicked`.
///
/// # Examples
/// ```
/// use rs2_bridge::reactive::{create, Observable, TestObserver};
///
/// let source = create(|emitter| {
///     emitter.on_next(1);
///     emitter.on_next(2);
///     emitter.on_complete();
/// });
///
/// let observer = TestObserver::new();
/// source.subscribe(observer.observer());
/// assert_eq!(observer.values(), vec![1, 2]);
/// assert_eq!(observer.completions(), 1);
/// ```
pub fn create<T, F>(f: F) -> Create<F>
where
    T: Send + 'static,
    F: Fn(Emitter<T>) + Send + Sync,
{
    Create {
        on_subscribe: f,
        undeliverable: UndeliverablePolicy::default(),
    }
}

impl<T, F> Observable<T> for Create<F>
where
    T: Send + 'static,
    F: Fn(Emitter<T>) + Send + Sync,
{
    fn subscribe(&self, observer: BoxObserver<T>) {
        let emitter = Emitter::attach(observer, self.undeliverable.clone());
        let driven = emitter.clone();
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (self.on_subscribe)(driven))) {
            emitter.on_error(StreamError::from_panic(payload));
        }
    }
}

/// Emit every item of `items`, then complete. Each subscriber replays them.
pub fn from_iter<T>(items: Vec<T>) -> impl Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    create(move |emitter: Emitter<T>| {
        for item in items.iter().cloned() {
            if emitter.is_disposed() {
                return;
            }
            emitter.on_next(item);
        }
        emitter.on_complete();
    })
}

/// Fail every subscriber with `err`.
pub fn error<T>(err: StreamError) -> impl Observable<T>
where
    T: Send + 'static,
{
    create(move |emitter: Emitter<T>| emitter.on_error(err.clone()))
}

/// Complete every subscriber without items.
pub fn empty<T>() -> impl Observable<T>
where
    T: Send + 'static,
{
    create(|emitter: Emitter<T>| emitter.on_complete())
}
