//! Push-side interfaces consumed by the bridge
//!
//! Observables deliver `on_next*` followed by exactly one of `on_complete` /
//! `on_error`, and hand each observer a disposable on subscribe. Publishers
//! additionally honour `request(n)` demand. Only the minimal sources needed
//! to drive the bridge live here: `create`, a few cold constructors and a hot
//! `PublishSubject`.

pub mod disposable;
pub mod emitter;
pub mod observable;
pub mod observer;
pub mod subject;
pub mod testing;

pub use disposable::{
    AbortOnDispose, ActionDisposable, BooleanDisposable, BoxDisposable, Disposable, DisposeOnDrop,
};
pub use emitter::{Emitter, EmitterHandle};
pub use observable::{create, empty, error, from_iter, Create, Observable, ObservableRef, Publisher};
pub use observer::{BoxObserver, BoxSubscriber, Downstream, Observer, Subscriber, Subscription};
pub use subject::PublishSubject;
pub use testing::{TestObserver, TestSubscriber};
