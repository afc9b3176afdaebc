//! Hot multicast source

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StreamError;
use crate::reactive::{BoxObserver, Emitter, Observable};
use crate::terminal::UndeliverablePolicy;

enum SubjectState<T> {
    Active(Vec<Emitter<T>>),
    Completed,
    Errored(StreamError),
}

/// Broadcasts every item pushed into it to the observers subscribed at that
/// moment. Late subscribers only see the terminal event.
pub struct PublishSubject<T> {
    state: Arc<Mutex<SubjectState<T>>>,
}

impl<T> Clone for PublishSubject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone + Send + 'static> PublishSubject<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SubjectState::Active(Vec::new()))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SubjectState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of live emitters; disposed ones are pruned on the way.
    fn live(&self) -> Vec<Emitter<T>> {
        match &mut *self.lock() {
            SubjectState::Active(emitters) => {
                emitters.retain(|e| !e.is_disposed());
                emitters.clone()
            }
            _ => Vec::new(),
        }
    }

    pub fn on_next(&self, item: T) {
        for emitter in self.live() {
            emitter.on_next(item.clone());
        }
    }

    /// Move to a terminal state, handing back the observers to notify.
    ///
    /// `None` when the subject had already terminated; the state is left as
    /// it was.
    fn terminate(&self, terminal: SubjectState<T>) -> Option<Vec<Emitter<T>>> {
        let mut state = self.lock();
        match &mut *state {
            SubjectState::Active(emitters) => {
                let emitters = std::mem::take(emitters);
                *state = terminal;
                Some(emitters)
            }
            _ => None,
        }
    }

    pub fn on_complete(&self) {
        if let Some(emitters) = self.terminate(SubjectState::Completed) {
            emitters.iter().for_each(Emitter::on_complete);
        }
    }

    pub fn on_error(&self, err: StreamError) {
        match self.terminate(SubjectState::Errored(err.clone())) {
            Some(emitters) => {
                for emitter in emitters {
                    emitter.on_error(err.clone());
                }
            }
            None => UndeliverablePolicy::Global.report(err),
        }
    }

    /// Number of observers currently subscribed
    pub fn observer_count(&self) -> usize {
        self.live().len()
    }

    pub fn has_observers(&self) -> bool {
        self.observer_count() > 0
    }
}

impl<T: Clone + Send + 'static> Default for PublishSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Observable<T> for PublishSubject<T> {
    fn subscribe(&self, observer: BoxObserver<T>) {
        let emitter = Emitter::attach(observer, UndeliverablePolicy::default());
        let mut state = self.lock();
        match &mut *state {
            SubjectState::Active(emitters) => {
                if !emitter.is_disposed() {
                    emitters.push(emitter);
                }
            }
            SubjectState::Completed => {
                drop(state);
                emitter.on_complete();
            }
            SubjectState::Errored(err) => {
                let err = err.clone();
                drop(state);
                emitter.on_error(err);
            }
        }
    }
}
