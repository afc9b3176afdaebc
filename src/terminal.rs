//! Completion and error translation between the pull and push sides
//!
//! Exactly one terminal signal crosses the bridge per subscription. A
//! `TerminalLatch` enforces that; `Terminal::classify` maps a pulled item
//! onto the push vocabulary, turning cancellation into graceful completion.
//! Errors that can no longer reach their subscriber are routed through an
//! `UndeliverablePolicy` instead of being dropped.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{StreamError, StreamResult};

/// Lifecycle of one bridged subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Created,
    Pulling,
    Completed,
    Errored,
    Cancelled,
}

impl BridgeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BridgeState::Completed | BridgeState::Errored | BridgeState::Cancelled
        )
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => BridgeState::Created,
            1 => BridgeState::Pulling,
            2 => BridgeState::Completed,
            3 => BridgeState::Errored,
            _ => BridgeState::Cancelled,
        }
    }
}

/// Atomic state cell that admits exactly one terminal transition
#[derive(Debug)]
pub struct TerminalLatch {
    state: AtomicU8,
}

impl TerminalLatch {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(BridgeState::Created as u8),
        }
    }

    pub fn state(&self) -> BridgeState {
        BridgeState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_terminated(&self) -> bool {
        self.state().is_terminal()
    }

    /// `Created → Pulling`; `false` if the latch already left `Created`.
    pub fn start(&self) -> bool {
        self.state
            .compare_exchange(
                BridgeState::Created as u8,
                BridgeState::Pulling as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn try_complete(&self) -> bool {
        self.terminate(BridgeState::Completed)
    }

    pub fn try_error(&self) -> bool {
        self.terminate(BridgeState::Errored)
    }

    pub fn try_cancel(&self) -> bool {
        self.terminate(BridgeState::Cancelled)
    }

    fn terminate(&self, to: BridgeState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if BridgeState::from_u8(current).is_terminal() {
                log::trace!("Discarding duplicate terminal {:?}", to);
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for TerminalLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// A pulled item expressed in push-side terms
#[derive(Debug, PartialEq)]
pub enum Terminal<T> {
    Next(T),
    Complete,
    Error(StreamError),
}

impl<T> Terminal<T> {
    /// Classify the outcome of one pull.
    ///
    /// Exhaustion and cancellation both complete; everything else that fails
    /// is an error.
    pub fn classify(pulled: Option<StreamResult<T>>) -> Self {
        match pulled {
            Some(Ok(item)) => Terminal::Next(item),
            Some(Err(err)) if err.is_cancellation() => Terminal::Complete,
            Some(Err(err)) => Terminal::Error(err),
            None => Terminal::Complete,
        }
    }
}

/// Sink for errors that arrive after their subscriber terminated
pub type UndeliverableHandler = Arc<dyn Fn(StreamError) + Send + Sync>;

lazy_static::lazy_static! {
    static ref GLOBAL_UNDELIVERABLE_HANDLER: RwLock<Option<UndeliverableHandler>> = RwLock::new(None);
}

/// Install a process-wide handler for undeliverable errors
pub fn set_undeliverable_handler<F>(handler: F)
where
    F: Fn(StreamError) + Send + Sync + 'static,
{
    let mut slot = GLOBAL_UNDELIVERABLE_HANDLER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *slot = Some(Arc::new(handler));
}

/// Restore the default (logging) undeliverable handler
pub fn reset_undeliverable_handler() {
    let mut slot = GLOBAL_UNDELIVERABLE_HANDLER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *slot = None;
}

fn report_global(err: StreamError) {
    let handler = GLOBAL_UNDELIVERABLE_HANDLER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match handler {
        Some(handler) => handler(err),
        None => log::error!("Undeliverable error: {}", err),
    }
}

/// What to do with an error that has no live subscriber
#[derive(Clone, Default)]
pub enum UndeliverablePolicy {
    /// Route to the process-wide handler
    #[default]
    Global,
    /// Route to a handler owned by this bridge
    Handler(UndeliverableHandler),
    /// Drop silently
    Discard,
}

impl UndeliverablePolicy {
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(StreamError) + Send + Sync + 'static,
    {
        UndeliverablePolicy::Handler(Arc::new(f))
    }

    pub fn report(&self, err: StreamError) {
        match self {
            UndeliverablePolicy::Global => report_global(err),
            UndeliverablePolicy::Handler(handler) => handler(err),
            UndeliverablePolicy::Discard => log::debug!("Discarding undeliverable error: {}", err),
        }
    }
}

impl fmt::Debug for UndeliverablePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndeliverablePolicy::Global => f.write_str("Global"),
            UndeliverablePolicy::Handler(_) => f.write_str("Handler(..)"),
            UndeliverablePolicy::Discard => f.write_str("Discard"),
        }
    }
}
