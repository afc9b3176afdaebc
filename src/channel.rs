//! Bounded mailbox between a push producer and a pull consumer
//!
//! Wraps a tokio `mpsc` channel with a close-once terminal cause. The sender
//! offers two ways to wait for room: a suspending `send` for cooperative
//! contexts and a bounded-blocking `send_blocking` for callback contexts that
//! cannot suspend. Both honour the same capacity.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, Notify};

use crate::error::{StreamError, StreamResult};

/// Error types for channel sends. The rejected item is handed back.
pub enum ChannelError<T> {
    /// The channel has been closed by a producer
    Closed(T),
    /// The channel is full (only from `try_send`)
    Full(T),
    /// The receiving side is gone
    Disconnected(T),
    /// The channel is full and the calling thread drives a current-thread
    /// runtime, so it cannot wait for room
    WouldBlock(T),
}

impl<T> ChannelError<T> {
    pub fn into_inner(self) -> T {
        match self {
            ChannelError::Closed(item)
            | ChannelError::Full(item)
            | ChannelError::Disconnected(item)
            | ChannelError::WouldBlock(item) => item,
        }
    }
}

impl<T> fmt::Display for ChannelError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Closed(_) => write!(f, "Channel is closed"),
            ChannelError::Full(_) => write!(f, "Channel is full"),
            ChannelError::Disconnected(_) => write!(f, "Channel receiver disconnected"),
            ChannelError::WouldBlock(_) => write!(f, "Channel is full and the current-thread runtime cannot block"),
        }
    }
}

impl<T> fmt::Debug for ChannelError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Closed(_) => f.write_str("Closed(..)"),
            ChannelError::Full(_) => f.write_str("Full(..)"),
            ChannelError::Disconnected(_) => f.write_str("Disconnected(..)"),
            ChannelError::WouldBlock(_) => f.write_str("WouldBlock(..)"),
        }
    }
}

impl<T> std::error::Error for ChannelError<T> {}

thread_local! {
    static BLOCKING_REGION: Cell<bool> = const { Cell::new(false) };
}

/// Run `f` with blocking sends allowed on this thread.
///
/// For threads of the blocking pool, which may block even when the runtime
/// they belong to is current-thread.
pub(crate) fn in_blocking_region<R>(f: impl FnOnce() -> R) -> R {
    struct Reset(bool);

    impl Drop for Reset {
        fn drop(&mut self) {
            let previous = self.0;
            BLOCKING_REGION.with(|flag| flag.set(previous));
        }
    }

    let _reset = Reset(BLOCKING_REGION.with(|flag| flag.replace(true)));
    f()
}

fn in_blocking_region_now() -> bool {
    BLOCKING_REGION.with(Cell::get)
}

/// Shared close state
struct ChannelState {
    capacity: usize,
    closed: AtomicBool,
    cause: Mutex<Option<StreamError>>,
    close_notify: Notify,
}

impl ChannelState {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn take_cause(&self) -> Option<StreamError> {
        self.cause.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Producer half of a bounded channel
pub struct ChannelSender<T> {
    tx: mpsc::Sender<T>,
    state: Arc<ChannelState>,
}

impl<T> Clone for ChannelSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

/// Consumer half of a bounded channel
pub struct ChannelReceiver<T> {
    rx: mpsc::Receiver<T>,
    state: Arc<ChannelState>,
    finished: bool,
}

/// Create a bounded channel. A capacity of zero is raised to one.
pub fn bounded<T>(capacity: usize) -> (ChannelSender<T>, ChannelReceiver<T>) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    let state = Arc::new(ChannelState {
        capacity,
        closed: AtomicBool::new(false),
        cause: Mutex::new(None),
        close_notify: Notify::new(),
    });
    (
        ChannelSender {
            tx,
            state: Arc::clone(&state),
        },
        ChannelReceiver {
            rx,
            state,
            finished: false,
        },
    )
}

impl<T> ChannelSender<T> {
    /// Send an item, suspending while the channel is full
    pub async fn send(&self, item: T) -> Result<(), ChannelError<T>> {
        if self.state.is_closed() {
            return Err(ChannelError::Closed(item));
        }
        self.tx
            .send(item)
            .await
            .map_err(|err| ChannelError::Disconnected(err.0))
    }

    /// Send an item, blocking the calling thread while the channel is full.
    ///
    /// Only for contexts that cannot suspend. Room in the buffer is taken
    /// without blocking. On a multi-thread runtime worker the worker is handed
    /// off with `block_in_place`. A current-thread runtime worker must never
    /// block, so a full channel there yields `ChannelError::WouldBlock`.
    pub fn send_blocking(&self, item: T) -> Result<(), ChannelError<T>> {
        let item = match self.try_send(item) {
            Err(ChannelError::Full(item)) => item,
            other => return other,
        };
        let result = match Handle::try_current() {
            Err(_) => self.tx.blocking_send(item),
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| self.tx.blocking_send(item))
            }
            Ok(_) if in_blocking_region_now() => self.tx.blocking_send(item),
            Ok(_) => return Err(ChannelError::WouldBlock(item)),
        };
        result.map_err(|err| ChannelError::Disconnected(err.0))
    }

    /// Try to send without waiting
    pub fn try_send(&self, item: T) -> Result<(), ChannelError<T>> {
        if self.state.is_closed() {
            return Err(ChannelError::Closed(item));
        }
        self.tx.try_send(item).map_err(|err| match err {
            mpsc::error::TrySendError::Full(item) => ChannelError::Full(item),
            mpsc::error::TrySendError::Closed(item) => ChannelError::Disconnected(item),
        })
    }

    /// Close the channel, optionally carrying a terminal cause.
    ///
    /// Only the first close takes effect; later calls return `false`.
    /// Buffered items remain readable.
    pub fn close(&self, cause: Option<StreamError>) -> bool {
        {
            // The cause must be visible before the flag flips.
            let mut slot = self.state.cause.lock().unwrap_or_else(PoisonError::into_inner);
            if self.state.is_closed() {
                return false;
            }
            *slot = cause;
            self.state.closed.store(true, Ordering::Release);
        }
        self.state.close_notify.notify_one();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Whether the receiving side has gone away
    pub fn is_disconnected(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.state.capacity
    }
}

impl<T> ChannelReceiver<T> {
    /// Receive the next item.
    ///
    /// Yields buffered items in order, then the terminal cause (if any) as a
    /// single `Err`, then `None`. If every sender disappears without closing,
    /// the terminal item is `Err(StreamError::Abandoned)`.
    pub async fn recv(&mut self) -> Option<StreamResult<T>> {
        if self.finished {
            return None;
        }
        loop {
            if self.state.is_closed() {
                return match self.rx.try_recv() {
                    Ok(item) => Some(Ok(item)),
                    Err(_) => self.finish(),
                };
            }
            tokio::select! {
                biased;
                item = self.rx.recv() => {
                    return match item {
                        Some(item) => Some(Ok(item)),
                        None => self.finish(),
                    };
                }
                _ = self.state.close_notify.notified() => {}
            }
        }
    }

    fn finish(&mut self) -> Option<StreamResult<T>> {
        self.finished = true;
        if self.state.is_closed() {
            self.state.take_cause().map(Err)
        } else {
            Some(Err(StreamError::Abandoned))
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Snapshot for monitoring
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            length: self.rx.len(),
            capacity: self.state.capacity,
            is_closed: self.state.is_closed(),
        }
    }
}

impl<T> fmt::Debug for ChannelReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelReceiver")
            .field("capacity", &self.state.capacity)
            .field("length", &self.rx.len())
            .field("is_closed", &self.state.is_closed())
            .finish()
    }
}

/// Channel statistics for monitoring and debugging
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStats {
    pub length: usize,
    pub capacity: usize,
    pub is_closed: bool,
}

impl fmt::Display for ChannelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Channel({}/{}{})",
            self.length,
            self.capacity,
            if self.is_closed { ", closed" } else { "" }
        )
    }
}
