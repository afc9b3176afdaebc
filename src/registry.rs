//! Single-slot subscription registry
//!
//! A `SubscriptionSlot` holds at most one live upstream handle. It is the only
//! piece of state mutated by both the producer callback thread and the
//! consumer/cancellation side, so every transition is a single atomic
//! compare-and-swap on one pointer:
//!
//! ```text
//!   empty ──store──▶ handle ──take──▶ empty
//!     │                 │
//!     └────dispose──────┴──dispose──▶ DISPOSED (absorbing)
//! ```
//!
//! Once the slot is disposed, any handle offered to it is rejected and must
//! be disposed by the caller on the spot.

use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::reactive::{BoxDisposable, Disposable};

/// Result of offering a handle to an empty slot
pub enum StoreOutcome {
    /// The slot now owns the handle
    Accepted,
    /// The slot was occupied or disposed; ownership is handed back
    Rejected(BoxDisposable),
}

impl StoreOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, StoreOutcome::Accepted)
    }
}

impl fmt::Debug for StoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOutcome::Accepted => f.write_str("Accepted"),
            StoreOutcome::Rejected(_) => f.write_str("Rejected"),
        }
    }
}

/// Lock-free holder for one subscription handle
pub struct SubscriptionSlot {
    ptr: AtomicPtr<BoxDisposable>,
}

// Never dereferenced; the address of a dangling, well-aligned pointer can
// not collide with a live heap allocation.
fn disposed_marker() -> *mut BoxDisposable {
    NonNull::<BoxDisposable>::dangling().as_ptr()
}

impl SubscriptionSlot {
    pub fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Store `handle` if the slot is empty.
    pub fn store_if_empty(&self, handle: BoxDisposable) -> StoreOutcome {
        let raw = Box::into_raw(Box::new(handle));
        match self
            .ptr
            .compare_exchange(ptr::null_mut(), raw, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => StoreOutcome::Accepted,
            Err(_) => {
                // SAFETY: `raw` was never published, so this thread still owns it.
                let handle = unsafe { *Box::from_raw(raw) };
                StoreOutcome::Rejected(handle)
            }
        }
    }

    /// Store `handle` if the slot is empty, otherwise dispose it immediately.
    ///
    /// Returns `true` when the handle was stored.
    pub fn set_once(&self, handle: BoxDisposable) -> bool {
        match self.store_if_empty(handle) {
            StoreOutcome::Accepted => true,
            StoreOutcome::Rejected(handle) => {
                handle.dispose();
                if !self.is_disposed() {
                    log::warn!("Subscription slot already holds a live handle; disposed the duplicate");
                }
                false
            }
        }
    }

    /// Swap in `handle`, disposing the previous one.
    ///
    /// If the slot is already disposed the new handle is disposed instead and
    /// `false` is returned.
    pub fn replace(&self, handle: BoxDisposable) -> bool {
        let raw = Box::into_raw(Box::new(handle));
        let mut current = self.ptr.load(Ordering::Acquire);
        loop {
            if current == disposed_marker() {
                // SAFETY: `raw` was never published.
                let handle = unsafe { Box::from_raw(raw) };
                handle.dispose();
                return false;
            }
            match self
                .ptr
                .compare_exchange_weak(current, raw, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(previous) => {
                    if !previous.is_null() {
                        // SAFETY: the successful exchange transferred ownership of `previous` to us.
                        let previous = unsafe { Box::from_raw(previous) };
                        previous.dispose();
                    }
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Remove and return the held handle without disposing it.
    ///
    /// A disposed slot stays disposed and yields `None`.
    pub fn take_and_clear(&self) -> Option<BoxDisposable> {
        let mut current = self.ptr.load(Ordering::Acquire);
        loop {
            if current.is_null() || current == disposed_marker() {
                return None;
            }
            match self.ptr.compare_exchange_weak(
                current,
                ptr::null_mut(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                // SAFETY: the successful exchange transferred ownership of `current` to us.
                Ok(taken) => return Some(unsafe { *Box::from_raw(taken) }),
                Err(actual) => current = actual,
            }
        }
    }

    /// Mark the slot disposed and dispose whatever it held.
    ///
    /// Returns `true` for the call that performed the transition.
    pub fn dispose(&self) -> bool {
        let previous = self.ptr.swap(disposed_marker(), Ordering::AcqRel);
        if previous == disposed_marker() {
            return false;
        }
        if !previous.is_null() {
            // SAFETY: the swap transferred ownership of `previous` to us.
            let handle = unsafe { Box::from_raw(previous) };
            handle.dispose();
        }
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.ptr.load(Ordering::Acquire) == disposed_marker()
    }

    /// Whether a live handle is currently stored
    pub fn is_set(&self) -> bool {
        let current = self.ptr.load(Ordering::Acquire);
        !current.is_null() && current != disposed_marker()
    }
}

impl Default for SubscriptionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for SubscriptionSlot {
    fn dispose(&self) {
        SubscriptionSlot::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        SubscriptionSlot::is_disposed(self)
    }
}

impl Drop for SubscriptionSlot {
    fn drop(&mut self) {
        let current = *self.ptr.get_mut();
        if !current.is_null() && current != disposed_marker() {
            // SAFETY: `&mut self` guarantees no concurrent access; the slot owns `current`.
            drop(unsafe { Box::from_raw(current) });
        }
    }
}

impl fmt::Debug for SubscriptionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_disposed() {
            "disposed"
        } else if self.is_set() {
            "set"
        } else {
            "empty"
        };
        f.debug_struct("SubscriptionSlot").field("state", &state).finish()
    }
}
