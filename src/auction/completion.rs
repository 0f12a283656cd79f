//! Exactly-once completion arbitration.
//!
//! Cancellation and notification race for the same token. Whichever moves
//! it out of `Pending` first wins; the other becomes a no-op.

use std::sync::atomic::{AtomicU8, Ordering};

const PENDING: u8 = 0;
const NOTIFIED: u8 = 1;
const CANCELLED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Pending,
    Notified,
    Cancelled,
}

#[derive(Debug)]
pub struct CompletionToken {
    state: AtomicU8,
}

impl Default for CompletionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionToken {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
        }
    }

    /// Claim the right to notify the listener.
    pub fn try_notify(&self) -> bool {
        self.transition(NOTIFIED)
    }

    /// Claim cancellation. Fails if the listener was already notified.
    pub fn try_cancel(&self) -> bool {
        self.transition(CANCELLED)
    }

    pub fn state(&self) -> CompletionState {
        match self.state.load(Ordering::Acquire) {
            NOTIFIED => CompletionState::Notified,
            CANCELLED => CompletionState::Cancelled,
            _ => CompletionState::Pending,
        }
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
