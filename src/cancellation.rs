//! Single-slot cancellation tracking.
//!
//! [`CancellationManager`] remembers the cancellation token of the most
//! recently started top-level call. [`CancellationManager::cancel_current`]
//! signals that token only. Starting a new call replaces the tracked token
//! without cancelling the old one: the earlier call keeps running to
//! completion or to its own timeout, and is no longer reachable through
//! `cancel_current`. Its own [`InFlightHandle`] can still cancel it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Slot {
    id: u64,
    token: CancellationToken,
}

/// Tracks one in-flight cancellation token at a time.
#[derive(Debug, Default)]
pub struct CancellationManager {
    next_id: AtomicU64,
    current: Mutex<Option<Slot>>,
}

impl CancellationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a fresh token for a new top-level call.
    ///
    /// The previously tracked token, if any, is dropped from the slot but
    /// not cancelled.
    pub fn begin(self: &Arc<Self>) -> InFlightHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.current.lock() {
            *slot = Some(Slot {
                id,
                token: token.clone(),
            });
        }
        InFlightHandle {
            id,
            token,
            manager: Arc::downgrade(self),
        }
    }

    /// Cancel whatever call currently holds the slot. No-op when idle.
    ///
    /// Returns whether a token was signalled.
    pub fn cancel_current(&self) -> bool {
        let slot = self.current.lock().ok().and_then(|mut s| s.take());
        match slot {
            Some(slot) => {
                slot.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether some call currently holds the slot.
    pub fn has_active(&self) -> bool {
        self.current.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    fn release(&self, id: u64) {
        if let Ok(mut slot) = self.current.lock() {
            if slot.as_ref().is_some_and(|s| s.id == id) {
                *slot = None;
            }
        }
    }
}

/// The cancellation handle of one top-level call.
///
/// Dropping the handle releases the manager's slot if this call still holds
/// it, so a finished call can never be "cancelled" after the fact.
#[derive(Debug)]
pub struct InFlightHandle {
    id: u64,
    token: CancellationToken,
    manager: std::sync::Weak<CancellationManager>,
}

impl InFlightHandle {
    /// Token to hand to the retry loop.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this call regardless of what the manager tracks.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for InFlightHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_before_any_call_is_noop() {
        let manager = Arc::new(CancellationManager::new());
        assert!(!manager.cancel_current());
        assert!(!manager.has_active());
    }

    #[test]
    fn test_cancel_current_signals_tracked_token() {
        let manager = Arc::new(CancellationManager::new());
        let handle = manager.begin();
        assert!(manager.cancel_current());
        assert!(handle.is_cancelled());
        assert!(!manager.cancel_current());
    }

    #[test]
    fn test_new_call_replaces_slot_without_cancelling_old() {
        let manager = Arc::new(CancellationManager::new());
        let first = manager.begin();
        let second = manager.begin();

        assert!(!first.is_cancelled());
        assert!(manager.cancel_current());
        assert!(second.is_cancelled());
        assert!(!first.is_cancelled());
    }

    #[test]
    fn test_cancelling_old_handle_leaves_new_call_alone() {
        let manager = Arc::new(CancellationManager::new());
        let first = manager.begin();
        let second = manager.begin();

        first.cancel();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(manager.has_active());
    }

    #[test]
    fn test_finished_old_call_does_not_release_new_slot() {
        let manager = Arc::new(CancellationManager::new());
        let first = manager.begin();
        let second = manager.begin();
        drop(first);
        assert!(manager.has_active());
        drop(second);
        assert!(!manager.has_active());
    }
}
