//! Shared player state
//!
//! Thread-safe state shared between the playback controller, the streaming
//! task and shell clients.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use wdp_common::events::{PlayerEvent, PlayerState, SessionOutcome};

/// Shared state accessible by all components
pub struct SharedState {
    /// Current controller state
    state: Mutex<PlayerState>,

    /// Signalled whenever the state returns to Idle
    idle: Condvar,

    /// Outcome of the most recently finished session
    last_outcome: Mutex<Option<SessionOutcome>>,

    /// Event broadcaster for shell clients and tests
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(PlayerState::Idle),
            idle: Condvar::new(),
            last_outcome: Mutex::new(None),
            event_tx,
        }
    }

    pub fn state(&self) -> PlayerState {
        *lock(&self.state)
    }

    pub fn set_state(&self, state: PlayerState) {
        *lock(&self.state) = state;
        if state == PlayerState::Idle {
            self.idle.notify_all();
        }
    }

    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        lock(&self.last_outcome).clone()
    }

    pub fn set_last_outcome(&self, outcome: SessionOutcome) {
        *lock(&self.last_outcome) = Some(outcome);
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast_event(&self, event: PlayerEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Block until the state is Idle or `timeout` elapses.
    ///
    /// Returns true if the player is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let guard = lock(&self.state);
        let (guard, _) = self
            .idle
            .wait_timeout_while(guard, timeout, |state| *state != PlayerState::Idle)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == PlayerState::Idle
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_idle_without_outcome() {
        let state = SharedState::new();
        assert_eq!(state.state(), PlayerState::Idle);
        assert_eq!(state.last_outcome(), None);
    }

    #[test]
    fn test_wait_idle_wakes_on_transition() {
        let state = Arc::new(SharedState::new());
        state.set_state(PlayerState::Streaming);
        assert!(!state.wait_idle(Duration::from_millis(10)));

        let writer = Arc::clone(&state);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            writer.set_state(PlayerState::Idle);
        });

        assert!(state.wait_idle(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_events_reach_subscribers() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();
        state.broadcast_event(PlayerEvent::SessionFinished {
            path: "a.wav".to_string(),
            outcome: SessionOutcome::Stopped,
        });
        assert!(matches!(
            rx.try_recv().unwrap(),
            PlayerEvent::SessionFinished { outcome: SessionOutcome::Stopped, .. }
        ));
    }
}
