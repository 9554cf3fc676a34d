//! Codec-to-task notification primitive
//!
//! Producers (codec completion/error callbacks, possibly running in an
//! interrupt-like real-time context) only touch atomics and unpark the
//! waiting thread: no locks, no allocation. Exactly one consumer, the
//! streaming task, waits on it.
//!
//! Transfer-complete notifications are counted rather than flagged, so two
//! completions raised before the task wakes are never merged into one.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::OnceLock;
use std::thread::{self, Thread};

/// Pending notifications taken by one [`Notifier::wait`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Wakeup {
    /// Transfer-complete notifications raised since the previous wait
    pub completed: u32,
    /// A transfer error was raised
    pub error: bool,
    /// Cancellation has been requested
    pub cancel: bool,
}

impl Wakeup {
    fn is_empty(&self) -> bool {
        self.completed == 0 && !self.error && !self.cancel
    }
}

/// Per-session notification listener
#[derive(Debug, Default)]
pub struct Notifier {
    completed: AtomicU32,
    error: AtomicBool,
    cancel: AtomicBool,
    waiter: OnceLock<Thread>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// One half of the transfer buffer has been converted
    pub fn transfer_complete(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
        self.wake();
    }

    /// The codec detected a transfer fault
    pub fn transfer_error(&self) {
        self.error.store(true, Ordering::Release);
        self.wake();
    }

    /// Ask the streaming task to stop at its next wake-up
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
        self.wake();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Register the calling thread as the single consumer.
    ///
    /// Signals raised before binding are kept and returned by the first wait.
    pub fn bind_current_thread(&self) {
        let _ = self.waiter.set(thread::current());
    }

    /// Block until at least one notification is pending, then take them.
    ///
    /// Cancellation stays set once requested; completions and errors are
    /// consumed.
    pub fn wait(&self) -> Wakeup {
        loop {
            let wakeup = self.take();
            if !wakeup.is_empty() {
                return wakeup;
            }
            // Spurious unparks just loop around
            thread::park();
        }
    }

    /// Take pending notifications without blocking
    pub fn take(&self) -> Wakeup {
        Wakeup {
            completed: self.completed.swap(0, Ordering::AcqRel),
            error: self.error.swap(false, Ordering::AcqRel),
            cancel: self.cancel.load(Ordering::Acquire),
        }
    }

    fn wake(&self) {
        if let Some(thread) = self.waiter.get() {
            thread.unpark();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_completions_are_counted() {
        let notifier = Notifier::new();
        notifier.transfer_complete();
        notifier.transfer_complete();
        notifier.transfer_complete();

        let wakeup = notifier.take();
        assert_eq!(wakeup.completed, 3);
        assert!(!wakeup.error);
        assert_eq!(notifier.take(), Wakeup::default());
    }

    #[test]
    fn test_cancel_is_sticky() {
        let notifier = Notifier::new();
        notifier.request_cancel();
        assert!(notifier.take().cancel);
        assert!(notifier.take().cancel);
        assert!(notifier.is_cancel_requested());
    }

    #[test]
    fn test_signals_before_binding_are_not_lost() {
        let notifier = Arc::new(Notifier::new());
        notifier.transfer_error();

        let consumer = Arc::clone(&notifier);
        let handle = std::thread::spawn(move || {
            consumer.bind_current_thread();
            consumer.wait()
        });

        let wakeup = handle.join().unwrap();
        assert!(wakeup.error);
    }

    #[test]
    fn test_wait_wakes_on_signal_from_other_thread() {
        let notifier = Arc::new(Notifier::new());
        let consumer = Arc::clone(&notifier);
        let handle = std::thread::spawn(move || {
            consumer.bind_current_thread();
            consumer.wait()
        });

        std::thread::sleep(Duration::from_millis(20));
        notifier.transfer_complete();

        assert_eq!(handle.join().unwrap().completed, 1);
    }
}
