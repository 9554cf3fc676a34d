//! Playback controller
//!
//! Entry point for starting and stopping playback. At most one streaming
//! task exists per player (and so per codec): `play()` first cancels and
//! joins any running session, reclaiming the codec from it, before opening
//! the next file.
//!
//! Parse-time failures are returned from `play()` and leave the codec
//! untouched. Runtime failures end the session and are reported as its
//! [`SessionOutcome`].

use crate::audio::buffer::{TransferBuffer, DEFAULT_BUFFER_SIZE};
use crate::audio::codec::Codec;
use crate::audio::notify::Notifier;
use crate::error::{Error, Result};
use crate::playback::session::StreamSession;
use crate::playback::task::{run_stream_task, TaskExit};
use crate::state::SharedState;
use crate::storage::Storage;
use crate::wave::{parse_header_with_limit, DEFAULT_HEADER_SCAN_LIMIT};
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use wdp_common::events::{PlayerEvent, PlayerState, SessionOutcome};

/// Tunables for a [`Player`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSettings {
    /// Transfer buffer size in bytes (non-zero multiple of 4)
    pub buffer_size: usize,
    /// Ceiling on chunk header offsets while parsing
    pub header_scan_limit: u64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            header_scan_limit: DEFAULT_HEADER_SCAN_LIMIT,
        }
    }
}

struct ActiveSession<C> {
    path: String,
    listener: Arc<Notifier>,
    handle: JoinHandle<Option<TaskExit<C>>>,
}

struct Inner<C> {
    /// Present whenever no streaming task holds it
    codec: Option<C>,
    active: Option<ActiveSession<C>>,
}

/// Playback controller over a storage volume and one codec
pub struct Player<S: Storage, C: Codec> {
    storage: Arc<S>,
    settings: PlayerSettings,
    shared: Arc<SharedState>,
    inner: Mutex<Inner<C>>,
}

impl<S: Storage, C: Codec> Player<S, C> {
    /// # Panics
    /// Panics if `settings.buffer_size` is zero or not a multiple of 4.
    pub fn new(storage: S, codec: C, settings: PlayerSettings) -> Self {
        assert!(
            settings.buffer_size > 0 && settings.buffer_size % 4 == 0,
            "transfer buffer size must be a non-zero multiple of 4"
        );
        Self {
            storage: Arc::new(storage),
            settings,
            shared: Arc::new(SharedState::new()),
            inner: Mutex::new(Inner {
                codec: Some(codec),
                active: None,
            }),
        }
    }

    /// Start playing `path`, replacing any current session.
    ///
    /// Returns once the new streaming task is running. The previous session
    /// (if any) has fully exited and released its file and codec by then.
    ///
    /// # Errors
    /// - `FileOpenError` if the file cannot be opened
    /// - any header parse error (codec is not configured)
    /// - `Codec` if the output cannot be configured
    pub fn play(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let mut inner = self.lock_inner();

        Self::shutdown_active(&mut inner);

        info!("Play requested: {}", shown);
        self.shared.set_state(PlayerState::Opening);
        let result = self.launch(&mut inner, path, shown);
        if result.is_err() {
            self.shared.set_state(PlayerState::Idle);
        }
        result
    }

    /// Stop the current session, if any, and wait for it to exit.
    ///
    /// A no-op when idle.
    pub fn stop(&self) {
        let mut inner = self.lock_inner();
        Self::shutdown_active(&mut inner);
    }

    pub fn state(&self) -> PlayerState {
        self.shared.state()
    }

    /// Outcome of the most recently finished session
    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        self.shared.last_outcome()
    }

    /// Subscribe to session start/finish events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.shared.subscribe_events()
    }

    /// Block until the player is idle or `timeout` elapses. Returns true if idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared.wait_idle(timeout)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn settings(&self) -> PlayerSettings {
        self.settings
    }

    fn launch(&self, inner: &mut Inner<C>, path: &Path, shown: String) -> Result<()> {
        let mut file = self.storage.open(path).map_err(|source| Error::FileOpenError {
            path: path.to_path_buf(),
            source,
        })?;

        self.shared.set_state(PlayerState::Parsing);
        let header = parse_header_with_limit(&mut file, self.settings.header_scan_limit)?;
        file.seek(SeekFrom::Start(header.data_offset))
            .map_err(Error::FileReadError)?;

        let mut codec = inner
            .codec
            .take()
            .ok_or_else(|| Error::Internal("codec not returned by previous session".to_string()))?;
        if let Err(e) = codec.configure(header.format) {
            inner.codec = Some(codec);
            return Err(e);
        }

        let buffer = Arc::new(TransferBuffer::new(self.settings.buffer_size));
        let session = StreamSession::new(file, &header, buffer);
        let listener = Arc::new(Notifier::new());

        // Published before the task runs so its Idle transition is the last word
        self.shared.set_state(PlayerState::Streaming);
        self.shared.broadcast_event(PlayerEvent::SessionStarted {
            path: shown.clone(),
            sample_rate_hz: header.format.sample_rate_hz(),
            bits_per_sample: header.format.bits_per_sample(),
            data_bytes: header.data_len,
        });

        // A failed spawn leaves the codec in the slot
        let slot = Arc::new(Mutex::new(Some(codec)));
        let task_slot = Arc::clone(&slot);
        let task_listener = Arc::clone(&listener);
        let task_path = shown.clone();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("wdp-stream".to_string())
            .spawn(move || {
                let codec = lock(&task_slot).take()?;
                Some(run_stream_task(session, codec, task_listener, task_path, shared))
            });

        match spawned {
            Ok(handle) => {
                inner.active = Some(ActiveSession {
                    path: shown,
                    listener,
                    handle,
                });
                debug!("Streaming task launched");
                Ok(())
            }
            Err(e) => {
                inner.codec = lock(&slot).take();
                Err(Error::Internal(format!("failed to spawn streaming task: {}", e)))
            }
        }
    }

    /// Cancel and join the running task, reclaiming the codec
    fn shutdown_active(inner: &mut Inner<C>) {
        let Some(active) = inner.active.take() else {
            return;
        };

        if !active.handle.is_finished() {
            info!("Stopping playback of {}", active.path);
        }
        active.listener.request_cancel();

        match active.handle.join() {
            Ok(Some(exit)) => {
                debug!("Session {} ended: {}", active.path, exit.outcome);
                inner.codec = Some(exit.codec);
            }
            Ok(None) => warn!("Streaming task for {} never received the codec", active.path),
            Err(_) => error!("Streaming task for {} panicked, codec lost", active.path),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner<C>> {
        lock(&self.inner)
    }
}

impl<S: Storage, C: Codec> Drop for Player<S, C> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        Self::shutdown_active(inner);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
