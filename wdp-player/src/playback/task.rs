//! Streaming task
//!
//! Runs on its own thread for the lifetime of one session. Blocks on the
//! session's [`Notifier`] and reacts to each wake-up: a transfer error ends
//! the session, a cancel request ends it, and every transfer-complete
//! refills the released half.

use crate::audio::codec::Codec;
use crate::audio::notify::Notifier;
use crate::error::{Error, Result};
use crate::playback::session::{Step, StreamSession};
use crate::state::SharedState;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use wdp_common::events::{PlayerEvent, PlayerState, SessionOutcome};

/// What the task hands back to the controller when it exits
pub struct TaskExit<C> {
    pub codec: C,
    pub outcome: SessionOutcome,
}

/// Drive `session` to its end, then stop the codec, close the file, and
/// publish the outcome.
pub fn run_stream_task<F, C>(
    mut session: StreamSession<F>,
    mut codec: C,
    listener: Arc<Notifier>,
    path: String,
    shared: Arc<SharedState>,
) -> TaskExit<C>
where
    F: Read,
    C: Codec,
{
    listener.bind_current_thread();
    info!("Streaming task started: {}", path);

    let result = drive(&mut session, &mut codec, &listener);

    codec.stop();
    let fills = session.fills();
    // Closes the file
    drop(session);

    let outcome = match result {
        Ok(()) => {
            info!("Playback of {} completed ({} fills)", path, fills);
            SessionOutcome::Completed
        }
        Err(Error::Cancelled) => {
            info!("Playback of {} stopped", path);
            SessionOutcome::Stopped
        }
        Err(e) => {
            error!("Playback of {} failed: {}", path, e);
            SessionOutcome::Failed { reason: e.to_string() }
        }
    };

    shared.set_last_outcome(outcome.clone());
    shared.broadcast_event(PlayerEvent::SessionFinished {
        path,
        outcome: outcome.clone(),
    });
    shared.set_state(PlayerState::Idle);

    TaskExit { codec, outcome }
}

fn drive<F: Read, C: Codec>(session: &mut StreamSession<F>, codec: &mut C, listener: &Arc<Notifier>) -> Result<()> {
    if listener.is_cancel_requested() {
        return Err(Error::Cancelled);
    }
    if session.start(codec, Arc::clone(listener))? == Step::Finished {
        return Ok(());
    }

    loop {
        let wakeup = listener.wait();

        if wakeup.error {
            warn!("Codec reported a transfer error");
            return Err(Error::HardwareTransferError);
        }
        if wakeup.cancel {
            debug!("Cancel requested");
            return Err(Error::Cancelled);
        }

        if wakeup.completed > 1 {
            warn!("{} transfer completes pending, refill fell behind", wakeup.completed);
        }
        for _ in 0..wakeup.completed {
            if session.on_transfer_complete()? == Step::Finished {
                return Ok(());
            }
        }
    }
}
