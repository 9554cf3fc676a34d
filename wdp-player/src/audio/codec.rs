//! Codec adapter interface
//!
//! The codec owns the conversion hardware: an output peripheral driven by a
//! sample-rate timer that walks the transfer buffer circularly. It raises
//! one transfer-complete notification per half-buffer boundary and a
//! transfer-error notification on any fault, through the [`Notifier`]
//! registered when streaming starts.

use crate::audio::buffer::TransferBuffer;
use crate::audio::notify::Notifier;
use crate::error::Result;
use crate::wave::StreamFormat;
use std::sync::Arc;

pub trait Codec: Send + 'static {
    /// Prepare the output and its sample-rate timer for `format`
    fn configure(&mut self, format: StreamFormat) -> Result<()>;

    /// Begin continuous circular conversion of `buffer`.
    ///
    /// `length_in_samples` covers the whole buffer at the configured bit
    /// depth. `listener` receives notifications until [`Codec::stop`].
    fn start_streaming(
        &mut self,
        buffer: Arc<TransferBuffer>,
        length_in_samples: usize,
        listener: Arc<Notifier>,
    ) -> Result<()>;

    /// Halt conversion and the timer and drop the listener. Idempotent.
    fn stop(&mut self);
}

impl<C: Codec + ?Sized> Codec for Box<C> {
    fn configure(&mut self, format: StreamFormat) -> Result<()> {
        (**self).configure(format)
    }

    fn start_streaming(
        &mut self,
        buffer: Arc<TransferBuffer>,
        length_in_samples: usize,
        listener: Arc<Notifier>,
    ) -> Result<()> {
        (**self).start_streaming(buffer, length_in_samples, listener)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}
