//! Audio output side: transfer buffer, notifications and codec adapters

pub mod buffer;
pub mod codec;
pub mod notify;
pub mod output;
pub mod virtual_dac;

pub use buffer::{center_samples, Half, HalfOwnership, TransferBuffer, DEFAULT_BUFFER_SIZE};
pub use codec::Codec;
pub use notify::{Notifier, Wakeup};
pub use output::CpalCodec;
pub use virtual_dac::{DacCall, DacProbe, VirtualDac};
