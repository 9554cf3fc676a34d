//! Software DAC
//!
//! Consumes the transfer buffer in (optionally scaled) real time on its own
//! conversion thread, one half per half-buffer period, and records what it
//! converted. Used as the `virtual` output and as the hardware stand-in for
//! tests.

use crate::audio::buffer::{Half, TransferBuffer};
use crate::audio::codec::Codec;
use crate::audio::notify::Notifier;
use crate::error::{Error, Result};
use crate::wave::StreamFormat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Calls made on the codec, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DacCall {
    Configure(StreamFormat),
    Start { length_in_samples: usize },
    Stop,
}

/// Everything the virtual DAC observed
#[derive(Debug, Default)]
pub struct DacLog {
    pub calls: Vec<DacCall>,
    /// Converted samples (offset-binary), across all sessions
    pub output: Vec<u16>,
    pub transfer_completes: u64,
    pub transfer_errors: u64,
}

/// Shared view of a [`VirtualDac`] that stays usable after the DAC has been
/// moved into the player
#[derive(Debug, Clone)]
pub struct DacProbe {
    log: Arc<Mutex<DacLog>>,
    fault: Arc<AtomicBool>,
}

impl DacProbe {
    pub fn calls(&self) -> Vec<DacCall> {
        lock(&self.log).calls.clone()
    }

    pub fn output(&self) -> Vec<u16> {
        lock(&self.log).output.clone()
    }

    pub fn transfer_completes(&self) -> u64 {
        lock(&self.log).transfer_completes
    }

    pub fn transfer_errors(&self) -> u64 {
        lock(&self.log).transfer_errors
    }

    /// Make the next conversion period end in a transfer error
    pub fn inject_fault(&self) {
        self.fault.store(true, Ordering::Release);
    }
}

struct Conversion {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct VirtualDac {
    log: Arc<Mutex<DacLog>>,
    fault: Arc<AtomicBool>,
    time_scale: f64,
    format: Option<StreamFormat>,
    conversion: Option<Conversion>,
}

impl VirtualDac {
    /// Real-time software DAC
    pub fn new() -> Self {
        Self::with_time_scale(1.0)
    }

    /// Software DAC running `time_scale` times faster than real time
    pub fn with_time_scale(time_scale: f64) -> Self {
        Self {
            log: Arc::new(Mutex::new(DacLog::default())),
            fault: Arc::new(AtomicBool::new(false)),
            time_scale: time_scale.max(f64::MIN_POSITIVE),
            format: None,
            conversion: None,
        }
    }

    pub fn probe(&self) -> DacProbe {
        DacProbe {
            log: Arc::clone(&self.log),
            fault: Arc::clone(&self.fault),
        }
    }
}

impl Default for VirtualDac {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for VirtualDac {
    fn configure(&mut self, format: StreamFormat) -> Result<()> {
        self.stop_conversion();
        lock(&self.log).calls.push(DacCall::Configure(format));
        self.format = Some(format);
        Ok(())
    }

    fn start_streaming(
        &mut self,
        buffer: Arc<TransferBuffer>,
        length_in_samples: usize,
        listener: Arc<Notifier>,
    ) -> Result<()> {
        let format = self
            .format
            .ok_or_else(|| Error::Codec("virtual DAC started before configure".to_string()))?;
        self.stop_conversion();
        lock(&self.log).calls.push(DacCall::Start { length_in_samples });

        let half_samples = length_in_samples / 2;
        let period = Duration::from_secs_f64(
            half_samples as f64 / f64::from(format.sample_rate_hz()) / self.time_scale,
        );
        debug!(
            "Virtual DAC converting {} samples per half every {:?}",
            half_samples, period
        );

        let stop = Arc::new(AtomicBool::new(false));
        let worker = ConversionWorker {
            buffer,
            listener,
            format,
            half_samples,
            period,
            stop: Arc::clone(&stop),
            fault: Arc::clone(&self.fault),
            log: Arc::clone(&self.log),
        };
        let handle = thread::Builder::new()
            .name("virtual-dac".to_string())
            .spawn(move || worker.run())
            .map_err(|e| Error::Codec(format!("failed to spawn conversion thread: {}", e)))?;

        self.conversion = Some(Conversion { stop, handle });
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_conversion();
        lock(&self.log).calls.push(DacCall::Stop);
    }
}

impl VirtualDac {
    fn stop_conversion(&mut self) {
        if let Some(conversion) = self.conversion.take() {
            conversion.stop.store(true, Ordering::Release);
            conversion.handle.thread().unpark();
            if conversion.handle.join().is_err() {
                warn!("Virtual DAC conversion thread panicked");
            }
        }
    }
}

impl Drop for VirtualDac {
    fn drop(&mut self) {
        self.stop_conversion();
    }
}

struct ConversionWorker {
    buffer: Arc<TransferBuffer>,
    listener: Arc<Notifier>,
    format: StreamFormat,
    half_samples: usize,
    period: Duration,
    stop: Arc<AtomicBool>,
    fault: Arc<AtomicBool>,
    log: Arc<Mutex<DacLog>>,
}

impl ConversionWorker {
    fn run(self) {
        let mut half = Half::A;
        loop {
            if !self.sleep_period() {
                break;
            }

            if self.fault.swap(false, Ordering::AcqRel) {
                lock(&self.log).transfer_errors += 1;
                self.listener.transfer_error();
                break;
            }

            let first = half.index() * self.half_samples;
            {
                let mut log = lock(&self.log);
                log.output.extend(
                    (first..first + self.half_samples)
                        .map(|i| self.buffer.sample(i, self.format.bit_depth())),
                );
                log.transfer_completes += 1;
            }
            self.listener.transfer_complete();
            half = half.other();
        }
    }

    /// Sleep one half-buffer period. Returns false once stop is requested.
    fn sleep_period(&self) -> bool {
        let deadline = Instant::now() + self.period;
        loop {
            if self.stop.load(Ordering::Acquire) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

fn lock(log: &Mutex<DacLog>) -> MutexGuard<'_, DacLog> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}
