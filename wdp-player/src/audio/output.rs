//! Audio output using cpal
//!
//! Drives a host audio device as the conversion hardware. The output
//! callback walks the transfer buffer circularly at the stream's sample
//! rate, raises transfer-complete at every half boundary and
//! transfer-error from the stream error callback.
//!
//! `cpal::Stream` is not `Send`, so the device and stream live on a
//! dedicated output thread and [`CpalCodec`] talks to it over a channel.

use crate::audio::buffer::TransferBuffer;
use crate::audio::codec::Codec;
use crate::audio::notify::Notifier;
use crate::error::{Error, Result};
use crate::wave::{BitDepth, StreamFormat};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

enum OutputCommand {
    Configure {
        format: StreamFormat,
        reply: Sender<Result<()>>,
    },
    Start {
        buffer: Arc<TransferBuffer>,
        length_in_samples: usize,
        listener: Arc<Notifier>,
        reply: Sender<Result<()>>,
    },
    Stop {
        reply: Sender<()>,
    },
}

/// Codec adapter backed by a cpal output device
pub struct CpalCodec {
    commands: Option<Sender<OutputCommand>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalCodec {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::Codec(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device (None = default device) on its own thread.
    pub fn open(device_name: Option<String>) -> Result<Self> {
        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("cpal-output".to_string())
            .spawn(move || output_thread(device_name, command_rx, ready_tx))
            .map_err(|e| Error::Codec(format!("Failed to spawn output thread: {}", e)))?;

        ready_rx
            .recv()
            .map_err(|_| Error::Codec("Output thread exited during startup".to_string()))??;

        Ok(Self {
            commands: Some(commands),
            thread: Some(thread),
        })
    }

    fn request<T>(&self, command: impl FnOnce(Sender<T>) -> OutputCommand) -> Result<T> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| Error::Codec("Output thread is gone".to_string()))?;
        let (reply_tx, reply_rx) = mpsc::channel();
        commands
            .send(command(reply_tx))
            .map_err(|_| Error::Codec("Output thread is gone".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| Error::Codec("Output thread dropped the request".to_string()))
    }
}

impl Codec for CpalCodec {
    fn configure(&mut self, format: StreamFormat) -> Result<()> {
        self.request(|reply| OutputCommand::Configure { format, reply })?
    }

    fn start_streaming(
        &mut self,
        buffer: Arc<TransferBuffer>,
        length_in_samples: usize,
        listener: Arc<Notifier>,
    ) -> Result<()> {
        self.request(|reply| OutputCommand::Start {
            buffer,
            length_in_samples,
            listener,
            reply,
        })?
    }

    fn stop(&mut self) {
        if let Err(e) = self.request(|reply| OutputCommand::Stop { reply }) {
            warn!("Audio output stop: {}", e);
        }
    }
}

impl Drop for CpalCodec {
    fn drop(&mut self) {
        // Closing the channel ends the output thread
        self.commands.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

fn output_thread(device_name: Option<String>, commands: Receiver<OutputCommand>, ready: Sender<Result<()>>) {
    let device = match open_device(device_name.as_deref()) {
        Ok(device) => device,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut output = DeviceOutput {
        device,
        selected: None,
        stream: None,
    };

    for command in commands {
        match command {
            OutputCommand::Configure { format, reply } => {
                let _ = reply.send(output.configure(format));
            }
            OutputCommand::Start {
                buffer,
                length_in_samples,
                listener,
                reply,
            } => {
                let _ = reply.send(output.start(buffer, length_in_samples, listener));
            }
            OutputCommand::Stop { reply } => {
                output.stop();
                let _ = reply.send(());
            }
        }
    }

    output.stop();
    debug!("Audio output thread exiting");
}

fn open_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    if let Some(name) = name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::Codec(format!("Failed to enumerate devices: {}", e)))?;
        let device = devices
            .find(|d| d.name().ok().as_deref() == Some(name))
            .ok_or_else(|| Error::Codec(format!("Device '{}' not found", name)))?;
        info!("Using audio device: {}", name);
        return Ok(device);
    }

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Codec("No default output device found".to_string()))?;
    info!(
        "Using default audio device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );
    Ok(device)
}

struct SelectedConfig {
    config: StreamConfig,
    sample_format: SampleFormat,
    format: StreamFormat,
}

struct DeviceOutput {
    device: Device,
    selected: Option<SelectedConfig>,
    stream: Option<Stream>,
}

impl DeviceOutput {
    fn configure(&mut self, format: StreamFormat) -> Result<()> {
        self.stop();

        let (config, sample_format) = select_config(&self.device, format.sample_rate_hz())?;
        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        self.selected = Some(SelectedConfig {
            config,
            sample_format,
            format,
        });
        Ok(())
    }

    fn start(&mut self, buffer: Arc<TransferBuffer>, length_in_samples: usize, listener: Arc<Notifier>) -> Result<()> {
        self.stop();

        let selected = self
            .selected
            .as_ref()
            .ok_or_else(|| Error::Codec("Output started before configure".to_string()))?;
        let depth = selected.format.bit_depth();

        let stream = match selected.sample_format {
            SampleFormat::F32 => {
                self.build_stream::<f32>(&selected.config, buffer, length_in_samples, listener, depth)?
            }
            SampleFormat::I16 => {
                self.build_stream::<i16>(&selected.config, buffer, length_in_samples, listener, depth)?
            }
            SampleFormat::U16 => {
                self.build_stream::<u16>(&selected.config, buffer, length_in_samples, listener, depth)?
            }
            sample_format => {
                return Err(Error::Codec(format!("Unsupported sample format: {:?}", sample_format)));
            }
        };

        stream
            .play()
            .map_err(|e| Error::Codec(format!("Failed to start stream: {}", e)))?;
        self.stream = Some(stream);

        debug!("Audio stream started ({} samples circular)", length_in_samples);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the stream halts the device callback
        if self.stream.take().is_some() {
            debug!("Audio stream stopped");
        }
    }

    fn build_stream<T>(
        &self,
        config: &StreamConfig,
        buffer: Arc<TransferBuffer>,
        length_in_samples: usize,
        listener: Arc<Notifier>,
        depth: BitDepth,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let half = length_in_samples / 2;
        let mut position = 0usize;
        let error_listener = Arc::clone(&listener);

        self.device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let value = offset_binary_to_f32(buffer.sample(position, depth), depth);
                        let sample = T::from_sample(value);
                        for slot in frame.iter_mut() {
                            *slot = sample;
                        }

                        position += 1;
                        if position == half || position == length_in_samples {
                            listener.transfer_complete();
                        }
                        if position == length_in_samples {
                            position = 0;
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_listener.transfer_error();
                },
                None,
            )
            .map_err(|e| Error::Codec(format!("Failed to build stream: {}", e)))
    }
}

/// Pick a device configuration that runs at exactly `sample_rate` Hz.
///
/// Prefers f32, then i16, then u16 samples, and the fewest channels.
fn select_config(device: &Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Codec(format!("Failed to get device configs: {}", e)))?;

    let best = supported
        .filter(|c| c.min_sample_rate().0 <= sample_rate && c.max_sample_rate().0 >= sample_rate)
        .filter_map(|c| format_rank(c.sample_format()).map(|rank| (rank, c)))
        .min_by_key(|(rank, c)| (*rank, c.channels()))
        .map(|(_, c)| c)
        .ok_or_else(|| Error::Codec(format!("Device cannot run at {} Hz", sample_rate)))?;

    let sample_format = best.sample_format();
    let config = best.with_sample_rate(cpal::SampleRate(sample_rate)).config();
    Ok((config, sample_format))
}

fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::F32 => Some(0),
        SampleFormat::I16 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

/// Map an offset-binary DAC code to a signed float in [-1.0, 1.0)
fn offset_binary_to_f32(value: u16, depth: BitDepth) -> f32 {
    match depth {
        BitDepth::Eight => (f32::from(value) - 128.0) / 128.0,
        BitDepth::Sixteen => (f32::from(value) - 32768.0) / 32768.0,
    }
}
