//! Capture backend on top of cpal
//!
//! cpal streams cannot leave the thread that built them, so each open
//! device gets a dedicated thread owning the stream and driven by a
//! command channel.

use crate::audio::backend::{CaptureBackend, CaptureStream, DeviceDescriptor};
use crate::audio::ingest::IngestTarget;
use crate::audio::{AudioFormat, SampleFormat};
use crate::error::{Result, ShellError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long to wait for the capture thread to report the negotiated format
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Command sent to a capture thread
enum StreamCommand {
    Play,
    Pause,
    Close,
}

/// Capture backend for the platform's default cpal host
pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        let host = cpal::default_host();
        debug!("Using audio host: {:?}", host.id());
        Self { host }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for CpalBackend {
    fn capture_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let default_name = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok());

        let devices = self
            .host
            .input_devices()
            .map_err(|e| ShellError::device_open_failed("input devices", e.to_string()))?;

        let descriptors = devices
            .enumerate()
            .map(|(index, device)| {
                let name = device
                    .name()
                    .unwrap_or_else(|_| format!("Input device {}", index));
                let is_default = default_name.as_deref() == Some(name.as_str());
                DeviceDescriptor {
                    index,
                    name,
                    is_default,
                }
            })
            .collect();

        Ok(descriptors)
    }

    fn open_capture(
        &mut self,
        device: &DeviceDescriptor,
        desired: &AudioFormat,
        target: IngestTarget,
    ) -> Result<Box<dyn CaptureStream>> {
        let stream = CpalStream::spawn(device.clone(), desired.clone(), target)?;
        Ok(Box::new(stream))
    }

    fn supports_loopback(&self) -> bool {
        cfg!(all(windows, feature = "loopback"))
    }

    #[cfg(all(windows, feature = "loopback"))]
    fn open_loopback(&mut self, target: IngestTarget) -> Result<Box<dyn CaptureStream>> {
        let stream = crate::audio::loopback::LoopbackStream::open(target)?;
        Ok(Box::new(stream))
    }
}

/// Open cpal input stream living on its own thread
pub struct CpalStream {
    device: String,
    format: AudioFormat,
    command_tx: Option<Sender<StreamCommand>>,
    handle: Option<JoinHandle<()>>,
    running: bool,
}

impl CpalStream {
    fn spawn(device: DeviceDescriptor, desired: AudioFormat, target: IngestTarget) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded::<Result<AudioFormat>>(1);
        let (command_tx, command_rx) = bounded::<StreamCommand>(8);

        let name = device.name.clone();
        let handle = thread::Builder::new()
            .name(format!("capture-{}", device.index))
            .spawn(move || stream_thread(device, desired, target, ready_tx, command_rx))?;

        let format = match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                // Thread is stuck in the platform; dropping the sender lets it exit later
                return Err(ShellError::device_open_failed(
                    name,
                    "timed out waiting for the device",
                ));
            }
        };

        info!("Opened capture device '{}' ({})", name, format);

        Ok(Self {
            device: name,
            format,
            command_tx: Some(command_tx),
            handle: Some(handle),
            running: false,
        })
    }

    fn send(&self, command: StreamCommand) -> Result<()> {
        match &self.command_tx {
            Some(tx) => tx
                .send(command)
                .map_err(|e| ShellError::ChannelError(e.to_string())),
            None => Err(ShellError::ChannelError(format!(
                "capture stream '{}' is closed",
                self.device
            ))),
        }
    }
}

impl CaptureStream for CpalStream {
    fn format(&self) -> &AudioFormat {
        &self.format
    }

    fn resume(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        self.send(StreamCommand::Play)?;
        self.running = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        self.send(StreamCommand::Pause)?;
        self.running = false;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(StreamCommand::Close);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("Closed capture device '{}'", self.device);
        }
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Capture thread function
fn stream_thread(
    device: DeviceDescriptor,
    desired: AudioFormat,
    target: IngestTarget,
    ready_tx: Sender<Result<AudioFormat>>,
    command_rx: Receiver<StreamCommand>,
) {
    let (stream, format) = match build_stream(&device, &desired, target) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Some hosts start streams immediately; the device opens paused
    let _ = stream.pause();
    let _ = ready_tx.send(Ok(format));

    for command in command_rx.iter() {
        match command {
            StreamCommand::Play => {
                if let Err(e) = stream.play() {
                    warn!("Failed to start capture on '{}': {}", device.name, e);
                }
            }
            StreamCommand::Pause => {
                if let Err(e) = stream.pause() {
                    warn!("Failed to pause capture on '{}': {}", device.name, e);
                }
            }
            StreamCommand::Close => break,
        }
    }

    drop(stream);
    debug!("Capture thread for '{}' stopped", device.name);
}

fn build_stream(
    descriptor: &DeviceDescriptor,
    desired: &AudioFormat,
    target: IngestTarget,
) -> Result<(cpal::Stream, AudioFormat)> {
    let host = cpal::default_host();
    let device = find_device(&host, descriptor)?;
    let (config, cpal_format) = negotiate(&device, descriptor, desired)?;

    let sample_format = from_cpal(cpal_format).ok_or_else(|| {
        ShellError::device_open_failed(
            &descriptor.name,
            format!("unsupported sample format {:?}", cpal_format),
        )
    })?;

    let format = AudioFormat {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
        sample_format,
    };
    format.check_channels()?;

    if format != *desired {
        info!(
            "Device '{}' granted {} instead of {}",
            descriptor.name, format, desired
        );
    }

    let mut sink = target.sink(format.clone());
    let device_name = descriptor.name.clone();
    let stream = device
        .build_input_stream_raw(
            &config,
            cpal_format,
            move |data: &cpal::Data, _: &cpal::InputCallbackInfo| sink.on_bytes(data.bytes()),
            move |err| warn!("Capture stream error on '{}': {}", device_name, err),
            None,
        )
        .map_err(|e| ShellError::device_open_failed(&descriptor.name, e.to_string()))?;

    Ok((stream, format))
}

/// Look the device up again by name, falling back to its index
fn find_device(host: &cpal::Host, descriptor: &DeviceDescriptor) -> Result<cpal::Device> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| ShellError::device_open_failed(&descriptor.name, e.to_string()))?
        .collect();

    let by_name = devices
        .iter()
        .position(|d| d.name().map(|n| n == descriptor.name).unwrap_or(false));

    let index = by_name.unwrap_or(descriptor.index);
    devices
        .into_iter()
        .nth(index)
        .ok_or_else(|| ShellError::device_open_failed(&descriptor.name, "device disappeared"))
}

/// Pick a stream config: the desired one if supported, otherwise the device default
fn negotiate(
    device: &cpal::Device,
    descriptor: &DeviceDescriptor,
    desired: &AudioFormat,
) -> Result<(cpal::StreamConfig, cpal::SampleFormat)> {
    let rate = cpal::SampleRate(desired.sample_rate);
    let wanted_format = to_cpal(desired.sample_format);

    let exact = device.supported_input_configs().ok().and_then(|mut ranges| {
        ranges.find(|r| {
            r.channels() == desired.channels
                && r.sample_format() == wanted_format
                && r.min_sample_rate() <= rate
                && rate <= r.max_sample_rate()
        })
    });

    let supported = match exact {
        Some(range) => range.with_sample_rate(rate),
        None => {
            debug!(
                "Device '{}' does not offer {}, using its default config",
                descriptor.name, desired
            );
            device
                .default_input_config()
                .map_err(|e| ShellError::device_open_failed(&descriptor.name, e.to_string()))?
        }
    };

    Ok((supported.config(), supported.sample_format()))
}

fn to_cpal(format: SampleFormat) -> cpal::SampleFormat {
    match format {
        SampleFormat::I16 => cpal::SampleFormat::I16,
        SampleFormat::F32 => cpal::SampleFormat::F32,
    }
}

fn from_cpal(format: cpal::SampleFormat) -> Option<SampleFormat> {
    match format {
        cpal::SampleFormat::I16 => Some(SampleFormat::I16),
        cpal::SampleFormat::F32 => Some(SampleFormat::F32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_s16_and_f32_are_accepted() {
        assert_eq!(from_cpal(cpal::SampleFormat::F32), Some(SampleFormat::F32));
        assert_eq!(from_cpal(cpal::SampleFormat::I16), Some(SampleFormat::I16));
        assert_eq!(from_cpal(cpal::SampleFormat::U8), None);
        assert_eq!(from_cpal(cpal::SampleFormat::F64), None);
    }

    #[test]
    fn sample_format_mapping_is_symmetric() {
        for format in [SampleFormat::I16, SampleFormat::F32] {
            assert_eq!(from_cpal(to_cpal(format)), Some(format));
        }
    }
}
