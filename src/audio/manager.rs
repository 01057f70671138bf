//! Audio device manager - source selection and capture lifecycle
//!
//! Owns at most one open capture stream and decides which source feeds the
//! PCM buffer: a hardware capture device, system loopback, or synthetic
//! noise when nothing real is available.

use crate::audio::backend::{CaptureBackend, CaptureStream, DeviceDescriptor};
use crate::audio::ingest::IngestTarget;
use crate::audio::pcm::{PcmWriter, SharedPcm};
use crate::audio::synth::SyntheticAudio;
use crate::audio::{AudioFormat, SampleFormat};
use crate::error::{Result, ShellError};
use crate::notify::Notifier;
use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, error, info, warn};

/// Which kind of source is feeding the PCM buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    /// A capture device from the enumeration
    Hardware,
    /// The system's mixed output
    Loopback,
    /// Synthetic noise injected once per frame
    Fake,
}

impl std::fmt::Display for AudioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioMode::Hardware => write!(f, "hardware"),
            AudioMode::Loopback => write!(f, "loopback"),
            AudioMode::Fake => write!(f, "simulated"),
        }
    }
}

/// Snapshot of the manager's source selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceState {
    pub available_device_count: usize,
    /// Cursor used by source toggling
    pub current_device_index: usize,
    /// Device that was last opened successfully
    pub selected_device_index: usize,
    pub mode: AudioMode,
    pub channel_count: u16,
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
    pub is_open: bool,
}

impl AudioDeviceState {
    fn initial() -> Self {
        let format = fake_format();
        Self {
            available_device_count: 0,
            current_device_index: 0,
            selected_device_index: 0,
            mode: AudioMode::Fake,
            channel_count: format.channels,
            sample_rate: format.sample_rate,
            sample_format: format.sample_format,
            is_open: false,
        }
    }
}

/// Format granted when a device opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenResult {
    pub channel_count: u16,
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
}

impl From<&AudioFormat> for OpenResult {
    fn from(format: &AudioFormat) -> Self {
        Self {
            channel_count: format.channels,
            sample_rate: format.sample_rate,
            sample_format: format.sample_format,
        }
    }
}

/// Result of a source toggle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A new source was selected (possibly the synthetic fallback)
    Switched(AudioMode),
    /// Nothing else to switch to; state is unchanged
    NoOp,
}

/// Synthetic audio is 16-bit stereo at the preferred rate
fn fake_format() -> AudioFormat {
    AudioFormat {
        sample_rate: AudioFormat::preferred().sample_rate,
        channels: 2,
        sample_format: SampleFormat::I16,
    }
}

/// Audio device manager coordinating enumeration, capture and fallback
pub struct AudioDeviceManager {
    backend: Box<dyn CaptureBackend>,
    desired: AudioFormat,
    start_device: usize,
    simulate: bool,
    state: AudioDeviceState,
    devices: Vec<DeviceDescriptor>,
    stream: Option<Box<dyn CaptureStream>>,
    target: IngestTarget,
    fatal_rx: Receiver<ShellError>,
    synth: SyntheticAudio,
    fake_writer: PcmWriter,
    notifier: Notifier,
}

impl AudioDeviceManager {
    /// Create a manager feeding `pcm`
    pub fn new(backend: Box<dyn CaptureBackend>, pcm: SharedPcm, notifier: Notifier) -> Self {
        let (fatal_tx, fatal_rx) = unbounded();
        Self {
            backend,
            desired: AudioFormat::preferred(),
            start_device: 0,
            simulate: false,
            state: AudioDeviceState::initial(),
            devices: Vec::new(),
            stream: None,
            fake_writer: pcm.writer(),
            target: IngestTarget::new(pcm, fatal_tx),
            fatal_rx,
            synth: SyntheticAudio::new(),
            notifier,
        }
    }

    /// Format requested when opening hardware devices
    pub fn with_desired_format(mut self, desired: AudioFormat) -> Self {
        self.desired = desired;
        self
    }

    /// Device index opened at startup
    pub fn with_start_device(mut self, index: usize) -> Self {
        self.start_device = index;
        self
    }

    /// Skip hardware entirely and run on synthetic audio
    pub fn with_simulation(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    pub fn with_synth(mut self, synth: SyntheticAudio) -> Self {
        self.synth = synth;
        self
    }

    pub fn state(&self) -> &AudioDeviceState {
        &self.state
    }

    pub fn mode(&self) -> AudioMode {
        self.state.mode
    }

    /// Devices from the last enumeration
    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Enumerate capture devices and remember the count
    pub fn enumerate_capture_devices(&mut self) -> Result<Vec<DeviceDescriptor>> {
        let devices = self.backend.capture_devices()?;
        self.state.available_device_count = devices.len();
        self.devices = devices.clone();

        if devices.is_empty() {
            return Err(ShellError::NoDeviceAvailable);
        }

        info!("Found {} audio capture devices:", devices.len());
        for device in &devices {
            info!("  {}", device);
        }
        Ok(devices)
    }

    /// Pick and open the initial audio source
    ///
    /// Only a fatal ingest error is returned; everything else ends in the
    /// synthetic fallback.
    pub fn open_audio_input(&mut self) -> Result<()> {
        if self.simulate {
            info!("Simulated audio requested");
            self.enter_fake("Using simulated audio");
            return Ok(());
        }

        if !self.probe_devices() {
            return Ok(());
        }
        self.state.current_device_index = self.start_index();
        self.init_audio_input()
    }

    /// Re-enumerate; on failure switch to synthetic audio and return false
    fn probe_devices(&mut self) -> bool {
        match self.enumerate_capture_devices() {
            Ok(_) => true,
            Err(ShellError::NoDeviceAvailable) => {
                warn!("No audio capture devices found, using simulated audio");
                self.enter_fake("No audio capture devices found: using simulated audio");
                false
            }
            Err(e) => {
                error!("Failed to enumerate audio capture devices: {}", e);
                self.enter_fake("Audio input unavailable: using simulated audio");
                false
            }
        }
    }

    /// Open the initial source and start delivery
    pub fn start(&mut self) -> Result<()> {
        self.open_audio_input()?;
        self.begin_capture();
        Ok(())
    }

    fn start_index(&self) -> usize {
        if self.start_device < self.devices.len() {
            return self.start_device;
        }
        warn!(
            "Configured audio device {} does not exist ({} found), using device 0",
            self.start_device,
            self.devices.len()
        );
        0
    }

    /// Open the device under the cursor, falling back to synthetic audio
    fn init_audio_input(&mut self) -> Result<()> {
        let desired = self.desired.clone();
        match self.open_device(self.state.current_device_index, &desired) {
            Ok(_) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("{}", e);
                self.enter_fake("Failed to open audio input: using simulated audio");
                Ok(())
            }
        }
    }

    /// Open capture device `index` from the last enumeration
    ///
    /// Any open stream is closed first. The new stream starts paused.
    pub fn open_device(&mut self, index: usize, desired: &AudioFormat) -> Result<OpenResult> {
        self.end_capture();

        let device = self.devices.get(index).cloned().ok_or_else(|| {
            ShellError::device_open_failed(format!("#{}", index), "no such capture device")
        })?;

        debug!("Opening audio capture device {}", device);
        let mut stream = self
            .backend
            .open_capture(&device, desired, self.target.clone())?;

        let format = stream.format().clone();
        if let Err(e) = format.check_channels() {
            stream.close();
            return Err(e);
        }

        self.stream = Some(stream);
        self.state.mode = AudioMode::Hardware;
        self.state.current_device_index = index;
        self.state.selected_device_index = index;
        self.set_format(&format);
        self.state.is_open = true;

        info!(
            "Opened audio capture device {} (index {}): {}",
            device.name, index, format
        );
        self.notifier.notify(format!("{} selected", device.name));

        Ok(OpenResult::from(&format))
    }

    fn set_format(&mut self, format: &AudioFormat) {
        self.state.channel_count = format.channels;
        self.state.sample_rate = format.sample_rate;
        self.state.sample_format = format.sample_format;
    }

    /// Start delivery on the open stream; no-op when already running
    pub fn begin_capture(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        if stream.is_running() {
            return;
        }
        match stream.resume() {
            Ok(()) => info!("Audio capture started ({})", self.state.mode),
            Err(e) => {
                error!("Failed to start audio capture: {}", e);
                self.enter_fake("Audio capture failed: using simulated audio");
            }
        }
    }

    /// Stop and close the open stream; no-op when nothing is open
    pub fn end_capture(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Pause before close failed: {}", e);
            }
            stream.close();
            info!("Audio capture stopped");
        }
        self.state.is_open = false;
    }

    /// Switch to the next audio source
    ///
    /// Hardware devices are visited in order. After the last one comes
    /// loopback when available, then the cycle restarts at device 0.
    pub fn toggle_source(&mut self) -> Result<ToggleOutcome> {
        if self.state.mode == AudioMode::Loopback {
            self.end_capture();
            if self.probe_devices() {
                self.state.current_device_index = 0;
                self.init_audio_input()?;
                self.begin_capture();
            }
            return Ok(ToggleOutcome::Switched(self.state.mode));
        }

        // Simulated audio from startup has never enumerated
        if self.state.mode == AudioMode::Fake
            && self.state.available_device_count == 0
            && !self.probe_devices()
        {
            if self.backend.supports_loopback() {
                return self.switch_to_loopback();
            }
            info!("No audio capture devices to switch to");
            return Ok(ToggleOutcome::NoOp);
        }

        let count = self.state.available_device_count;
        let next = self.state.current_device_index + 1;

        if next >= count {
            if self.backend.supports_loopback() {
                return self.switch_to_loopback();
            }
            if count <= 1 {
                info!("Only one audio capture device available, nothing to switch to");
                return Ok(ToggleOutcome::NoOp);
            }
        }

        self.end_capture();
        self.state.current_device_index = if next >= count { 0 } else { next };
        self.init_audio_input()?;
        self.begin_capture();
        Ok(ToggleOutcome::Switched(self.state.mode))
    }

    fn switch_to_loopback(&mut self) -> Result<ToggleOutcome> {
        self.end_capture();
        self.state.current_device_index = 0;

        match self.backend.open_loopback(self.target.clone()) {
            Ok(stream) => {
                let format = stream.format().clone();
                self.stream = Some(stream);
                self.state.mode = AudioMode::Loopback;
                self.set_format(&format);
                self.state.is_open = true;
                info!("Opened loopback capture: {}", format);
                self.notifier.notify("Loopback audio selected");
                self.begin_capture();
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Failed to open loopback capture: {}", e);
                self.enter_fake("Loopback unavailable: using simulated audio");
            }
        }

        Ok(ToggleOutcome::Switched(self.state.mode))
    }

    fn enter_fake(&mut self, message: &str) {
        self.end_capture();
        self.state.mode = AudioMode::Fake;
        self.set_format(&fake_format());
        debug!("Switched to simulated audio");
        self.notifier.notify(message);
    }

    /// Per-frame audio work
    ///
    /// Surfaces fatal ingest errors from the capture callback and injects
    /// one synthetic window when running on simulated audio.
    pub fn tick(&mut self) -> Result<()> {
        if let Ok(e) = self.fatal_rx.try_recv() {
            self.end_capture();
            return Err(e);
        }

        if self.state.mode == AudioMode::Fake {
            let block = self.synth.next_block();
            self.fake_writer.add_pcm16(&block);
        }
        Ok(())
    }

    /// Release the capture device
    pub fn shutdown(&mut self) {
        self.end_capture();
    }
}

impl Drop for AudioDeviceManager {
    fn drop(&mut self) {
        self.end_capture();
    }
}
