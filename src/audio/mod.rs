//! Audio capture, PCM ingest and device lifecycle

mod backend;
mod host;
mod ingest;
#[cfg(all(windows, feature = "loopback"))]
mod loopback;
mod manager;
mod pcm;
mod synth;

pub use backend::{CaptureBackend, CaptureStream, DeviceDescriptor};
pub use host::CpalBackend;
pub use ingest::{deinterleave_s16, CaptureSink, IngestTarget};
#[cfg(all(windows, feature = "loopback"))]
pub use loopback::{LoopbackCapture, LoopbackStream};
pub use manager::{AudioDeviceManager, AudioDeviceState, AudioMode, OpenResult, ToggleOutcome};
pub use pcm::{Pcm16Block, PcmBuffer, PcmWindow, PcmWriter, SharedPcm, PCM_WINDOW};
pub use synth::SyntheticAudio;

use crate::error::{Result, ShellError};
use serde::{Deserialize, Serialize};

/// Sample encodings accepted by the ingest path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Signed 16-bit integer
    I16,
    /// 32-bit IEEE float
    F32,
}

impl SampleFormat {
    /// Size of one sample in bytes
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::I16 => 2,
            SampleFormat::F32 => 4,
        }
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleFormat::I16 => write!(f, "s16"),
            SampleFormat::F32 => write!(f, "f32"),
        }
    }
}

/// Audio format information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    /// Format requested when opening a capture device: 44.1kHz float stereo
    pub fn preferred() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            sample_format: SampleFormat::F32,
        }
    }

    /// Bytes per interleaved frame
    pub fn block_align(&self) -> usize {
        self.channels as usize * self.sample_format.bytes_per_sample()
    }

    /// Reject channel layouts the ingest path cannot handle
    pub fn check_channels(&self) -> Result<()> {
        match self.channels {
            1 | 2 => Ok(()),
            other => Err(ShellError::UnsupportedChannelLayout(other)),
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Hz {}ch {}",
            self.sample_rate, self.channels, self.sample_format
        )
    }
}
