//! Platform seam for audio capture

use crate::audio::ingest::IngestTarget;
use crate::audio::AudioFormat;
use crate::error::{Result, ShellError};

/// Capture device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Position in the enumeration order
    pub index: usize,
    /// Human-readable name
    pub name: String,
    /// Whether this is the platform default input
    pub is_default: bool,
}

impl std::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.index, self.name)?;
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// An open capture stream delivering samples to its sink
///
/// Streams are opened paused.
pub trait CaptureStream {
    /// Format actually granted by the platform
    fn format(&self) -> &AudioFormat;

    /// Start or resume delivery
    fn resume(&mut self) -> Result<()>;

    /// Stop delivery, keeping the device open
    fn pause(&mut self) -> Result<()>;

    /// Release the device. No callback runs after this returns.
    fn close(&mut self);

    fn is_running(&self) -> bool;
}

/// Source of capture devices and streams
pub trait CaptureBackend {
    /// List capture devices in a stable order
    fn capture_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Open a capture device, negotiating as close to `desired` as possible
    fn open_capture(
        &mut self,
        device: &DeviceDescriptor,
        desired: &AudioFormat,
        target: IngestTarget,
    ) -> Result<Box<dyn CaptureStream>>;

    /// Whether system output capture exists on this platform build
    fn supports_loopback(&self) -> bool {
        false
    }

    /// Open a stream capturing the system's mixed output
    fn open_loopback(&mut self, _target: IngestTarget) -> Result<Box<dyn CaptureStream>> {
        Err(ShellError::LoopbackUnavailable(
            "not supported on this platform".to_string(),
        ))
    }
}
