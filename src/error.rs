//! Unified error types for vizshell

use thiserror::Error;

/// Main error type for vizshell operations
#[derive(Error, Debug)]
pub enum ShellError {
    /// Zero capture devices were found
    #[error("No audio capture devices found")]
    NoDeviceAvailable,

    /// The platform refused the requested device or format
    #[error("Failed to open audio capture device '{device}': {message}")]
    DeviceOpenFailed { device: String, message: String },

    /// Negotiated channel count is outside {1, 2}
    #[error("Unsupported channel layout: {0} channels (only mono and stereo are supported)")]
    UnsupportedChannelLayout(u16),

    /// Loopback capture was requested but is not compiled in or failed
    #[error("Loopback capture unavailable: {0}")]
    LoopbackUnavailable(String),

    /// Thread communication error
    #[error("Thread communication error: {0}")]
    ChannelError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// COM call failed (loopback capture)
    #[cfg(all(windows, feature = "loopback"))]
    #[error("COM call failed: {0}")]
    Com(#[from] windows::core::Error),
}

/// Result type alias for vizshell operations
pub type Result<T> = std::result::Result<T, ShellError>;

impl ShellError {
    /// Create a device-open error with context
    pub fn device_open_failed(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceOpenFailed {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Check if this error must stop the process
    ///
    /// Everything except a bad channel layout is recovered locally by
    /// falling back to another audio source.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::UnsupportedChannelLayout(_))
    }
}
