//! Configuration file support

use crate::audio::{AudioFormat, SampleFormat};
use crate::display::DisplayRect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up next to the executable
const LOCAL_FILE: &str = "vizshell.toml";

/// Shell configuration loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log file path (empty = no file logging)
    pub log_file: String,

    pub audio: AudioConfig,

    pub window: WindowConfig,
}

/// `[audio]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Requested sample rate in Hz
    pub sample_rate: u32,

    /// Requested channel count (1 or 2)
    pub channels: u16,

    /// Requested sample encoding ("f32" or "i16")
    pub sample_format: SampleFormat,

    /// Capture device opened at startup, by enumeration index
    pub start_device: usize,

    /// Skip the hardware and run on synthetic audio
    pub fake_audio: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let preferred = AudioFormat::preferred();
        Self {
            sample_rate: preferred.sample_rate,
            channels: preferred.channels,
            sample_format: preferred.sample_format,
            start_device: 0,
            fake_audio: false,
        }
    }
}

impl AudioConfig {
    /// Format requested when opening a capture device
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_format: self.sample_format,
        }
    }
}

/// `[window]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Initial window width
    pub width: i32,

    /// Initial window height
    pub height: i32,

    /// Composite the engine's texture onto a spinning quad
    pub render_to_texture: bool,

    pub start_fullscreen: bool,

    /// Displays simulated by the headless window
    pub displays: Vec<DisplayRect>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            render_to_texture: false,
            start_fullscreen: false,
            displays: vec![DisplayRect::new(0, 0, 1920, 1080)],
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: String::new(),
            audio: AudioConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl ShellConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Searches in order:
    /// 1. Same directory as executable: vizshell.toml
    /// 2. User config directory: vizshell/config.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        for path in Self::search_paths() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load from `path` when given, otherwise from the default locations
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                paths.push(exe_dir.join(LOCAL_FILE));
            }
        }
        if let Some(path) = Self::user_config_path() {
            paths.push(path);
        }
        paths
    }

    /// Per-user configuration file location
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vizshell").join("config.toml"))
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_string_lossy().to_string(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Reject values the shell cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.audio.channels, 1 | 2) {
            return Err(ConfigError::Invalid(format!(
                "audio.channels must be 1 or 2, got {}",
                self.audio.channels
            )));
        }
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "audio.sample_rate must be positive".to_string(),
            ));
        }
        if self.window.width <= 0 || self.window.height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be positive, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if let Some(d) = self
            .window
            .displays
            .iter()
            .find(|d| d.width <= 0 || d.height <= 0)
        {
            return Err(ConfigError::Invalid(format!(
                "display at ({}, {}) has an empty size",
                d.x, d.y
            )));
        }
        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# vizshell configuration

# Log level: trace, debug, info, warn, error (default: info)
log_level = "info"

# Log file path (empty = no file logging)
log_file = ""

[audio]
# Format requested from the capture device
sample_rate = 44100
channels = 2
sample_format = "f32"

# Capture device opened at startup (see `vizshell list`)
start_device = 0

# Run on synthetic audio instead of a capture device
fake_audio = false

[window]
width = 1280
height = 720

# Draw the visuals onto a spinning textured quad
render_to_texture = false

start_fullscreen = false

# Displays simulated by the headless window
[[window.displays]]
x = 0
y = 0
width = 1920
height = 1080
"#
        .to_string()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading/writing config file
    Io {
        path: String,
        source: std::io::Error,
    },
    /// Error parsing TOML
    Parse {
        path: String,
        source: toml::de::Error,
    },
    /// Error serializing config
    Serialize(toml::ser::Error),
    /// Parsed but unusable value
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to access config file '{}': {}", path, source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path, source)
            }
            ConfigError::Serialize(e) => write!(f, "Failed to serialize config: {}", e),
            ConfigError::Invalid(message) => write!(f, "Invalid config: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Serialize(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}
