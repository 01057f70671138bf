//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// vizshell - audio-reactive visualizer shell
///
/// Captures live audio and drives a visual renderer across one or more displays
#[derive(Parser, Debug)]
#[command(name = "vizshell")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbose output (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output to file
    #[arg(long, global = true)]
    pub log: Option<String>,

    /// Configuration file (default: vizshell.toml next to the binary,
    /// then the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List audio capture devices
    List,

    /// Run the visualizer
    Run {
        /// Capture device index to start on (see `list`)
        #[arg(short, long)]
        device: Option<usize>,

        /// Use synthetic audio instead of a capture device
        #[arg(long)]
        fake_audio: bool,

        /// Start in fullscreen
        #[arg(long)]
        fullscreen: bool,

        /// Composite the visuals onto a textured quad
        #[arg(long)]
        render_to_texture: bool,

        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Stop after this many seconds (default: run until Ctrl+C)
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Print or write a sample configuration file
    SampleConfig {
        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    /// Get the log level based on verbose/quiet flags
    ///
    /// Returns None when neither flag was given, so the configured level
    /// applies.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.quiet {
            Some(tracing::Level::ERROR)
        } else {
            match self.verbose {
                0 => None,
                1 => Some(tracing::Level::DEBUG),
                _ => Some(tracing::Level::TRACE),
            }
        }
    }

    /// Filter directive combining the flags with the configured level
    pub fn filter_directive(&self, configured: &str) -> String {
        match self.log_level() {
            Some(level) => level.to_string(),
            None if configured.is_empty() => tracing::Level::INFO.to_string(),
            None => configured.to_string(),
        }
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::Run {
            device: None,
            fake_audio: false,
            fullscreen: false,
            render_to_texture: false,
            fps: 60,
            seconds: None,
        }
    }
}
