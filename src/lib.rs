//! vizshell - runtime shell for an audio-reactive visualizer
//!
//! Captures live audio into a shared PCM window, lays the output window
//! out across one or more displays, translates input into engine and
//! shell actions, and drives an external render engine once per frame.

pub mod audio;
pub mod config;
pub mod display;
pub mod driver;
pub mod error;
pub mod headless;
pub mod input;
pub mod notify;
pub mod render;
pub mod shell;

#[cfg(test)]
mod testing;

pub use error::{Result, ShellError};
pub use shell::VisualizerShell;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
