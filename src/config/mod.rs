//! Configuration: TOML file and command line

mod args;
mod file;

pub use args::{Args, Command};
pub use file::{AudioConfig, ConfigError, ShellConfig, WindowConfig};
