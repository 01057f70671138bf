//! vizshell - audio-reactive visualizer shell CLI

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vizshell::audio::{CaptureBackend, CpalBackend};
use vizshell::config::{Args, Command, ShellConfig};
use vizshell::headless::{HeadlessWindow, LevelMeterEngine};
use vizshell::render::TextureHandle;
use vizshell::VisualizerShell;

fn main() -> Result<()> {
    let args = Args::parse();

    let config = ShellConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&args, &config)?;

    // Execute command
    match args.command.clone().unwrap_or_default() {
        Command::List => cmd_list(),
        Command::Run {
            device,
            fake_audio,
            fullscreen,
            render_to_texture,
            fps,
            seconds,
        } => {
            let mut config = config;
            if let Some(device) = device {
                config.audio.start_device = device;
            }
            config.audio.fake_audio |= fake_audio;
            config.window.start_fullscreen |= fullscreen;
            config.window.render_to_texture |= render_to_texture;
            cmd_run(config, fps, seconds)
        }
        Command::SampleConfig { output } => cmd_sample_config(output),
    }
}

fn init_logging(args: &Args, config: &ShellConfig) -> Result<()> {
    let directive = args.filter_directive(&config.log_level);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let log_file = args
        .log
        .clone()
        .or_else(|| (!config.log_file.is_empty()).then(|| config.log_file.clone()));

    if let Some(log_file) = log_file {
        let file = std::fs::File::create(&log_file)
            .with_context(|| format!("Failed to create log file '{}'", log_file))?;
        subscriber.with_ansi(false).with_writer(file).init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// List audio capture devices
fn cmd_list() -> Result<()> {
    let backend = CpalBackend::new();
    let devices = backend.capture_devices()?;

    if devices.is_empty() {
        println!("No audio capture devices found.");
    } else {
        println!("Audio capture devices:\n");
        for device in &devices {
            println!("  {}", device);
        }
    }

    if backend.supports_loopback() {
        println!("\nLoopback capture of the system output is available.");
    }
    println!();
    Ok(())
}

/// Run the shell on the headless window
fn cmd_run(config: ShellConfig, fps: u32, seconds: Option<u64>) -> Result<()> {
    println!("vizshell - audio-reactive visualizer shell\n");

    let window = HeadlessWindow::new(
        config.window.displays.clone(),
        (config.window.width, config.window.height),
    );
    let mut engine = LevelMeterEngine::new().with_log_interval(u64::from(fps.max(1)));
    if config.window.render_to_texture {
        engine = engine.with_render_texture(TextureHandle(1));
    }

    let mut shell = VisualizerShell::new(engine, window, Box::new(CpalBackend::new()), &config);

    // Setup Ctrl+C handler
    let done = shell.done_flag();
    ctrlc::set_handler(move || {
        println!("\nReceived Ctrl+C, stopping...");
        done.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    if let Err(e) = shell.init() {
        error!("Failed to start: {}", e);
        return Err(e.into());
    }

    let state = shell.audio().state().clone();
    println!(
        "Audio: {} ({} Hz, {} ch, {})",
        state.mode, state.sample_rate, state.channel_count, state.sample_format
    );
    println!("\nRunning. Press Ctrl+C to stop.\n");

    let frame_interval = Duration::from_secs(1) / fps.max(1);
    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));
    let result = shell.run(frame_interval, deadline);

    shell.shutdown();
    if let Err(e) = &result {
        error!("Stopped on error: {}", e);
    }
    result?;

    info!("Rendered {} frames", shell.frame_count());
    println!("Stopped.");
    Ok(())
}

/// Print the sample configuration or write it to a file
fn cmd_sample_config(output: Option<PathBuf>) -> Result<()> {
    let sample = ShellConfig::sample_config();
    match output {
        Some(path) => {
            std::fs::write(&path, sample)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            println!("Sample configuration written to {}", path.display());
        }
        None => print!("{}", sample),
    }
    Ok(())
}
