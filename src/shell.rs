//! Visualizer shell - owns every subsystem and runs the frame loop

use crate::audio::{AudioDeviceManager, CaptureBackend, PcmBuffer, SharedPcm, ToggleOutcome};
use crate::config::ShellConfig;
use crate::display::{DisplayLayout, WindowPlatform};
use crate::driver::FrameDriver;
use crate::error::Result;
use crate::input::{EventDispatcher, ShellCommand};
use crate::notify::{Notification, Notifier};
use crate::render::RenderEngine;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Title prefix; the preset name follows
const TITLE: &str = "vizshell";

/// The running visualizer: audio, window layout, input and frame driving
pub struct VisualizerShell<E: RenderEngine, W: WindowPlatform> {
    engine: E,
    window: W,
    audio: AudioDeviceManager,
    layout: DisplayLayout,
    dispatcher: EventDispatcher,
    driver: FrameDriver,
    pcm: SharedPcm,
    notifications: Receiver<Notification>,
    done: Arc<AtomicBool>,
    viewport: (i32, i32),
    start_fullscreen: bool,
}

impl<E: RenderEngine, W: WindowPlatform> VisualizerShell<E, W> {
    /// Wire up a shell; nothing is opened until [`init`](Self::init)
    pub fn new(engine: E, window: W, backend: Box<dyn CaptureBackend>, config: &ShellConfig) -> Self {
        let pcm = PcmBuffer::shared();
        let (notifier, notifications) = Notifier::channel();

        let audio = AudioDeviceManager::new(backend, pcm.clone(), notifier)
            .with_desired_format(config.audio.format())
            .with_start_device(config.audio.start_device)
            .with_simulation(config.audio.fake_audio);

        let viewport = window.drawable_size();
        let position = window
            .window_display_index()
            .and_then(|index| window.display_bounds().get(index).map(|d| (d.x, d.y)))
            .unwrap_or((0, 0));

        Self {
            engine,
            window,
            audio,
            layout: DisplayLayout::new(position, viewport),
            dispatcher: EventDispatcher::new(viewport.0, viewport.1),
            driver: FrameDriver::new(config.window.render_to_texture),
            pcm,
            notifications,
            done: Arc::new(AtomicBool::new(false)),
            viewport,
            start_fullscreen: config.window.start_fullscreen,
        }
    }

    /// Open the audio input and size the engine's viewport
    ///
    /// Fails only on a fatal audio error.
    pub fn init(&mut self) -> Result<()> {
        self.audio.start()?;
        self.window.set_title(TITLE);
        self.set_viewport(self.window.drawable_size());

        if self.start_fullscreen {
            self.toggle_full_screen();
        }

        info!(
            "Shell ready: {}x{}, audio {}",
            self.viewport.0,
            self.viewport.1,
            self.audio.mode()
        );
        Ok(())
    }

    /// Flag that ends the frame loop; safe to set from any thread
    pub fn done_flag(&self) -> Arc<AtomicBool> {
        self.done.clone()
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn audio(&self) -> &AudioDeviceManager {
        &self.audio
    }

    pub fn layout(&self) -> &DisplayLayout {
        &self.layout
    }

    pub fn viewport(&self) -> (i32, i32) {
        self.viewport
    }

    pub fn frame_count(&self) -> u64 {
        self.driver.frame_count()
    }

    pub fn pcm(&self) -> &SharedPcm {
        &self.pcm
    }

    fn set_viewport(&mut self, (width, height): (i32, i32)) {
        self.viewport = (width, height);
        self.dispatcher.set_viewport(width, height);
        self.layout.observe_size(width, height);
        self.engine.reset_viewport(width, height);
    }

    /// Drain pending window events
    pub fn poll_events(&mut self) -> Result<()> {
        while let Some(event) = self.window.poll_event() {
            let command = self
                .dispatcher
                .dispatch(event, &mut self.engine, &mut self.window);
            if let Some(command) = command {
                self.handle_command(command)?;
            }
        }
        Ok(())
    }

    /// Carry out a command produced by the dispatcher
    pub fn handle_command(&mut self, command: ShellCommand) -> Result<()> {
        debug!("Shell command: {:?}", command);
        match command {
            ShellCommand::Quit => {
                info!("Quit requested");
                self.done.store(true, Ordering::SeqCst);
            }
            ShellCommand::ToggleAudioSource => match self.audio.toggle_source()? {
                ToggleOutcome::Switched(mode) => info!("Audio source is now {}", mode),
                ToggleOutcome::NoOp => {
                    info!("There is only one audio capture device, not switching")
                }
            },
            ShellCommand::ToggleStretch => {
                if !self.layout.is_stretched() {
                    if self.layout.apply_stretch(&mut self.window) {
                        self.layout.set_stretched(true);
                    }
                } else {
                    self.toggle_full_screen();
                    self.layout.set_stretched(false);
                }
            }
            ShellCommand::NextMonitor => {
                self.layout.move_to_next_display(&mut self.window);
                self.layout.set_stretched(false);
            }
            ShellCommand::ToggleFullScreen => {
                self.toggle_full_screen();
                self.layout.set_stretched(false);
            }
            ShellCommand::Resized { width, height } => {
                self.viewport = (width, height);
                self.layout.observe_size(width, height);
                debug!("Viewport resized to {}x{}", width, height);
            }
        }
        Ok(())
    }

    fn toggle_full_screen(&mut self) {
        if let Some(size) = self.layout.toggle_full_screen(&mut self.window) {
            self.set_viewport(size);
        }
    }

    /// Render and present one frame
    ///
    /// Audio work for the frame happens first, so a fatal capture error
    /// stops the loop before anything is drawn.
    pub fn render_frame(&mut self) -> Result<()> {
        self.audio.tick()?;

        for notification in self.notifications.try_iter() {
            self.engine.set_toast_message(&notification.0);
        }

        self.driver
            .render_frame(&mut self.engine, &self.pcm, &mut self.window, self.viewport);

        if let Some(name) = self.engine.take_preset_switch() {
            self.preset_switched(&name);
        }

        self.window.present();
        Ok(())
    }

    /// Events then one frame; returns false once the shell should stop
    pub fn tick(&mut self) -> Result<bool> {
        self.poll_events()?;
        if self.is_done() {
            return Ok(false);
        }
        self.render_frame()?;
        Ok(!self.is_done())
    }

    /// Run frames at `frame_interval` until quit or `deadline`
    pub fn run(&mut self, frame_interval: Duration, deadline: Option<Instant>) -> Result<()> {
        loop {
            let started = Instant::now();
            if !self.tick()? {
                break;
            }
            if deadline.is_some_and(|deadline| started >= deadline) {
                info!("Run time elapsed");
                break;
            }
            if let Some(remaining) = frame_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
        info!("Frame loop finished after {} frames", self.frame_count());
        Ok(())
    }

    /// The render engine moved to another preset
    pub fn preset_switched(&mut self, name: &str) {
        info!("Displaying preset: {}", name);
        self.window.set_title(&format!("{} ➫ {}", TITLE, name));
    }

    /// Stop capture and mark the shell done
    pub fn shutdown(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        self.audio.shutdown();
        info!(
            "Shell stopped after {} frames ({} audio windows dropped)",
            self.frame_count(),
            self.pcm.dropped()
        );
    }
}
