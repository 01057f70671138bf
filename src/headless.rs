//! Headless window and a level-meter engine
//!
//! Lets the binary run the whole shell (audio capture, layout, input,
//! frame driving) without a GPU window. Draw commands are counted rather
//! than rasterized.

use crate::audio::PcmWindow;
use crate::display::{DisplayRect, WindowPlatform};
use crate::input::{InputEvent, Key, KeyEvent, TouchAnchors};
use crate::render::{
    Border, DrawCommand, DrawTarget, FrameComposition, MotionVectors, RenderContext,
    RenderEngine, Rgba, Shape, Text, TextureHandle, TextureManager,
};
use std::collections::VecDeque;
use tracing::{debug, info, trace};

/// Display used when none are configured
const PRIMARY: DisplayRect = DisplayRect::new(0, 0, 1920, 1080);

/// Window platform backed by virtual displays
#[derive(Debug)]
pub struct HeadlessWindow {
    displays: Vec<DisplayRect>,
    position: (i32, i32),
    size: (i32, i32),
    fullscreen: bool,
    cursor_visible: bool,
    text_input: bool,
    title: String,
    events: VecDeque<InputEvent>,
    frame_commands: usize,
    last_frame_commands: usize,
    presented: u64,
    quit_after: Option<u64>,
}

impl HeadlessWindow {
    pub fn new(displays: Vec<DisplayRect>, size: (i32, i32)) -> Self {
        let displays = if displays.is_empty() {
            vec![PRIMARY]
        } else {
            displays
        };
        let position = (displays[0].x, displays[0].y);
        Self {
            displays,
            position,
            size,
            fullscreen: false,
            cursor_visible: true,
            text_input: false,
            title: String::new(),
            events: VecDeque::new(),
            frame_commands: 0,
            last_frame_commands: 0,
            presented: 0,
            quit_after: None,
        }
    }

    /// Queue a quit event once `frames` frames have been presented
    pub fn quit_after(mut self, frames: u64) -> Self {
        self.quit_after = Some(frames);
        self
    }

    /// Inject an input event
    pub fn push_event(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Draw commands submitted for the last presented frame
    pub fn last_frame_commands(&self) -> usize {
        self.last_frame_commands
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    pub fn size(&self) -> (i32, i32) {
        self.size
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

impl DrawTarget for HeadlessWindow {
    fn submit(&mut self, _command: DrawCommand) {
        self.frame_commands += 1;
    }
}

impl WindowPlatform for HeadlessWindow {
    fn display_bounds(&self) -> Vec<DisplayRect> {
        self.displays.clone()
    }

    fn desktop_mode(&self, display: usize) -> Option<(i32, i32)> {
        self.displays.get(display).map(|d| (d.width, d.height))
    }

    fn window_display_index(&self) -> Option<usize> {
        let (x, y) = self.position;
        self.displays.iter().position(|d| d.contains(x, y))
    }

    fn set_window_position(&mut self, x: i32, y: i32) {
        self.position = (x, y);
    }

    fn set_window_size(&mut self, width: i32, height: i32) {
        if self.size != (width, height) {
            self.size = (width, height);
            self.events.push_back(InputEvent::WindowSizeChanged);
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    fn show_cursor(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    fn drawable_size(&self) -> (i32, i32) {
        self.size
    }

    fn set_text_input(&mut self, active: bool) {
        self.text_input = active;
    }

    fn set_title(&mut self, title: &str) {
        debug!("Window title: {}", title);
        self.title = title.to_string();
    }

    fn poll_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    fn present(&mut self) {
        self.presented += 1;
        self.last_frame_commands = std::mem::take(&mut self.frame_commands);
        trace!(
            "Presented frame {} ({} draw commands)",
            self.presented,
            self.last_frame_commands
        );

        if self.quit_after == Some(self.presented) {
            self.events.push_back(InputEvent::Quit);
        }
    }
}

/// Texture manager with nothing loaded
#[derive(Debug, Default)]
pub struct NullTextures;

impl TextureManager for NullTextures {
    fn lookup(&self, _url: &str) -> Option<TextureHandle> {
        None
    }
}

struct Palette {
    name: &'static str,
    fill: Rgba,
    rim: Rgba,
}

const PALETTES: [Palette; 4] = [
    Palette {
        name: "Ember",
        fill: Rgba::new(1.0, 0.55, 0.1, 0.9),
        rim: Rgba::new(0.6, 0.0, 0.0, 0.0),
    },
    Palette {
        name: "Tide",
        fill: Rgba::new(0.2, 0.7, 1.0, 0.9),
        rim: Rgba::new(0.0, 0.1, 0.5, 0.0),
    },
    Palette {
        name: "Moss",
        fill: Rgba::new(0.5, 0.9, 0.3, 0.9),
        rim: Rgba::new(0.0, 0.3, 0.1, 0.0),
    },
    Palette {
        name: "Ash",
        fill: Rgba::new(0.9, 0.9, 0.9, 0.9),
        rim: Rgba::new(0.2, 0.2, 0.2, 0.0),
    },
];

/// Frames a toast stays on screen
const TOAST_FRAMES: u32 = 180;

const TEXSIZE: u32 = 512;

/// Render engine drawing one pulsing disc per channel
///
/// Presets are color palettes. Touch anchors show up as small outlined
/// markers.
pub struct LevelMeterEngine {
    viewport: (i32, i32),
    palette: usize,
    locked: bool,
    text_input: bool,
    search: String,
    anchors: TouchAnchors,
    toast: Option<(String, u32)>,
    switched: Option<String>,
    render_texture: Option<TextureHandle>,
    frames: u64,
    log_every: u64,
    textures: NullTextures,
}

impl LevelMeterEngine {
    pub fn new() -> Self {
        Self {
            viewport: (1, 1),
            palette: 0,
            locked: false,
            text_input: false,
            search: String::new(),
            anchors: TouchAnchors::new(),
            toast: None,
            switched: None,
            render_texture: None,
            frames: 0,
            log_every: 60,
            textures: NullTextures,
        }
    }

    /// Report frames as drawn into an off-screen texture
    pub fn with_render_texture(mut self, texture: TextureHandle) -> Self {
        self.render_texture = Some(texture);
        self
    }

    /// Log channel levels every `frames` frames
    pub fn with_log_interval(mut self, frames: u64) -> Self {
        self.log_every = frames.max(1);
        self
    }

    pub fn preset_name(&self) -> &'static str {
        PALETTES[self.palette].name
    }

    pub fn search_text(&self) -> &str {
        &self.search
    }

    pub fn anchors(&self) -> &TouchAnchors {
        &self.anchors
    }

    pub fn toast(&self) -> Option<&str> {
        self.toast.as_ref().map(|(message, _)| message.as_str())
    }

    /// Presets whose name contains the search text
    pub fn matching_presets(&self) -> Vec<&'static str> {
        let needle = self.search.to_lowercase();
        PALETTES
            .iter()
            .map(|p| p.name)
            .filter(|name| name.to_lowercase().contains(&needle))
            .collect()
    }

    fn switch_to(&mut self, index: usize) {
        self.palette = index % PALETTES.len();
        self.switched = Some(self.preset_name().to_string());
    }

    fn compose(&self, pcm: &PcmWindow) -> FrameComposition {
        let palette = &PALETTES[self.palette];
        let (left, right) = pcm.rms();

        let mut frame = FrameComposition::new();
        frame.push(MotionVectors {
            color: Rgba { a: 0.25, ..palette.fill },
            ..MotionVectors::default()
        });
        for (x, level) in [(0.3, left), (0.7, right)] {
            frame.push(Shape {
                sides: 48,
                x,
                radius: 0.08 + level.min(1.0) * 0.4,
                additive: true,
                color: palette.fill,
                color2: palette.rim,
                ..Shape::default()
            });
        }
        for anchor in self.anchors.iter() {
            frame.push(Shape {
                sides: 12,
                x: anchor.x,
                y: 1.0 - anchor.y,
                radius: 0.03,
                color: Rgba::WHITE,
                border: Rgba::WHITE,
                ..Shape::default()
            });
        }
        frame.push(Border::default());
        frame.push(Text {
            enabled: self.toast.is_some(),
        });
        frame
    }
}

impl Default for LevelMeterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine for LevelMeterEngine {
    fn render_frame(&mut self, pcm: &PcmWindow, target: &mut dyn DrawTarget) {
        let frame = self.compose(pcm);
        let (width, height) = self.viewport;
        let mut ctx = RenderContext {
            target,
            textures: &self.textures,
            texsize: TEXSIZE,
            aspect_ratio: width as f32 / height.max(1) as f32,
            aspect_correct: true,
        };
        frame.draw(&mut ctx);

        self.frames += 1;
        if self.frames % self.log_every == 0 {
            let (left, right) = pcm.rms();
            info!(
                "Levels: L {:.3} R {:.3} ({} windows, preset {})",
                left,
                right,
                pcm.sequence,
                self.preset_name()
            );
        }

        if let Some((_, remaining)) = self.toast.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.toast = None;
            }
        }
    }

    fn reset_viewport(&mut self, width: i32, height: i32) {
        debug!("Engine viewport {}x{}", width, height);
        self.viewport = (width, height);
    }

    fn render_texture(&self) -> Option<TextureHandle> {
        self.render_texture
    }

    fn select_previous(&mut self, _hard_cut: bool) {
        self.switch_to(self.palette + PALETTES.len() - 1);
    }

    fn select_next(&mut self, _hard_cut: bool) {
        self.switch_to(self.palette + 1);
    }

    fn is_preset_locked(&self) -> bool {
        self.locked
    }

    fn set_preset_lock(&mut self, locked: bool) {
        self.locked = locked;
        self.toast = Some((
            if locked { "Preset locked" } else { "Preset unlocked" }.to_string(),
            TOAST_FRAMES,
        ));
    }

    fn is_text_input_active(&self) -> bool {
        self.text_input
    }

    fn set_text_input_active(&mut self, active: bool) {
        self.text_input = active;
        if !active {
            self.search.clear();
        }
    }

    fn set_search_text(&mut self, text: &str) {
        self.search.push_str(text);
    }

    fn delete_search_text(&mut self) {
        self.search.pop();
    }

    fn populate_preset_menu(&mut self) {
        let matches = self.matching_presets();
        debug!("Search '{}' matches {:?}", self.search, matches);
    }

    fn touch(&mut self, x: f32, y: f32, pressure: i32) {
        self.anchors.touch(x, y, pressure);
    }

    fn touch_drag(&mut self, x: f32, y: f32, pressure: i32) {
        self.anchors.drag(x, y, pressure);
    }

    fn touch_destroy(&mut self, x: f32, y: f32) {
        self.anchors.destroy_nearest(x, y);
    }

    fn touch_destroy_all(&mut self) {
        self.anchors.destroy_all();
    }

    fn key_handler(&mut self, event: KeyEvent) {
        match event.key {
            Key::Char('n') if !self.text_input => self.select_next(true),
            Key::Char('p') if !self.text_input => self.select_previous(true),
            other => trace!("Engine ignored key {:?}", other),
        }
    }

    fn set_toast_message(&mut self, message: &str) {
        self.toast = Some((message.to_string(), TOAST_FRAMES));
    }

    fn take_preset_switch(&mut self) -> Option<String> {
        self.switched.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use crate::input::{Modifiers, MouseButton};
    use crate::shell::VisualizerShell;
    use crate::testing::{MockBackend, RecordingTarget};

    fn dual() -> Vec<DisplayRect> {
        vec![PRIMARY, DisplayRect::new(1920, 0, 1920, 1080)]
    }

    #[test]
    fn empty_display_list_gets_a_primary() {
        let window = HeadlessWindow::new(Vec::new(), (640, 480));
        assert_eq!(window.display_bounds(), vec![PRIMARY]);
        assert_eq!(window.window_display_index(), Some(0));
    }

    #[test]
    fn resizing_queues_a_size_event() {
        let mut window = HeadlessWindow::new(dual(), (640, 480));
        window.set_window_size(640, 480);
        assert_eq!(window.poll_event(), None);

        window.set_window_size(3840, 1080);
        assert_eq!(window.poll_event(), Some(InputEvent::WindowSizeChanged));
    }

    #[test]
    fn present_counts_commands_per_frame() {
        let mut window = HeadlessWindow::new(dual(), (640, 480)).quit_after(2);
        window.submit(DrawCommand::Clear(Rgba::BLACK));
        window.submit(DrawCommand::Clear(Rgba::BLACK));
        window.present();
        assert_eq!(window.last_frame_commands(), 2);
        assert_eq!(window.poll_event(), None);

        window.present();
        assert_eq!(window.last_frame_commands(), 0);
        assert_eq!(window.poll_event(), Some(InputEvent::Quit));
    }

    #[test]
    fn louder_channel_draws_bigger_disc() {
        let mut engine = LevelMeterEngine::new();
        engine.reset_viewport(1000, 1000);
        let mut pcm = PcmWindow::silent();
        pcm.left.fill(0.5);

        let mut target = RecordingTarget::default();
        engine.render_frame(&pcm, &mut target);

        let hubs: Vec<f32> = target
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::TriangleFan { vertices, .. } => {
                    Some(vertices[1].position[0] - vertices[0].position[0])
                }
                _ => None,
            })
            .collect();
        assert_eq!(hubs.len(), 2);
        assert!(hubs[0].abs() > hubs[1].abs());
    }

    #[test]
    fn touch_anchors_are_drawn() {
        let mut engine = LevelMeterEngine::new();
        engine.touch(0.25, 0.75, 0);
        engine.touch(0.5, 0.5, 0);

        let mut target = RecordingTarget::default();
        engine.render_frame(&PcmWindow::silent(), &mut target);

        let fans = target
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::TriangleFan { .. }))
            .count();
        let outlines = target
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::LineLoop { .. }))
            .count();
        assert_eq!(fans, 4);
        assert_eq!(outlines, 2);
    }

    #[test]
    fn navigation_wraps_and_reports_switch() {
        let mut engine = LevelMeterEngine::new();
        engine.select_previous(true);
        assert_eq!(engine.preset_name(), "Ash");
        assert_eq!(engine.take_preset_switch().as_deref(), Some("Ash"));
        assert_eq!(engine.take_preset_switch(), None);

        engine.select_next(true);
        assert_eq!(engine.preset_name(), "Ember");
    }

    #[test]
    fn search_filters_presets() {
        let mut engine = LevelMeterEngine::new();
        engine.set_text_input_active(true);
        engine.set_search_text("m");
        assert_eq!(engine.matching_presets(), vec!["Ember", "Moss"]);

        engine.set_search_text("o");
        assert_eq!(engine.matching_presets(), vec!["Moss"]);
        engine.delete_search_text();
        assert_eq!(engine.search_text(), "m");

        engine.set_text_input_active(false);
        assert_eq!(engine.search_text(), "");
    }

    #[test]
    fn toast_expires() {
        let mut engine = LevelMeterEngine::new();
        engine.set_toast_message("Device 0 selected");
        let mut target = RecordingTarget::default();
        for _ in 0..TOAST_FRAMES - 1 {
            engine.render_frame(&PcmWindow::silent(), &mut target);
        }
        assert_eq!(engine.toast(), Some("Device 0 selected"));
        engine.render_frame(&PcmWindow::silent(), &mut target);
        assert_eq!(engine.toast(), None);
    }

    #[test]
    fn headless_shell_runs_until_quit() {
        let window = HeadlessWindow::new(dual(), (1280, 720)).quit_after(3);
        let mut config = ShellConfig::default();
        config.audio.fake_audio = true;
        let mut shell = VisualizerShell::new(
            LevelMeterEngine::new(),
            window,
            Box::new(MockBackend::with_devices(1)),
            &config,
        );
        shell.init().unwrap();
        shell.run(std::time::Duration::ZERO, None).unwrap();

        assert_eq!(shell.window().presented(), 3);
        assert!(shell.window().last_frame_commands() > 0);
        assert_eq!(shell.pcm().sequence(), 3);
    }

    fn headless_shell() -> VisualizerShell<LevelMeterEngine, HeadlessWindow> {
        let mut shell = VisualizerShell::new(
            LevelMeterEngine::new(),
            HeadlessWindow::new(dual(), (1280, 720)),
            Box::new(MockBackend::with_devices(1)),
            &ShellConfig::default(),
        );
        shell.init().unwrap();
        shell
    }

    #[test]
    fn stretch_resize_reaches_the_engine_through_events() {
        let mut shell = headless_shell();
        shell.window_mut().push_event(InputEvent::KeyDown {
            key: Key::Char('s'),
            modifiers: Modifiers::LGUI,
        });
        shell.poll_events().unwrap();

        assert!(shell.layout().is_stretched());
        assert_eq!(shell.window().size(), (3840, 1080));
        assert_eq!(shell.viewport(), (3840, 1080));
        assert_eq!(shell.engine().viewport, (3840, 1080));
    }

    #[test]
    fn wheel_switches_preset_and_retitles_window() {
        let mut shell = headless_shell();
        shell.window_mut().push_event(InputEvent::MouseWheel { y: -1 });
        assert!(shell.tick().unwrap());

        assert_eq!(shell.engine().preset_name(), "Tide");
        assert_eq!(shell.window().title(), "vizshell ➫ Tide");
    }

    #[test]
    fn clicks_place_and_clear_anchors() {
        let mut shell = headless_shell();
        let window = shell.window_mut();
        window.push_event(InputEvent::MouseButtonDown {
            button: MouseButton::Primary,
            x: 320,
            y: 180,
        });
        window.push_event(InputEvent::MouseButtonUp {
            button: MouseButton::Primary,
            x: 320,
            y: 180,
        });
        shell.poll_events().unwrap();
        assert_eq!(shell.engine().anchors().len(), 1);

        shell.window_mut().push_event(InputEvent::MouseButtonUp {
            button: MouseButton::Secondary,
            x: 330,
            y: 190,
        });
        shell.poll_events().unwrap();
        assert!(shell.engine().anchors().is_empty());
    }
}
