//! Event dispatcher - maps input events to shell commands and engine calls

use crate::display::WindowPlatform;
use crate::input::touch::TouchAnchors;
use crate::input::{InputEvent, Key, KeyEvent, Modifiers, MouseButton};
use crate::render::RenderEngine;
use tracing::{debug, trace};

/// Actions that need the shell's own state (audio, layout, run flag)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    Quit,
    ToggleAudioSource,
    ToggleStretch,
    NextMonitor,
    ToggleFullScreen,
    /// Drawable size changed; the engine viewport is already updated
    Resized { width: i32, height: i32 },
}

/// Fixed keyboard shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Quit,
    ToggleAudioSource,
    Stretch,
    NextMonitor,
    FullScreen,
    StartTextInput,
    StopTextInput,
    DeleteSearchText,
    TogglePresetLock,
}

/// Look up the shortcut bound to a key press
///
/// Letter shortcuts need the command modifier (either GUI key or left
/// control); the editing keys work without one.
pub fn shortcut(key: Key, modifiers: Modifiers) -> Option<Shortcut> {
    let command = modifiers.is_command();
    match key {
        Key::Char(c) if command => match c.to_ascii_lowercase() {
            'q' => Some(Shortcut::Quit),
            'i' => Some(Shortcut::ToggleAudioSource),
            's' => Some(Shortcut::Stretch),
            'm' => Some(Shortcut::NextMonitor),
            'f' => Some(Shortcut::FullScreen),
            _ => None,
        },
        Key::Return => Some(Shortcut::StartTextInput),
        Key::Escape => Some(Shortcut::StopTextInput),
        Key::Backspace => Some(Shortcut::DeleteSearchText),
        Key::Space => Some(Shortcut::TogglePresetLock),
        _ => None,
    }
}

/// Translates input events; holds the pointer and modifier latches
#[derive(Debug)]
pub struct EventDispatcher {
    viewport: (i32, i32),
    mouse_down: bool,
    command_latched: bool,
    anchors: TouchAnchors,
}

impl EventDispatcher {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            viewport: (width, height),
            mouse_down: false,
            command_latched: false,
            anchors: TouchAnchors::new(),
        }
    }

    /// Size used to normalize pointer coordinates
    pub fn set_viewport(&mut self, width: i32, height: i32) {
        self.viewport = (width, height);
    }

    pub fn anchors(&self) -> &TouchAnchors {
        &self.anchors
    }

    pub fn is_command_latched(&self) -> bool {
        self.command_latched
    }

    fn normalize(&self, x: i32, y: i32) -> (f32, f32) {
        TouchAnchors::normalize(x, y, self.viewport.0, self.viewport.1)
    }

    /// Handle one event
    ///
    /// Engine-level effects happen here; anything touching audio, layout
    /// or the run loop comes back as a [`ShellCommand`].
    pub fn dispatch(
        &mut self,
        event: InputEvent,
        engine: &mut dyn RenderEngine,
        window: &mut dyn WindowPlatform,
    ) -> Option<ShellCommand> {
        trace!("Input event: {:?}", event);
        match event {
            InputEvent::WindowResized | InputEvent::WindowSizeChanged => {
                let (width, height) = window.drawable_size();
                self.viewport = (width, height);
                engine.reset_viewport(width, height);
                Some(ShellCommand::Resized { width, height })
            }
            InputEvent::MouseWheel { y } => {
                if y > 0 {
                    engine.select_previous(true);
                } else if y < 0 {
                    engine.select_next(true);
                }
                None
            }
            InputEvent::KeyDown { key, modifiers } => self.key_down(key, modifiers, engine, window),
            InputEvent::MouseButtonDown { button, x, y } => {
                match button {
                    MouseButton::Primary if !self.mouse_down => {
                        let (nx, ny) = self.normalize(x, y);
                        self.anchors.touch(nx, ny, 0);
                        engine.touch(nx, ny, 0);
                        self.mouse_down = true;
                    }
                    MouseButton::Secondary => self.mouse_down = false,
                    _ => {}
                }
                None
            }
            InputEvent::MouseButtonUp { button, x, y } => {
                match button {
                    MouseButton::Primary => self.mouse_down = false,
                    MouseButton::Secondary if self.command_latched => {
                        self.anchors.destroy_all();
                        engine.touch_destroy_all();
                        self.command_latched = false;
                        debug!("Cleared all touch anchors");
                    }
                    MouseButton::Secondary => {
                        let (nx, ny) = self.normalize(x, y);
                        self.anchors.destroy_nearest(nx, ny);
                        engine.touch_destroy(nx, ny);
                    }
                    MouseButton::Middle => {}
                }
                None
            }
            InputEvent::MouseMotion { x, y } => {
                if self.mouse_down {
                    let (nx, ny) = self.normalize(x, y);
                    self.anchors.drag(nx, ny, 0);
                    engine.touch_drag(nx, ny, 0);
                }
                None
            }
            InputEvent::TextInput(text) => {
                if engine.is_text_input_active() {
                    engine.set_search_text(&text);
                    engine.populate_preset_menu();
                }
                None
            }
            InputEvent::Quit => Some(ShellCommand::Quit),
        }
    }

    fn key_down(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        engine: &mut dyn RenderEngine,
        window: &mut dyn WindowPlatform,
    ) -> Option<ShellCommand> {
        if modifiers.is_command() {
            self.command_latched = true;
        }

        match shortcut(key, modifiers) {
            Some(Shortcut::Quit) => return Some(ShellCommand::Quit),
            Some(Shortcut::ToggleAudioSource) => return Some(ShellCommand::ToggleAudioSource),
            Some(Shortcut::Stretch) => return Some(ShellCommand::ToggleStretch),
            Some(Shortcut::NextMonitor) => return Some(ShellCommand::NextMonitor),
            Some(Shortcut::FullScreen) => return Some(ShellCommand::ToggleFullScreen),
            Some(Shortcut::StartTextInput) => {
                if !engine.is_text_input_active() {
                    window.set_text_input(true);
                    engine.set_text_input_active(true);
                }
            }
            Some(Shortcut::StopTextInput) => {
                if engine.is_text_input_active() {
                    window.set_text_input(false);
                    engine.set_text_input_active(false);
                }
            }
            Some(Shortcut::DeleteSearchText) => engine.delete_search_text(),
            Some(Shortcut::TogglePresetLock) => {
                if !engine.is_text_input_active() {
                    let locked = !engine.is_preset_locked();
                    engine.set_preset_lock(locked);
                    debug!("Preset lock {}", if locked { "on" } else { "off" });
                }
            }
            None => {}
        }

        // Editing keys and unbound keys still reach the engine
        engine.key_handler(KeyEvent::translate(key, modifiers));
        None
    }
}
