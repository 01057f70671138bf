//! Collaborators the shell drives but does not implement

use crate::audio::PcmWindow;
use crate::input::KeyEvent;
use crate::render::{DrawTarget, TextureHandle};

/// Resolves texture identifiers to handles owned elsewhere
pub trait TextureManager {
    /// Look up a loaded texture by URL or identifier
    fn lookup(&self, url: &str) -> Option<TextureHandle>;

    /// The engine's own render texture, if it has one
    fn main_texture(&self) -> Option<TextureHandle> {
        None
    }
}

/// The visual engine producing each frame
///
/// Preset selection, search and touch waveforms live behind this trait.
pub trait RenderEngine {
    /// Draw one frame from the latest PCM window
    fn render_frame(&mut self, pcm: &PcmWindow, target: &mut dyn DrawTarget);

    /// Output size changed
    fn reset_viewport(&mut self, width: i32, height: i32);

    /// Texture holding the last frame when rendering off-screen
    fn render_texture(&self) -> Option<TextureHandle> {
        None
    }

    fn select_previous(&mut self, hard_cut: bool);

    fn select_next(&mut self, hard_cut: bool);

    fn is_preset_locked(&self) -> bool;

    fn set_preset_lock(&mut self, locked: bool);

    /// Whether the preset search box is taking text
    fn is_text_input_active(&self) -> bool;

    fn set_text_input_active(&mut self, active: bool);

    fn set_search_text(&mut self, text: &str);

    fn delete_search_text(&mut self);

    fn populate_preset_menu(&mut self);

    /// Add a touch waveform at normalized coordinates (origin bottom-left)
    fn touch(&mut self, x: f32, y: f32, pressure: i32);

    fn touch_drag(&mut self, x: f32, y: f32, pressure: i32);

    fn touch_destroy(&mut self, x: f32, y: f32);

    fn touch_destroy_all(&mut self);

    /// Keys the shell does not handle itself
    fn key_handler(&mut self, event: KeyEvent);

    /// Show a transient message over the visuals
    fn set_toast_message(&mut self, message: &str);

    /// Name of the preset switched to since the last call
    fn take_preset_switch(&mut self) -> Option<String> {
        None
    }
}
