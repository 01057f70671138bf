//! Test doubles shared by the unit tests

use crate::audio::{
    AudioFormat, CaptureBackend, CaptureStream, DeviceDescriptor, IngestTarget, PcmWindow,
};
use crate::display::{DisplayRect, WindowPlatform};
use crate::error::{Result, ShellError};
use crate::input::{InputEvent, KeyEvent};
use crate::render::{DrawCommand, DrawTarget, RenderEngine, TextureHandle, TextureManager};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Capture backend recording every stream operation as "op:Device N"
pub struct MockBackend {
    pub names: Vec<String>,
    pub loopback: bool,
    pub loopback_fails: bool,
    /// Device indices whose open fails
    pub failing: Vec<usize>,
    /// Channel count reported by opened streams
    pub channels: u16,
    pub log: CallLog,
    pub targets: Arc<Mutex<Vec<IngestTarget>>>,
}

impl MockBackend {
    pub fn with_devices(count: usize) -> Self {
        Self {
            names: (0..count).map(|i| format!("Device {}", i)).collect(),
            loopback: false,
            loopback_fails: false,
            failing: Vec::new(),
            channels: 2,
            log: Arc::default(),
            targets: Arc::default(),
        }
    }
}

impl CaptureBackend for MockBackend {
    fn capture_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(self
            .names
            .iter()
            .enumerate()
            .map(|(index, name)| DeviceDescriptor {
                index,
                name: name.clone(),
                is_default: index == 0,
            })
            .collect())
    }

    fn open_capture(
        &mut self,
        device: &DeviceDescriptor,
        desired: &AudioFormat,
        target: IngestTarget,
    ) -> Result<Box<dyn CaptureStream>> {
        if self.failing.contains(&device.index) {
            return Err(ShellError::device_open_failed(&device.name, "mock failure"));
        }
        self.log.lock().push(format!("open:{}", device.name));
        self.targets.lock().push(target);
        Ok(Box::new(MockStream {
            name: device.name.clone(),
            format: AudioFormat {
                channels: self.channels,
                ..desired.clone()
            },
            running: false,
            log: self.log.clone(),
        }))
    }

    fn supports_loopback(&self) -> bool {
        self.loopback
    }

    fn open_loopback(&mut self, target: IngestTarget) -> Result<Box<dyn CaptureStream>> {
        if self.loopback_fails {
            return Err(ShellError::LoopbackUnavailable("mock failure".to_string()));
        }
        self.log.lock().push("open:Loopback".to_string());
        self.targets.lock().push(target);
        Ok(Box::new(MockStream {
            name: "Loopback".to_string(),
            format: AudioFormat::preferred(),
            running: false,
            log: self.log.clone(),
        }))
    }
}

pub struct MockStream {
    name: String,
    format: AudioFormat,
    running: bool,
    log: CallLog,
}

impl CaptureStream for MockStream {
    fn format(&self) -> &AudioFormat {
        &self.format
    }

    fn resume(&mut self) -> Result<()> {
        self.log.lock().push(format!("resume:{}", self.name));
        self.running = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if self.running {
            self.log.lock().push(format!("pause:{}", self.name));
            self.running = false;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().push(format!("close:{}", self.name));
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Draw target keeping every command
#[derive(Debug, Default)]
pub struct RecordingTarget {
    pub commands: Vec<DrawCommand>,
}

impl DrawTarget for RecordingTarget {
    fn submit(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

pub struct NoTextures;

impl TextureManager for NoTextures {
    fn lookup(&self, _url: &str) -> Option<TextureHandle> {
        None
    }
}

pub struct StaticTextures {
    handles: HashMap<String, TextureHandle>,
}

impl StaticTextures {
    pub fn new(entries: &[(&str, u32)]) -> Self {
        Self {
            handles: entries
                .iter()
                .map(|(url, id)| (url.to_string(), TextureHandle(*id)))
                .collect(),
        }
    }
}

impl TextureManager for StaticTextures {
    fn lookup(&self, url: &str) -> Option<TextureHandle> {
        self.handles.get(url).copied()
    }
}

/// Window double with scripted displays and events
pub struct FakeWindow {
    pub displays: Vec<DisplayRect>,
    pub position: (i32, i32),
    pub size: (i32, i32),
    pub fullscreen: bool,
    pub cursor_visible: bool,
    pub text_input: bool,
    pub title: String,
    /// Mutating calls, by name
    pub calls: Vec<String>,
    pub events: VecDeque<InputEvent>,
    pub commands: Vec<DrawCommand>,
    pub presented: usize,
}

impl FakeWindow {
    pub fn new(displays: Vec<DisplayRect>) -> Self {
        Self {
            displays,
            position: (0, 0),
            size: (800, 600),
            fullscreen: false,
            cursor_visible: true,
            text_input: false,
            title: String::new(),
            calls: Vec::new(),
            events: VecDeque::new(),
            commands: Vec::new(),
            presented: 0,
        }
    }
}

impl DrawTarget for FakeWindow {
    fn submit(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl WindowPlatform for FakeWindow {
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
        self.calls.push("position".to_string());
        self.position = (x, y);
    }

    fn set_window_size(&mut self, width: i32, height: i32) {
        self.calls.push("size".to_string());
        self.size = (width, height);
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.calls.push("fullscreen".to_string());
        self.fullscreen = fullscreen;
    }

    fn show_cursor(&mut self, visible: bool) {
        self.calls.push("cursor".to_string());
        self.cursor_visible = visible;
    }

    fn drawable_size(&self) -> (i32, i32) {
        self.size
    }

    fn set_text_input(&mut self, active: bool) {
        self.text_input = active;
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn poll_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    fn present(&mut self) {
        self.presented += 1;
    }
}

/// Engine call as seen by [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    ResetViewport(i32, i32),
    SelectPrevious,
    SelectNext,
    SetPresetLock(bool),
    SetTextInput(bool),
    SetSearchText(String),
    DeleteSearchText,
    PopulateMenu,
    Touch(f32, f32),
    TouchDrag(f32, f32),
    TouchDestroy(f32, f32),
    TouchDestroyAll,
    Key(KeyEvent),
    Toast(String),
}

/// Render engine double; frames are counted, everything else is logged
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<EngineCall>,
    pub frames: usize,
    pub last_pcm: Option<PcmWindow>,
    pub preset_locked: bool,
    pub text_input_active: bool,
    pub texture: Option<TextureHandle>,
    /// Reported once through `take_preset_switch`
    pub switched: Option<String>,
}

impl RecordingEngine {
    pub fn keys(&self) -> Vec<KeyEvent> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Key(event) => Some(*event),
                _ => None,
            })
            .collect()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Toast(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl RenderEngine for RecordingEngine {
    fn render_frame(&mut self, pcm: &PcmWindow, _target: &mut dyn DrawTarget) {
        self.frames += 1;
        self.last_pcm = Some(pcm.clone());
    }

    fn reset_viewport(&mut self, width: i32, height: i32) {
        self.calls.push(EngineCall::ResetViewport(width, height));
    }

    fn render_texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    fn select_previous(&mut self, _hard_cut: bool) {
        self.calls.push(EngineCall::SelectPrevious);
    }

    fn select_next(&mut self, _hard_cut: bool) {
        self.calls.push(EngineCall::SelectNext);
    }

    fn is_preset_locked(&self) -> bool {
        self.preset_locked
    }

    fn set_preset_lock(&mut self, locked: bool) {
        self.preset_locked = locked;
        self.calls.push(EngineCall::SetPresetLock(locked));
    }

    fn is_text_input_active(&self) -> bool {
        self.text_input_active
    }

    fn set_text_input_active(&mut self, active: bool) {
        self.text_input_active = active;
        self.calls.push(EngineCall::SetTextInput(active));
    }

    fn set_search_text(&mut self, text: &str) {
        self.calls.push(EngineCall::SetSearchText(text.to_string()));
    }

    fn delete_search_text(&mut self) {
        self.calls.push(EngineCall::DeleteSearchText);
    }

    fn populate_preset_menu(&mut self) {
        self.calls.push(EngineCall::PopulateMenu);
    }

    fn touch(&mut self, x: f32, y: f32, _pressure: i32) {
        self.calls.push(EngineCall::Touch(x, y));
    }

    fn touch_drag(&mut self, x: f32, y: f32, _pressure: i32) {
        self.calls.push(EngineCall::TouchDrag(x, y));
    }

    fn touch_destroy(&mut self, x: f32, y: f32) {
        self.calls.push(EngineCall::TouchDestroy(x, y));
    }

    fn touch_destroy_all(&mut self) {
        self.calls.push(EngineCall::TouchDestroyAll);
    }

    fn key_handler(&mut self, event: KeyEvent) {
        self.calls.push(EngineCall::Key(event));
    }

    fn set_toast_message(&mut self, message: &str) {
        self.calls.push(EngineCall::Toast(message.to_string()));
    }

    fn take_preset_switch(&mut self) -> Option<String> {
        self.switched.take()
    }
}
