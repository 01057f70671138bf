//! Platform-neutral input events and their translation into shell actions

mod dispatcher;
mod touch;

pub use dispatcher::{shortcut, EventDispatcher, ShellCommand, Shortcut};
pub use touch::{TouchAnchor, TouchAnchors};

use bitflags::bitflags;

bitflags! {
    /// Keyboard modifier state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const LSHIFT = 0b0000_0001;
        const RSHIFT = 0b0000_0010;
        const LCTRL  = 0b0000_0100;
        const RCTRL  = 0b0000_1000;
        const LALT   = 0b0001_0000;
        const RALT   = 0b0010_0000;
        const LGUI   = 0b0100_0000;
        const RGUI   = 0b1000_0000;

        const SHIFT = Self::LSHIFT.bits() | Self::RSHIFT.bits();
        /// Either GUI key or left control
        const COMMAND = Self::LGUI.bits() | Self::RGUI.bits() | Self::LCTRL.bits();
    }
}

impl Modifiers {
    /// Whether a shortcut-enabling modifier is held
    pub fn is_command(self) -> bool {
        self.intersects(Modifiers::COMMAND)
    }

    pub fn is_shift(self) -> bool {
        self.intersects(Modifiers::SHIFT)
    }
}

/// Key identity, independent of the window system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable key, lowercase as reported by the keyboard
    Char(char),
    Return,
    Escape,
    Backspace,
    Delete,
    Space,
    Tab,
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    F(u8),
    /// Anything else, by platform keycode
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
    Middle,
}

/// Input event from the window system
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    WindowResized,
    WindowSizeChanged,
    /// Positive is away from the user
    MouseWheel { y: i32 },
    KeyDown { key: Key, modifiers: Modifiers },
    MouseButtonDown { button: MouseButton, x: i32, y: i32 },
    MouseButtonUp { button: MouseButton, x: i32, y: i32 },
    MouseMotion { x: i32, y: i32 },
    TextInput(String),
    Quit,
}

/// Key press forwarded to the render engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Translate a raw key press; letters are uppercased while shift is held
    pub fn translate(key: Key, modifiers: Modifiers) -> Self {
        let key = match key {
            Key::Char(c) if modifiers.is_shift() => Key::Char(c.to_ascii_uppercase()),
            other => other,
        };
        Self { key, modifiers }
    }
}
