//! Display geometry and the window platform seam

mod layout;

pub use layout::{DisplayLayout, WindowLayoutState};

use crate::input::InputEvent;
use crate::render::DrawTarget;
use serde::{Deserialize, Serialize};

/// Bounds of one display in desktop coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DisplayRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Rectangle covering a set of displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl UnionBounds {
    /// Union of all displays, seeded at the desktop origin
    pub fn of(displays: &[DisplayRect]) -> Self {
        displays.iter().fold(
            UnionBounds {
                min_x: 0,
                min_y: 0,
                max_x: 0,
                max_y: 0,
            },
            |acc, d| UnionBounds {
                min_x: acc.min_x.min(d.x),
                min_y: acc.min_y.min(d.y),
                max_x: acc.max_x.max(d.right()),
                max_y: acc.max_y.max(d.bottom()),
            },
        )
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }
}

/// Window system operations the shell needs
///
/// The window also owns the graphics context, so it is the draw target
/// for the frame.
pub trait WindowPlatform: DrawTarget {
    /// Bounds of every connected display, in platform order
    fn display_bounds(&self) -> Vec<DisplayRect>;

    /// Desktop resolution of the given display
    fn desktop_mode(&self, display: usize) -> Option<(i32, i32)>;

    /// Display currently containing the window
    fn window_display_index(&self) -> Option<usize>;

    fn set_window_position(&mut self, x: i32, y: i32);

    fn set_window_size(&mut self, width: i32, height: i32);

    fn set_fullscreen(&mut self, fullscreen: bool);

    fn show_cursor(&mut self, visible: bool);

    /// Size of the drawable area in pixels
    fn drawable_size(&self) -> (i32, i32);

    fn set_text_input(&mut self, active: bool);

    fn set_title(&mut self, title: &str);

    /// Next pending input event, if any
    fn poll_event(&mut self) -> Option<InputEvent>;

    /// Show the finished frame
    fn present(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_spans_side_by_side_displays() {
        let bounds = UnionBounds::of(&[
            DisplayRect::new(0, 0, 1920, 1080),
            DisplayRect::new(1920, 0, 1920, 1080),
        ]);
        assert_eq!((bounds.min_x, bounds.min_y), (0, 0));
        assert_eq!((bounds.width(), bounds.height()), (3840, 1080));
    }

    #[test]
    fn union_includes_origin_for_offset_displays() {
        let bounds = UnionBounds::of(&[DisplayRect::new(100, 50, 800, 600)]);
        assert_eq!((bounds.min_x, bounds.min_y), (0, 0));
        assert_eq!((bounds.max_x, bounds.max_y), (900, 650));
    }

    #[test]
    fn union_reaches_negative_coordinates() {
        let bounds = UnionBounds::of(&[
            DisplayRect::new(0, 0, 2560, 1440),
            DisplayRect::new(-1280, 200, 1280, 1024),
        ]);
        assert_eq!((bounds.min_x, bounds.min_y), (-1280, 0));
        assert_eq!((bounds.width(), bounds.height()), (3840, 1440));
    }

    #[test]
    fn rect_contains_is_half_open() {
        let rect = DisplayRect::new(0, 0, 1920, 1080);
        assert!(rect.contains(0, 0));
        assert!(rect.contains(1919, 1079));
        assert!(!rect.contains(1920, 0));
    }
}
