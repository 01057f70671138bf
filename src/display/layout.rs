//! Window geometry across one or more displays

use crate::display::{UnionBounds, WindowPlatform};
use tracing::{debug, info, warn};

/// Current window geometry and mode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayoutState {
    pub position: (i32, i32),
    pub size: (i32, i32),
    pub is_full_screen: bool,
    pub is_stretched: bool,
}

/// Display layout engine
///
/// Display bounds are queried from the platform on every call since
/// monitors can be plugged in or removed between frames.
#[derive(Debug)]
pub struct DisplayLayout {
    state: WindowLayoutState,
}

impl DisplayLayout {
    pub fn new(position: (i32, i32), size: (i32, i32)) -> Self {
        Self {
            state: WindowLayoutState {
                position,
                size,
                is_full_screen: false,
                is_stretched: false,
            },
        }
    }

    pub fn state(&self) -> &WindowLayoutState {
        &self.state
    }

    pub fn is_stretched(&self) -> bool {
        self.state.is_stretched
    }

    pub fn set_stretched(&mut self, stretched: bool) {
        self.state.is_stretched = stretched;
    }

    /// Record a size change reported by the window system
    pub fn observe_size(&mut self, width: i32, height: i32) {
        self.state.size = (width, height);
    }

    /// Resize the window to the primary display's desktop resolution
    ///
    /// Returns the new drawable size for the render engine's viewport.
    pub fn apply_maximize(&mut self, window: &mut dyn WindowPlatform) -> Option<(i32, i32)> {
        let Some((width, height)) = window.desktop_mode(0) else {
            warn!("Could not read the primary display mode, not maximizing");
            return None;
        };

        window.set_window_size(width, height);
        self.state.size = (width, height);
        debug!("Maximized window to {}x{}", width, height);

        Some(window.drawable_size())
    }

    /// Span the window across the bounding rectangle of all displays
    ///
    /// Returns false (and changes nothing) with fewer than two displays.
    pub fn apply_stretch(&mut self, window: &mut dyn WindowPlatform) -> bool {
        let displays = window.display_bounds();
        if displays.len() < 2 {
            debug!("Stretch needs at least two displays, found {}", displays.len());
            return false;
        }

        let bounds = UnionBounds::of(&displays);
        let size = (bounds.width(), bounds.height());

        window.set_window_position(bounds.min_x, bounds.min_y);
        window.set_window_size(size.0, size.1);
        self.state.position = (bounds.min_x, bounds.min_y);
        self.state.size = size;

        info!(
            "Stretched window across {} displays: {}x{} at ({}, {})",
            displays.len(),
            size.0,
            size.1,
            bounds.min_x,
            bounds.min_y
        );
        true
    }

    /// Move the window onto the next display and fill it
    ///
    /// Returns false (and changes nothing) with fewer than two displays.
    pub fn move_to_next_display(&mut self, window: &mut dyn WindowPlatform) -> bool {
        let displays = window.display_bounds();
        if displays.len() < 2 {
            debug!("Only {} display attached, not moving", displays.len());
            return false;
        }

        let (x, y) = self.state.position;
        let current = window
            .window_display_index()
            .or_else(|| displays.iter().position(|d| d.contains(x, y)))
            .unwrap_or(0);
        let next = (current + 1) % displays.len();
        let target = displays[next];

        window.set_window_position(target.x, target.y);
        window.set_window_size(target.width, target.height);
        self.state.position = (target.x, target.y);
        self.state.size = (target.width, target.height);

        info!("Moved window from display {} to display {}", current, next);
        true
    }

    /// Flip platform fullscreen, maximizing first
    ///
    /// The cursor is hidden while fullscreen. Returns the drawable size
    /// after maximizing, if the display mode could be read.
    pub fn toggle_full_screen(&mut self, window: &mut dyn WindowPlatform) -> Option<(i32, i32)> {
        let viewport = self.apply_maximize(window);

        self.state.is_full_screen = !self.state.is_full_screen;
        if self.state.is_full_screen {
            window.show_cursor(false);
            window.set_fullscreen(true);
        } else {
            window.set_fullscreen(false);
            window.show_cursor(true);
        }

        info!(
            "Fullscreen {}",
            if self.state.is_full_screen { "on" } else { "off" }
        );
        viewport
    }
}
