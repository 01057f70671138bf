//! Text overlay item

use crate::render::{RenderContext, Renderable};

/// Placeholder text item; takes part in composition but draws nothing yet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Text {
    pub enabled: bool,
}

impl Renderable for Text {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn draw(&self, _ctx: &mut RenderContext<'_>) {}
}
