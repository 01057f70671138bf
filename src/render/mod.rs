//! Renderable items and the draw contract shared with the render engine
//!
//! Items never talk to a graphics API directly. They emit [`DrawCommand`]s
//! into a [`DrawTarget`], which the window platform turns into real draw
//! calls.

mod border;
mod engine;
mod motion;
mod shape;
mod text;

pub use border::Border;
pub use engine::{RenderEngine, TextureManager};
pub use motion::MotionVectors;
pub use shape::Shape;
pub use text::Text;

use serde::{Deserialize, Serialize};

/// RGBA color, channels in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

/// Blending applied to a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// src_alpha, one_minus_src_alpha
    Alpha,
    /// src_alpha, one
    Additive,
}

/// Non-owning handle to a texture held by the texture manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// 2D point in normalized screen space, origin bottom-left
pub type Point = [f32; 2];

/// Vertex of a filled primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point,
    pub color: Rgba,
    /// Texture coordinate, present when the fill is textured
    pub uv: Option<Point>,
}

/// A single graphics operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    Viewport {
        width: i32,
        height: i32,
    },
    /// Filled polygon, first vertex is the hub
    TriangleFan {
        vertices: Vec<Vertex>,
        blend: BlendMode,
        texture: Option<TextureHandle>,
    },
    TriangleStrip {
        points: Vec<Point>,
        color: Rgba,
    },
    LineLoop {
        points: Vec<Point>,
        color: Rgba,
        width: f32,
    },
    Lines {
        segments: Vec<[Point; 2]>,
        color: Rgba,
        width: f32,
    },
    /// Textured quad in 3D with a column-major model-view-projection
    TexturedQuad {
        texture: TextureHandle,
        corners: [[f32; 3]; 4],
        transform: [f32; 16],
        depth_test: bool,
    },
}

/// Sink for draw commands
pub trait DrawTarget {
    fn submit(&mut self, command: DrawCommand);
}

/// Per-frame state handed to items while drawing
pub struct RenderContext<'a> {
    pub target: &'a mut dyn DrawTarget,
    pub textures: &'a dyn TextureManager,
    /// Side of the engine's square render texture in pixels
    pub texsize: u32,
    /// Width / height of the output
    pub aspect_ratio: f32,
    pub aspect_correct: bool,
}

impl<'a> RenderContext<'a> {
    pub fn submit(&mut self, command: DrawCommand) {
        self.target.submit(command);
    }

    /// Line width for the current texture size
    pub fn line_width(&self, thick: bool) -> f32 {
        let base = if self.texsize < 512 {
            1.0
        } else {
            self.texsize as f32 / 512.0
        };
        if thick && self.texsize >= 512 {
            base * 2.0
        } else {
            base
        }
    }
}

/// Uniform draw contract for every visual primitive
pub trait Renderable: std::fmt::Debug {
    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Emit this item's draw commands
    fn draw(&self, ctx: &mut RenderContext<'_>);
}

/// Ordered list of items making up one frame
#[derive(Debug, Default)]
pub struct FrameComposition {
    items: Vec<Box<dyn Renderable>>,
}

impl FrameComposition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: impl Renderable + 'static) -> usize {
        self.items.push(Box::new(item));
        self.items.len() - 1
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn Renderable + 'static)> {
        self.items.get_mut(index).map(|item| item.as_mut())
    }

    /// Draw enabled items in list order; returns how many were drawn
    pub fn draw(&self, ctx: &mut RenderContext<'_>) -> usize {
        let mut drawn = 0;
        for item in self.items.iter().filter(|item| item.is_enabled()) {
            item.draw(ctx);
            drawn += 1;
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NoTextures, RecordingTarget};

    fn draw_frame(composition: &FrameComposition, target: &mut RecordingTarget) -> usize {
        let textures = NoTextures;
        let mut ctx = RenderContext {
            target,
            textures: &textures,
            texsize: 512,
            aspect_ratio: 1.0,
            aspect_correct: false,
        };
        composition.draw(&mut ctx)
    }

    #[test]
    fn disabled_items_emit_nothing() {
        let mut composition = FrameComposition::new();
        let mut shape = Shape::default();
        shape.enabled = false;
        composition.push(shape);
        let mut border = Border::default();
        border.enabled = false;
        composition.push(border);

        let mut target = RecordingTarget::default();
        assert_eq!(draw_frame(&composition, &mut target), 0);
        assert!(target.commands.is_empty());
    }

    #[test]
    fn enable_toggle_draws_only_middle_frame() {
        let mut composition = FrameComposition::new();
        let mut shape = Shape::default();
        shape.enabled = false;
        let index = composition.push(shape);

        let mut emitted = Vec::new();
        for enabled in [false, true, false] {
            if let Some(item) = composition.get_mut(index) {
                item.set_enabled(enabled);
            }
            let mut target = RecordingTarget::default();
            draw_frame(&composition, &mut target);
            emitted.push(target.commands.len());
        }

        assert_eq!(emitted[0], 0);
        assert!(emitted[1] > 0);
        assert_eq!(emitted[2], 0);
    }

    #[test]
    fn items_draw_in_list_order() {
        let mut composition = FrameComposition::new();
        composition.push(Border::default());
        composition.push(Shape::default());

        let mut target = RecordingTarget::default();
        assert_eq!(draw_frame(&composition, &mut target), 2);

        let first_fan = target
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::TriangleFan { .. }));
        let last_strip = target
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::TriangleStrip { .. }));
        assert!(last_strip < first_fan);
    }

    #[test]
    fn line_width_scales_with_texture_size() {
        let textures = NoTextures;
        let mut target = RecordingTarget::default();
        let mut ctx = RenderContext {
            target: &mut target,
            textures: &textures,
            texsize: 1024,
            aspect_ratio: 1.0,
            aspect_correct: false,
        };
        assert_eq!(ctx.line_width(false), 2.0);
        assert_eq!(ctx.line_width(true), 4.0);
        ctx.texsize = 256;
        assert_eq!(ctx.line_width(true), 1.0);
    }
}
