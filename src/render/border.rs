//! Screen-edge frame overlay

use crate::render::{DrawCommand, Point, RenderContext, Renderable, Rgba};

/// Two concentric rectangular frames hugging the screen edge
#[derive(Debug, Clone, PartialEq)]
pub struct Border {
    pub enabled: bool,
    /// Thickness of the outer frame; half of it is drawn on each axis
    pub outer_size: f32,
    pub outer: Rgba,
    /// Thickness of the inner frame, drawn just inside the outer one
    pub inner_size: f32,
    pub inner: Rgba,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            enabled: true,
            outer_size: 0.02,
            outer: Rgba::new(0.0, 0.0, 0.0, 1.0),
            inner_size: 0.01,
            inner: Rgba::new(0.25, 0.25, 0.25, 1.0),
        }
    }
}

/// Four strips covering the ring between insets `from` and `to`
fn frame_strips(from: f32, to: f32) -> [[Point; 4]; 4] {
    let far_from = 1.0 - from;
    let far_to = 1.0 - to;
    [
        // left, full height
        [[from, from], [from, far_from], [to, from], [to, far_from]],
        // top, between the side strips
        [[to, from], [to, to], [far_to, from], [far_to, to]],
        // right, full height
        [[far_to, from], [far_to, far_from], [far_from, from], [far_from, far_from]],
        // bottom
        [[to, far_from], [to, far_to], [far_to, far_from], [far_to, far_to]],
    ]
}

impl Border {
    fn emit_frame(ctx: &mut RenderContext<'_>, from: f32, to: f32, color: Rgba) {
        for strip in frame_strips(from, to) {
            ctx.submit(DrawCommand::TriangleStrip {
                points: strip.to_vec(),
                color,
            });
        }
    }
}

impl Renderable for Border {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn draw(&self, ctx: &mut RenderContext<'_>) {
        let outer = self.outer_size * 0.5;
        let inner = self.inner_size * 0.5;

        if outer > 0.0 && !self.outer.is_transparent() {
            Self::emit_frame(ctx, 0.0, outer, self.outer);
        }
        if inner > 0.0 && !self.inner.is_transparent() {
            Self::emit_frame(ctx, outer, outer + inner, self.inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NoTextures, RecordingTarget};
    use approx::assert_abs_diff_eq;

    fn draw(border: &Border) -> Vec<DrawCommand> {
        let mut target = RecordingTarget::default();
        let mut ctx = RenderContext {
            target: &mut target,
            textures: &NoTextures,
            texsize: 512,
            aspect_ratio: 1.0,
            aspect_correct: false,
        };
        border.draw(&mut ctx);
        target.commands
    }

    #[test]
    fn both_frames_emit_four_strips_each() {
        let commands = draw(&Border::default());
        assert_eq!(commands.len(), 8);
        assert!(commands
            .iter()
            .all(|c| matches!(c, DrawCommand::TriangleStrip { points, .. } if points.len() == 4)));
    }

    #[test]
    fn inner_frame_starts_where_outer_ends() {
        let border = Border {
            outer_size: 0.2,
            inner_size: 0.1,
            ..Border::default()
        };
        let commands = draw(&border);

        let DrawCommand::TriangleStrip { points: outer_left, .. } = &commands[0] else {
            panic!("expected strip");
        };
        let DrawCommand::TriangleStrip { points: inner_left, color } = &commands[4] else {
            panic!("expected strip");
        };

        assert_abs_diff_eq!(outer_left[0][0], 0.0);
        assert_abs_diff_eq!(outer_left[2][0], 0.1);
        assert_abs_diff_eq!(inner_left[0][0], 0.1);
        assert_abs_diff_eq!(inner_left[2][0], 0.15);
        assert_eq!(*color, border.inner);
    }

    #[test]
    fn transparent_frame_is_skipped() {
        let border = Border {
            outer: Rgba::new(1.0, 1.0, 1.0, 0.0),
            ..Border::default()
        };
        assert_eq!(draw(&border).len(), 4);
    }

    #[test]
    fn zero_sizes_draw_nothing() {
        let border = Border {
            outer_size: 0.0,
            inner_size: 0.0,
            ..Border::default()
        };
        assert!(draw(&border).is_empty());
    }
}
