//! Grid of motion-vector line segments

use crate::render::{DrawCommand, Point, RenderContext, Renderable, Rgba};

/// Above this many rows plus columns the grid is considered runaway
const GRID_LIMIT: f32 = 600.0;

/// Evenly spaced short segments, one per grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct MotionVectors {
    pub enabled: bool,
    /// Columns in the grid
    pub x_num: f32,
    /// Rows in the grid
    pub y_num: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    /// Segment length in texture pixels
    pub length: f32,
    pub color: Rgba,
}

impl Default for MotionVectors {
    fn default() -> Self {
        Self {
            enabled: true,
            x_num: 12.0,
            y_num: 9.0,
            x_offset: 0.02,
            y_offset: 0.02,
            length: 8.0,
            color: Rgba::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

impl MotionVectors {
    fn segments(&self, texsize: u32) -> Vec<[Point; 2]> {
        if self.x_num + self.y_num >= GRID_LIMIT || self.x_num < 1.0 || self.y_num < 1.0 {
            return Vec::new();
        }

        let columns = self.x_num as usize;
        let rows = self.y_num as usize;
        let step_x = 1.0 / self.x_num;
        let step_y = 1.0 / self.y_num;
        let reach = self.length / texsize.max(1) as f32;

        let mut segments = Vec::with_capacity(columns * rows);
        for column in 0..columns {
            for row in 0..rows {
                let x = self.x_offset + column as f32 * step_x;
                let y = self.y_offset + row as f32 * step_y;
                segments.push([[x, y], [x + reach, y]]);
            }
        }
        segments
    }
}

impl Renderable for MotionVectors {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn draw(&self, ctx: &mut RenderContext<'_>) {
        if self.color.is_transparent() {
            return;
        }
        let segments = self.segments(ctx.texsize);
        if segments.is_empty() {
            return;
        }
        let width = ctx.line_width(false);
        ctx.submit(DrawCommand::Lines {
            segments,
            color: self.color,
            width,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn grid_has_one_segment_per_cell() {
        let vectors = MotionVectors {
            x_num: 4.0,
            y_num: 3.0,
            x_offset: 0.0,
            y_offset: 0.0,
            length: 64.0,
            ..MotionVectors::default()
        };
        let segments = vectors.segments(512);
        assert_eq!(segments.len(), 12);

        let [start, end] = segments[4];
        // column 1, row 1
        assert_abs_diff_eq!(start[0], 0.25);
        assert_abs_diff_eq!(start[1], 1.0 / 3.0);
        assert_abs_diff_eq!(end[0] - start[0], 0.125);
        assert_abs_diff_eq!(end[1], start[1]);
    }

    #[test]
    fn runaway_grid_is_suppressed() {
        let vectors = MotionVectors {
            x_num: 400.0,
            y_num: 200.0,
            ..MotionVectors::default()
        };
        assert!(vectors.segments(512).is_empty());
    }

    #[test]
    fn empty_axis_is_suppressed() {
        let vectors = MotionVectors {
            x_num: 0.0,
            ..MotionVectors::default()
        };
        assert!(vectors.segments(512).is_empty());
    }
}
