//! Filled polygon with gradient, optional texture and outline

use crate::render::{BlendMode, DrawCommand, Point, RenderContext, Renderable, Rgba, Vertex};
use std::f32::consts::{FRAC_PI_4, TAU};

const MIN_SIDES: u32 = 3;
const MAX_SIDES: u32 = 100;

/// Scales the nominal radius so a square just touches the screen edge
const RADIUS_SCALE: f32 = 0.707 * 0.707 * 0.707 * 1.04;

/// Regular polygon (or near-circle with many sides)
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub enabled: bool,
    /// Number of sides, clamped to 3..=100 when drawn
    pub sides: u32,
    /// Center in normalized coordinates, y grows downwards
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Rotation in radians
    pub ang: f32,
    pub additive: bool,
    pub thick_outline: bool,
    pub textured: bool,
    /// Texture looked up through the texture manager; the main render
    /// texture is used when unset
    pub image_url: Option<String>,
    pub tex_zoom: f32,
    pub tex_ang: f32,
    /// Fill color at the center
    pub color: Rgba,
    /// Fill color at the rim
    pub color2: Rgba,
    pub border: Rgba,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            enabled: true,
            sides: 4,
            x: 0.5,
            y: 0.5,
            radius: 0.1,
            ang: 0.0,
            additive: false,
            thick_outline: false,
            textured: false,
            image_url: None,
            tex_zoom: 1.0,
            tex_ang: 0.0,
            color: Rgba::new(1.0, 1.0, 1.0, 1.0),
            color2: Rgba::new(0.0, 0.0, 0.0, 0.0),
            border: Rgba::new(1.0, 1.0, 1.0, 0.0),
        }
    }
}

impl Shape {
    fn clamped_sides(&self) -> u32 {
        self.sides.clamp(MIN_SIDES, MAX_SIDES)
    }

    /// Rim point `i` of `sides`, in screen space with y flipped up
    fn rim_point(&self, i: u32, sides: u32, aspect: f32) -> Point {
        let radius = self.radius * RADIUS_SCALE;
        let t = i as f32 / sides as f32;
        let theta = t * TAU + self.ang + FRAC_PI_4;
        [
            radius * theta.cos() * aspect + self.x,
            radius * theta.sin() + (1.0 - self.y),
        ]
    }

    fn rim_uv(&self, i: u32, sides: u32, aspect: f32) -> Point {
        let t = i as f32 / sides as f32;
        let theta = t * TAU + self.tex_ang + FRAC_PI_4;
        let zoom = if self.tex_zoom == 0.0 { 1.0 } else { self.tex_zoom };
        [
            0.5 + 0.5 * theta.cos() * aspect / zoom,
            0.5 + 0.5 * theta.sin() / zoom,
        ]
    }
}

impl Renderable for Shape {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn draw(&self, ctx: &mut RenderContext<'_>) {
        if self.radius <= 0.0 {
            return;
        }

        let sides = self.clamped_sides();
        let aspect = if ctx.aspect_correct {
            ctx.aspect_ratio
        } else {
            1.0
        };

        let texture = if self.textured {
            match self.image_url.as_deref() {
                Some(url) => ctx.textures.lookup(url),
                None => ctx.textures.main_texture(),
            }
        } else {
            None
        };
        // A custom image keeps its own proportions
        let uv_aspect = if texture.is_some() && self.image_url.is_some() {
            1.0
        } else {
            aspect
        };

        let fill_visible = !(self.color.is_transparent() && self.color2.is_transparent());
        if fill_visible {
            let center = Vertex {
                position: [self.x, 1.0 - self.y],
                color: self.color,
                uv: texture.map(|_| [0.5, 0.5]),
            };
            let mut vertices = Vec::with_capacity(sides as usize + 2);
            vertices.push(center);
            for i in 0..sides {
                vertices.push(Vertex {
                    position: self.rim_point(i, sides, aspect),
                    color: self.color2,
                    uv: texture.map(|_| self.rim_uv(i, sides, uv_aspect)),
                });
            }
            // close the fan
            let first = vertices[1];
            vertices.push(first);

            ctx.submit(DrawCommand::TriangleFan {
                vertices,
                blend: if self.additive {
                    BlendMode::Additive
                } else {
                    BlendMode::Alpha
                },
                texture,
            });
        }

        if !self.border.is_transparent() {
            let points = (0..sides)
                .map(|i| self.rim_point(i, sides, aspect))
                .collect();
            let width = ctx.line_width(self.thick_outline);
            ctx.submit(DrawCommand::LineLoop {
                points,
                color: self.border,
                width,
            });
        }
    }
}
