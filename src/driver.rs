//! Frame driver - one rendering tick

use crate::audio::{PcmBuffer, PcmWindow};
use crate::render::{DrawCommand, DrawTarget, RenderEngine, Rgba};
use glam::{Mat4, Vec3};
use tracing::{trace, warn};

/// Corners of the composite quad, counter-clockwise from bottom-left
const QUAD_CORNERS: [[f32; 3]; 4] = [
    [-0.8, -0.8, 0.0],
    [0.8, -0.8, 0.0],
    [0.8, 0.8, 0.0],
    [-0.8, 0.8, 0.0],
];

/// Offset of the composite quad at frame `f`
fn quad_offset(f: f32) -> Vec3 {
    Vec3::new(
        (f * 0.023).cos(),
        (f * 0.017).cos(),
        -5.0 + 2.0 * (f * 0.022).sin(),
    )
}

fn projection() -> Mat4 {
    Mat4::frustum_rh_gl(-1.0, 1.0, -1.0, 1.0, 2.0, 10.0)
}

/// Column-major model-view-projection for the composite quad at frame `frame`
pub fn composite_transform(frame: u64) -> [f32; 16] {
    let f = frame as f32;
    let axis = Vec3::new((f * 0.0017).sin(), (f * 0.0032).sin(), 1.0).normalize();
    let degrees = (f * 0.0043).sin() * 360.0;

    let model =
        Mat4::from_translation(quad_offset(f)) * Mat4::from_axis_angle(axis, degrees.to_radians());
    (projection() * model).to_cols_array()
}

/// Drives the render engine once per display refresh
#[derive(Debug)]
pub struct FrameDriver {
    render_to_texture: bool,
    frame: u64,
    pcm: PcmWindow,
    missing_texture_logged: bool,
}

impl FrameDriver {
    pub fn new(render_to_texture: bool) -> Self {
        Self {
            render_to_texture,
            frame: 0,
            pcm: PcmWindow::silent(),
            missing_texture_logged: false,
        }
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn render_to_texture(&self) -> bool {
        self.render_to_texture
    }

    /// Clear, render from the latest PCM window, then composite if enabled
    ///
    /// Presenting is left to the caller.
    pub fn render_frame(
        &mut self,
        engine: &mut dyn RenderEngine,
        pcm: &PcmBuffer,
        target: &mut dyn DrawTarget,
        viewport: (i32, i32),
    ) {
        target.submit(DrawCommand::Clear(Rgba::BLACK));

        pcm.read_into(&mut self.pcm);
        engine.render_frame(&self.pcm, target);

        if self.render_to_texture {
            self.composite(engine, target, viewport);
        }

        trace!("Rendered frame {} (pcm seq {})", self.frame, self.pcm.sequence);
        self.frame += 1;
    }

    fn composite(
        &mut self,
        engine: &dyn RenderEngine,
        target: &mut dyn DrawTarget,
        (width, height): (i32, i32),
    ) {
        let Some(texture) = engine.render_texture() else {
            if !self.missing_texture_logged {
                warn!("Render to texture enabled but the engine has no render texture");
                self.missing_texture_logged = true;
            }
            return;
        };

        target.submit(DrawCommand::Viewport { width, height });
        target.submit(DrawCommand::Clear(Rgba::BLACK));
        target.submit(DrawCommand::TexturedQuad {
            texture,
            corners: QUAD_CORNERS,
            transform: composite_transform(self.frame),
            depth_test: true,
        });
    }
}
