//! Frame composition
//!
//! Layer order, back to front:
//! 1. Background image, cover-scaled to the viewport
//! 2. Fog surface (source-over)
//! 3. Brush trail glows
//! 4. Particles
//! 5. Cursor glow and ring (only while wiping)
//! 6. Completion flash
//!
//! Until the session is ready the frame is solid fog so an unpainted surface
//! never flashes the picture.

use glam::Vec2;

use super::framebuffer::FrameBuffer;
use crate::error::Error;
use crate::sim::particles::ParticleKind;
use crate::sim::state::SessionState;
use crate::sim::surface::Rgba;

/// Decoded background picture
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Background {
    /// Wrap tightly packed RGBA8 bytes
    pub fn from_rgba(width: usize, height: usize, bytes: &[u8]) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::Frame(format!("background is {width}x{height}")));
        }
        let expected = width * height * 4;
        if bytes.len() != expected {
            return Err(Error::Frame(format!(
                "background has {} bytes, expected {expected} for {width}x{height}",
                bytes.len()
            )));
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| Rgba::new(c[0], c[1], c[2], 255))
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Flat color, used when no picture is supplied
    pub fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixels: vec![Rgba::new(rgb[0], rgb[1], rgb[2], 255); width.max(1) * height.max(1)],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Paint into `out` scaled to cover it, cropping the overflow evenly
    pub fn cover_into(&self, out: &mut FrameBuffer) {
        if out.width == 0 || out.height == 0 {
            return;
        }
        let scale = (out.width as f32 / self.width as f32).max(out.height as f32 / self.height as f32);
        let offset = Vec2::new(
            (out.width as f32 - self.width as f32 * scale) / 2.0,
            (out.height as f32 - self.height as f32 * scale) / 2.0,
        );
        let max_x = self.width as i64 - 1;
        let max_y = self.height as i64 - 1;
        for y in 0..out.height {
            let sy = (((y as f32 + 0.5 - offset.y) / scale) as i64).clamp(0, max_y) as usize;
            let src_row = sy * self.width;
            let dst_row = y * out.width;
            for x in 0..out.width {
                let sx = (((x as f32 + 0.5 - offset.x) / scale) as i64).clamp(0, max_x) as usize;
                out.pixels[dst_row + x] = self.pixels[src_row + sx];
            }
        }
    }
}

/// Builds frames from session state. Caches the scaled background.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    backdrop: Option<FrameBuffer>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached backdrop (new picture or new viewport)
    pub fn invalidate(&mut self) {
        self.backdrop = None;
    }

    /// Render one frame of `state` into `out`, resizing it to the viewport
    pub fn render(&mut self, state: &SessionState, background: Option<&Background>, out: &mut FrameBuffer) {
        let (width, height) = state.viewport();
        out.resize(width, height);

        let fog = state.surface.style();
        if !state.is_ready() {
            out.fill(Rgba::new(fog.tint[0], fog.tint[1], fog.tint[2], 255));
            return;
        }

        self.draw_backdrop(background, out);
        draw_fog(state, out);
        draw_trail(state, out);
        draw_particles(state, out);
        if state.interacting {
            if let Some(cursor) = state.cursor {
                draw_cursor(out, cursor, state.brush_size);
            }
        }
        if state.completion_flash > 0.0 {
            draw_flash(out, state.completion_flash);
        }
    }

    fn draw_backdrop(&mut self, background: Option<&Background>, out: &mut FrameBuffer) {
        let stale = self
            .backdrop
            .as_ref()
            .is_none_or(|b| b.width != out.width || b.height != out.height);
        if stale {
            let mut backdrop = FrameBuffer::new(out.width, out.height);
            match background {
                Some(bg) => bg.cover_into(&mut backdrop),
                None => backdrop.fill(Rgba::new(40, 44, 52, 255)),
            }
            log::debug!("Backdrop rebuilt at {}x{}", out.width, out.height);
            self.backdrop = Some(backdrop);
        }
        if let Some(backdrop) = &self.backdrop {
            out.pixels.copy_from_slice(&backdrop.pixels);
        }
    }
}

fn draw_fog(state: &SessionState, out: &mut FrameBuffer) {
    for (dst, fog) in out.pixels.iter_mut().zip(state.surface.pixels()) {
        if fog.a > 0 {
            dst.blend_over([fog.r, fog.g, fog.b], fog.a as f32 / 255.0);
        }
    }
}

fn draw_trail(state: &SessionState, out: &mut FrameBuffer) {
    for t in state.particles.trail() {
        out.radial_gradient(
            t.pos,
            t.size,
            &[
                (0.0, [255, 255, 255], t.age * 0.15),
                (0.5, [200, 230, 255], t.age * 0.05),
                (1.0, [255, 255, 255], 0.0),
            ],
        );
    }
}

fn draw_particles(state: &SessionState, out: &mut FrameBuffer) {
    for p in state.particles.particles() {
        let opacity = p.opacity();
        match p.kind {
            ParticleKind::Foam => out.fill_disc(p.pos, p.size, [240, 250, 255], opacity * 0.4),
            ParticleKind::Water => out.fill_ellipse(
                p.pos,
                Vec2::new(p.size * 0.6, p.size),
                [200, 230, 255],
                opacity * 0.6,
            ),
            ParticleKind::Sparkle => out.glint(p.pos, p.size, opacity),
            ParticleKind::Grime => {
                out.fill_disc(p.pos, p.size, p.color.unwrap_or([90, 75, 60]), opacity * 0.8)
            }
        }
    }
}

fn draw_cursor(out: &mut FrameBuffer, cursor: Vec2, brush_size: f32) {
    out.radial_gradient(
        cursor,
        brush_size / 1.5,
        &[(0.0, [255, 255, 255], 0.4), (1.0, [255, 255, 255], 0.0)],
    );
    // Dark halo under the bright ring
    let ring = brush_size * 0.3;
    out.ring(cursor, ring, 4.0, [0, 0, 0], 0.25);
    out.ring(cursor, ring, 2.0, [255, 255, 255], 0.9);
}

/// White border plus inner glow, scaled by the flash level
fn draw_flash(out: &mut FrameBuffer, level: f32) {
    const BORDER: f32 = 20.0;
    const GLOW: f32 = 100.0;
    let (w, h) = (out.width as f32, out.height as f32);
    for y in 0..out.height {
        for x in 0..out.width {
            let (fx, fy) = (x as f32, y as f32);
            let edge = fx.min(fy).min(w - 1.0 - fx).min(h - 1.0 - fy);
            let opacity = if edge < BORDER {
                0.8
            } else {
                0.8 * (1.0 - (edge - BORDER) / GLOW).max(0.0)
            };
            if opacity > 0.0 {
                out.pixels[y * out.width + x].blend_over([255, 255, 255], opacity * level);
            }
        }
    }
}
