//! Software RGBA framebuffer and the primitives drawn into it

use glam::Vec2;

use crate::sim::surface::Rgba;

/// Opaque RGBA frame, row-major, ready for `putImageData` or PNG export
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Rgba>,
}

/// One stop of a radial gradient: (offset 0-1, rgb, opacity)
pub type GradientStop = (f32, [u8; 3], f32);

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::new(0, 0, 0, 255); width * height],
        }
    }

    /// Reallocate for a new size; contents are undefined until the next fill
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height, Rgba::new(0, 0, 0, 255));
    }

    pub fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Source-over one pixel
    #[inline]
    pub fn blend(&mut self, x: i32, y: i32, rgb: [u8; 3], opacity: f32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i].blend_over(rgb, opacity);
        }
    }

    /// Additive blend with per-channel saturation (stacks toward white)
    #[inline]
    pub fn add(&mut self, x: i32, y: i32, rgb: [u8; 3], strength: f32) {
        if let Some(i) = self.index(x, y) {
            let px = &mut self.pixels[i];
            let add = |d: u8, s: u8| -> u8 {
                (d as f32 + s as f32 * strength).round().clamp(0.0, 255.0) as u8
            };
            px.r = add(px.r, rgb[0]);
            px.g = add(px.g, rgb[1]);
            px.b = add(px.b, rgb[2]);
        }
    }

    /// Integer bounding box of a circle, clipped to the frame
    fn bounds(&self, center: Vec2, radius: f32) -> Option<(i32, i32, i32, i32)> {
        if radius <= 0.0 || self.width == 0 || self.height == 0 {
            return None;
        }
        let x0 = ((center.x - radius).floor() as i32).max(0);
        let y0 = ((center.y - radius).floor() as i32).max(0);
        let x1 = ((center.x + radius).ceil() as i32).min(self.width as i32 - 1);
        let y1 = ((center.y + radius).ceil() as i32).min(self.height as i32 - 1);
        if x1 < x0 || y1 < y0 {
            return None;
        }
        Some((x0, y0, x1, y1))
    }

    /// Flat disc with source-over blending
    pub fn fill_disc(&mut self, center: Vec2, radius: f32, rgb: [u8; 3], opacity: f32) {
        let Some((x0, y0, x1, y1)) = self.bounds(center, radius) else {
            return;
        };
        let r2 = radius * radius;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Vec2::new(x as f32, y as f32) - center;
                if d.length_squared() <= r2 {
                    self.blend(x, y, rgb, opacity);
                }
            }
        }
    }

    /// Axis-aligned ellipse (water streaks are taller than wide)
    pub fn fill_ellipse(&mut self, center: Vec2, radii: Vec2, rgb: [u8; 3], opacity: f32) {
        if radii.x <= 0.0 || radii.y <= 0.0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.bounds(center, radii.max_element()) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = (Vec2::new(x as f32, y as f32) - center) / radii;
                if d.length_squared() <= 1.0 {
                    self.blend(x, y, rgb, opacity);
                }
            }
        }
    }

    /// Radial gradient disc; stops must be sorted by offset
    pub fn radial_gradient(&mut self, center: Vec2, radius: f32, stops: &[GradientStop]) {
        let Some((x0, y0, x1, y1)) = self.bounds(center, radius) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let t = Vec2::new(x as f32, y as f32).distance(center) / radius;
                if t > 1.0 {
                    continue;
                }
                let (rgb, opacity) = gradient_at(stops, t);
                if opacity > 0.0 {
                    self.blend(x, y, rgb, opacity);
                }
            }
        }
    }

    /// Soft additive glow with a gaussian falloff
    pub fn glow(&mut self, center: Vec2, radius: f32, rgb: [u8; 3], strength: f32) {
        let Some((x0, y0, x1, y1)) = self.bounds(center, radius) else {
            return;
        };
        let sigma = radius * 0.5;
        let denom = 2.0 * sigma * sigma;
        let r2 = radius * radius;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d2 = (Vec2::new(x as f32, y as f32) - center).length_squared();
                if d2 > r2 {
                    continue;
                }
                self.add(x, y, rgb, (-d2 / denom).exp() * strength);
            }
        }
    }

    /// Circle outline `width` pixels wide
    pub fn ring(&mut self, center: Vec2, radius: f32, width: f32, rgb: [u8; 3], opacity: f32) {
        let outer = radius + width / 2.0;
        let inner = (radius - width / 2.0).max(0.0);
        let Some((x0, y0, x1, y1)) = self.bounds(center, outer + 1.0) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Vec2::new(x as f32, y as f32).distance(center);
                // Anti-aliased band edges
                let coverage = (outer - d + 0.5).clamp(0.0, 1.0) * (d - inner + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(x, y, rgb, opacity * coverage);
                }
            }
        }
    }

    /// Straight line using Bresenham, additive
    pub fn line_add(&mut self, from: Vec2, to: Vec2, rgb: [u8; 3], strength: f32) {
        let (mut x0, mut y0) = (from.x.round() as i32, from.y.round() as i32);
        let (x1, y1) = (to.x.round() as i32, to.y.round() as i32);
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.add(x0, y0, rgb, strength);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Four-point glint: a small glow with a cross through it
    pub fn glint(&mut self, center: Vec2, size: f32, strength: f32) {
        let white = [255, 255, 255];
        self.glow(center, size * 0.6, white, strength);
        let arm = size.max(1.0);
        self.line_add(center - Vec2::X * arm, center + Vec2::X * arm, white, strength * 0.8);
        self.line_add(center - Vec2::Y * arm, center + Vec2::Y * arm, white, strength * 0.8);
    }
}

/// Linear interpolation between gradient stops
fn gradient_at(stops: &[GradientStop], t: f32) -> ([u8; 3], f32) {
    let Some(&(first_t, first_rgb, first_a)) = stops.first() else {
        return ([0, 0, 0], 0.0);
    };
    if t <= first_t {
        return (first_rgb, first_a);
    }
    for pair in stops.windows(2) {
        let (t0, c0, a0) = pair[0];
        let (t1, c1, a1) = pair[1];
        if t <= t1 {
            let u = if t1 > t0 { (t - t0) / (t1 - t0) } else { 1.0 };
            let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * u).round() as u8;
            return (
                [mix(c0[0], c1[0]), mix(c0[1], c1[1]), mix(c0[2], c1[2])],
                a0 + (a1 - a0) * u,
            );
        }
    }
    stops
        .last()
        .map_or(([0, 0, 0], 0.0), |&(_, rgb, a)| (rgb, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disc_clips_at_edges() {
        let mut fb = FrameBuffer::new(10, 10);
        fb.fill_disc(Vec2::new(-2.0, -2.0), 4.0, [255, 0, 0], 1.0);
        assert_eq!(fb.pixels[0], Rgba::new(255, 0, 0, 255));
        assert_eq!(fb.pixels[99], Rgba::new(0, 0, 0, 255));
        // Fully offscreen is a no-op
        fb.fill_disc(Vec2::new(-50.0, 50.0), 4.0, [0, 255, 0], 1.0);
    }

    #[test]
    fn test_additive_saturates() {
        let mut fb = FrameBuffer::new(3, 3);
        fb.fill(Rgba::new(200, 200, 200, 255));
        fb.add(1, 1, [255, 100, 0], 1.0);
        assert_eq!(fb.pixels[4], Rgba::new(255, 255, 200, 255));
    }

    #[test]
    fn test_gradient_interpolates() {
        let stops = [(0.0, [255, 255, 255], 0.4), (1.0, [255, 255, 255], 0.0)];
        let (_, a) = gradient_at(&stops, 0.5);
        assert!((a - 0.2).abs() < 1e-6);
        assert_eq!(gradient_at(&stops, 1.0).1, 0.0);
        assert_eq!(gradient_at(&[], 0.5).1, 0.0);
    }

    #[test]
    fn test_ring_leaves_center_untouched() {
        let mut fb = FrameBuffer::new(41, 41);
        fb.ring(Vec2::new(20.0, 20.0), 15.0, 2.0, [255, 255, 255], 1.0);
        assert_eq!(fb.pixels[20 * 41 + 20], Rgba::new(0, 0, 0, 255));
        assert_eq!(fb.pixels[20 * 41 + 35].r, 255);
    }

    #[test]
    fn test_bytes_layout() {
        let mut fb = FrameBuffer::new(2, 1);
        fb.pixels[1] = Rgba::new(1, 2, 3, 4);
        assert_eq!(fb.as_bytes(), &[0, 0, 0, 255, 1, 2, 3, 4]);
    }
}
