//! Fog surface: the erasable occlusion layer
//!
//! An RGBA buffer the size of the viewport. Alpha is the remaining fog
//! (255 = fully fogged, 0 = clear). Between two initializations alpha per
//! pixel only ever goes down.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::*;

/// One straight (non-premultiplied) RGBA pixel
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Source-over composite of `rgb` at `opacity` (0-1) onto this pixel
    pub fn blend_over(&mut self, rgb: [u8; 3], opacity: f32) {
        let sa = opacity.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return;
        }
        let da = self.a as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return;
        }
        let mix = |s: u8, d: u8| -> u8 {
            let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
            v.round().clamp(0.0, 255.0) as u8
        };
        self.r = mix(rgb[0], self.r);
        self.g = mix(rgb[1], self.g);
        self.b = mix(rgb[2], self.b);
        self.a = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

/// Texture parameters for a fresh fog layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogStyle {
    /// Base tint
    pub tint: [u8; 3],
    /// Base opacity (0-1)
    pub opacity: f32,
    /// Peak per-channel luminance noise
    pub noise: f32,
    /// Chance per pixel of a thinner spot
    pub pinhole_chance: f32,
    /// Number of droplet highlights
    pub droplets: usize,
}

impl Default for FogStyle {
    fn default() -> Self {
        Self {
            tint: FOG_TINT,
            opacity: FOG_OPACITY,
            noise: FOG_NOISE,
            pinhole_chance: PINHOLE_CHANCE,
            droplets: DROPLET_COUNT,
        }
    }
}

/// Erase coverage at distance `d` from a stamp of radius `radius`.
///
/// Full strength inside the core, half strength at 60% of the falloff band,
/// zero at the rim.
#[inline]
pub fn stamp_falloff(d: f32, radius: f32) -> f32 {
    if radius <= 0.0 || d >= radius {
        return 0.0;
    }
    let core = radius * STAMP_CORE;
    if d <= core {
        return 1.0;
    }
    let t = (d - core) / (radius - core);
    if t <= 0.6 {
        1.0 - 0.5 * (t / 0.6)
    } else {
        0.5 * (1.0 - (t - 0.6) / 0.4)
    }
}

/// The erasable fog layer
#[derive(Debug, Clone)]
pub struct FogSurface {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
    style: FogStyle,
    seed: u64,
    /// Number of initializations so far (each one is a fresh level)
    generation: u64,
    ready: bool,
}

impl FogSurface {
    /// An empty, not-yet-ready surface
    pub fn new(style: FogStyle, seed: u64) -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            style,
            seed,
            generation: 0,
            ready: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Raw RGBA bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the fog has been painted; erase and sampling are no-ops before that
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn style(&self) -> FogStyle {
        self.style
    }

    pub fn set_style(&mut self, style: FogStyle) {
        self.style = style;
    }

    /// Alpha at pixel (x, y), if inside the surface
    pub fn alpha_at(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x].a)
    }

    /// Allocate and paint a fresh fog layer.
    ///
    /// Fills with the tinted base, adds per-pixel luminance noise and pinholes,
    /// then scatters droplet highlights. A zero-sized surface never becomes ready.
    pub fn initialize(&mut self, width: usize, height: usize, seed: u64) {
        self.width = width;
        self.height = height;
        self.seed = seed;
        self.generation += 1;
        self.ready = false;

        let len = width * height;
        self.pixels.clear();
        self.pixels.resize(len, Rgba::TRANSPARENT);
        if len == 0 {
            log::debug!("Fog surface has zero area; staying un-ready");
            return;
        }

        let style = self.style;
        let mut rng = Pcg32::seed_from_u64(seed);
        let base_a = (style.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let [tr, tg, tb] = style.tint;

        for px in self.pixels.iter_mut() {
            let noise = (rng.random::<f32>() - 0.5) * style.noise;
            let shade = |c: u8| (c as f32 + noise).round().clamp(0.0, 255.0) as u8;
            *px = Rgba::new(shade(tr), shade(tg), shade(tb), base_a);
            if rng.random::<f32>() < style.pinhole_chance {
                px.a = px.a.saturating_sub(PINHOLE_DEPTH);
            }
        }

        for _ in 0..style.droplets {
            let center = Vec2::new(
                rng.random::<f32>() * width as f32,
                rng.random::<f32>() * height as f32,
            );
            let radius = rng.random_range(1.0..4.0);
            self.paint_droplet(center, radius);
        }

        self.ready = true;
        log::info!(
            "Fog surface #{} initialized at {}x{}",
            self.generation,
            width,
            height
        );
    }

    /// Reallocate for a new viewport size and re-fog (a resize starts a new level)
    pub fn resize(&mut self, width: usize, height: usize) {
        let seed = self.seed.wrapping_add(1);
        self.initialize(width, height, seed);
    }

    /// Re-fog at the current size (new background image)
    pub fn reset(&mut self) {
        self.resize(self.width, self.height);
    }

    /// Apply an erase stroke ending at `to`.
    ///
    /// With `from` set, stamps are laid along `from -> to` every
    /// `radius * STAMP_SPACING` pixels so fast strokes leave no gaps. `strength`
    /// is the fraction of full opacity removed at a stamp core (`1 / wipes`).
    /// Returns the number of stamps applied.
    pub fn erase(&mut self, from: Option<Vec2>, to: Vec2, radius: f32, strength: f32) -> usize {
        if !self.ready || radius <= 0.0 || strength <= 0.0 || !to.is_finite() {
            return 0;
        }
        let strength = strength.min(1.0);

        let steps = match from {
            Some(from) if from.is_finite() => {
                let spacing = (radius * STAMP_SPACING).max(0.5);
                // A stroke never needs more stamps than it takes to cross the layer
                let reach = self.size().length() + 2.0 * radius;
                let max_steps = (reach / spacing).ceil() as usize;
                ((from.distance(to) / spacing).ceil() as usize).min(max_steps)
            }
            _ => 0,
        };

        match from {
            Some(from) if steps > 0 => {
                for i in 1..=steps {
                    let t = i as f32 / steps as f32;
                    self.stamp(from.lerp(to, t), radius, strength);
                }
                steps
            }
            _ => {
                self.stamp(to, radius, strength);
                1
            }
        }
    }

    /// One soft radial alpha cut centered at `center`
    fn stamp(&mut self, center: Vec2, radius: f32, strength: f32) {
        let Some((x0, y0, x1, y1)) = self.clip_box(center, radius) else {
            return;
        };

        for y in y0..=y1 {
            let row = y * self.width;
            for x in x0..=x1 {
                let d = Vec2::new(x as f32, y as f32).distance(center);
                let coverage = stamp_falloff(d, radius) * strength;
                if coverage <= 0.0 {
                    continue;
                }
                let cut = (255.0 * coverage).ceil().min(255.0) as u8;
                let px = &mut self.pixels[row + x];
                px.a = px.a.saturating_sub(cut);
            }
        }
    }

    /// White highlight disc (only used while painting a fresh surface)
    fn paint_droplet(&mut self, center: Vec2, radius: f32) {
        let Some((x0, y0, x1, y1)) = self.clip_box(center, radius) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                if Vec2::new(x as f32, y as f32).distance(center) <= radius {
                    self.pixels[y * self.width + x].blend_over([255, 255, 255], DROPLET_OPACITY);
                }
            }
        }
    }

    /// Pixel bounding box of a disc, clipped to the surface
    fn clip_box(&self, center: Vec2, radius: f32) -> Option<(usize, usize, usize, usize)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let x0 = (center.x - radius).floor().max(0.0);
        let y0 = (center.y - radius).floor().max(0.0);
        let x1 = (center.x + radius).ceil().min(self.width as f32 - 1.0);
        let y1 = (center.y + radius).ceil().min(self.height as f32 - 1.0);
        if x1 < x0 || y1 < y0 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Solid fog with no texture so alpha math is exact
    fn flat_surface(w: usize, h: usize) -> FogSurface {
        let style = FogStyle {
            opacity: 1.0,
            noise: 0.0,
            pinhole_chance: 0.0,
            droplets: 0,
            ..FogStyle::default()
        };
        let mut surface = FogSurface::new(style, 7);
        surface.initialize(w, h, 7);
        surface
    }

    #[test]
    fn test_initialize_marks_ready() {
        let mut surface = FogSurface::new(FogStyle::default(), 1);
        assert!(!surface.is_ready());
        surface.initialize(120, 80, 1);
        assert!(surface.is_ready());
        assert_eq!(surface.pixels().len(), 120 * 80);
        assert_eq!(surface.as_bytes().len(), 120 * 80 * 4);
        // Every pixel is fogged well above the reveal threshold
        assert!(surface.pixels().iter().all(|p| p.a > REVEAL_ALPHA_THRESHOLD));
    }

    #[test]
    fn test_initialize_is_seeded() {
        let mut a = FogSurface::new(FogStyle::default(), 0);
        let mut b = FogSurface::new(FogStyle::default(), 0);
        a.initialize(64, 64, 42);
        b.initialize(64, 64, 42);
        assert_eq!(a.pixels(), b.pixels());
    }

    #[test]
    fn test_zero_area_never_ready() {
        let mut surface = FogSurface::new(FogStyle::default(), 1);
        surface.initialize(0, 300, 1);
        assert!(!surface.is_ready());
        assert_eq!(surface.erase(None, Vec2::ZERO, 10.0, 1.0), 0);
    }

    #[test]
    fn test_erase_before_ready_is_noop() {
        let mut surface = FogSurface::new(FogStyle::default(), 1);
        assert_eq!(surface.erase(None, Vec2::new(5.0, 5.0), 10.0, 1.0), 0);
        assert!(surface.pixels().is_empty());
    }

    #[test]
    fn test_single_full_strength_wipe_clears_center() {
        let mut surface = flat_surface(100, 100);
        surface.erase(None, Vec2::new(50.0, 50.0), 20.0, 1.0);
        assert_eq!(surface.alpha_at(50, 50), Some(0));
        // Outside the radius nothing changes
        assert_eq!(surface.alpha_at(50, 75), Some(255));
    }

    #[test]
    fn test_ten_wipes_needed_when_wipes_required_is_ten() {
        let mut surface = flat_surface(100, 100);
        let center = Vec2::new(50.0, 50.0);
        let strength = 1.0 / 10.0;
        let near_zero = 4;

        surface.erase(None, center, 20.0, strength);
        let after_one = surface.alpha_at(50, 50).unwrap();
        assert!(after_one > 200, "one weak wipe left {after_one}");

        for _ in 1..9 {
            surface.erase(None, center, 20.0, strength);
        }
        assert!(surface.alpha_at(50, 50).unwrap() > near_zero);

        surface.erase(None, center, 20.0, strength);
        assert!(surface.alpha_at(50, 50).unwrap() <= near_zero);
    }

    #[test]
    fn test_far_off_stroke_is_bounded() {
        let mut surface = flat_surface(100, 100);
        let spacing = 20.0 * STAMP_SPACING;
        let bound = ((100.0f32 * 2.0f32.sqrt() + 40.0) / spacing).ceil() as usize;
        let stamps = surface.erase(Some(Vec2::new(50.0, 50.0)), Vec2::new(5e6, 50.0), 20.0, 1.0);
        assert!(stamps <= bound, "{stamps} stamps");
    }

    #[test]
    fn test_fast_stroke_leaves_no_gaps() {
        let mut surface = flat_surface(140, 60);
        let stamps = surface.erase(Some(Vec2::new(0.0, 30.0)), Vec2::new(100.0, 30.0), 20.0, 1.0);
        assert!(stamps >= 25);
        for x in (0..=100).step_by(5) {
            let a = surface.alpha_at(x, 30).unwrap();
            assert!(a < 128, "gap at x={x}: alpha {a}");
        }
    }

    #[test]
    fn test_point_stamp_alone_would_leave_gaps() {
        let mut surface = flat_surface(140, 60);
        surface.erase(None, Vec2::new(0.0, 30.0), 20.0, 1.0);
        surface.erase(None, Vec2::new(100.0, 30.0), 20.0, 1.0);
        assert_eq!(surface.alpha_at(50, 30), Some(255));
    }

    #[test]
    fn test_erase_keeps_color() {
        let mut surface = flat_surface(40, 40);
        let before = surface.pixels()[20 * 40 + 20];
        surface.erase(None, Vec2::new(20.0, 20.0), 8.0, 0.5);
        let after = surface.pixels()[20 * 40 + 20];
        assert_eq!((before.r, before.g, before.b), (after.r, after.g, after.b));
        assert!(after.a < before.a);
    }

    #[test]
    fn test_offscreen_stroke_is_clipped() {
        let mut surface = flat_surface(40, 40);
        surface.erase(None, Vec2::new(-500.0, -500.0), 8.0, 1.0);
        assert!(surface.pixels().iter().all(|p| p.a == 255));
    }

    #[test]
    fn test_resize_refogs() {
        let mut surface = flat_surface(50, 50);
        surface.erase(None, Vec2::new(25.0, 25.0), 30.0, 1.0);
        assert_eq!(surface.alpha_at(25, 25), Some(0));
        let generation = surface.generation();

        surface.resize(80, 30);
        assert_eq!((surface.width(), surface.height()), (80, 30));
        assert_eq!(surface.generation(), generation + 1);
        assert!(surface.pixels().iter().all(|p| p.a == 255));
    }

    #[test]
    fn test_falloff_profile() {
        assert_eq!(stamp_falloff(0.0, 10.0), 1.0);
        assert_eq!(stamp_falloff(3.0, 10.0), 1.0);
        assert!((stamp_falloff(3.0 + 0.6 * 7.0, 10.0) - 0.5).abs() < 1e-5);
        assert_eq!(stamp_falloff(10.0, 10.0), 0.0);
        assert_eq!(stamp_falloff(1.0, 0.0), 0.0);
    }

    #[test]
    fn test_blend_over_opaque() {
        let mut px = Rgba::new(0, 0, 0, 255);
        px.blend_over([255, 255, 255], 0.4);
        assert_eq!(px.a, 255);
        assert_eq!(px.r, 102);
    }

    proptest! {
        #[test]
        fn prop_erase_never_adds_fog(
            strokes in proptest::collection::vec(
                (proptest::option::of((-20.0f32..84.0, -20.0f32..68.0)),
                 (-20.0f32..84.0, -20.0f32..68.0),
                 0.0f32..30.0,
                 0.0f32..1.5),
                1..12,
            )
        ) {
            let mut surface = FogSurface::new(FogStyle::default(), 3);
            surface.initialize(64, 48, 3);
            for (from, to, radius, strength) in strokes {
                let before: Vec<u8> = surface.pixels().iter().map(|p| p.a).collect();
                surface.erase(
                    from.map(|(x, y)| Vec2::new(x, y)),
                    Vec2::new(to.0, to.1),
                    radius,
                    strength,
                );
                for (old, new) in before.iter().zip(surface.pixels()) {
                    prop_assert!(new.a <= *old);
                }
            }
        }
    }
}
