//! Session state owned by the frame loop
//!
//! Everything one level needs lives here: the fog surface, the particle
//! system, the input controller and the smoothed cursor. Nothing is global.

use glam::Vec2;

use super::input::InputFusion;
use super::particles::ParticleSystem;
use super::progress::{ProgressEstimator, Throttle};
use super::surface::FogSurface;
use crate::settings::Settings;

/// Complete per-level engine state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub surface: FogSurface,
    pub estimator: ProgressEstimator,
    pub particles: ParticleSystem,
    pub input: InputFusion,

    /// Smoothed brush position (only the frame loop writes this)
    pub cursor: Option<Vec2>,
    /// Cursor at the end of the previous frame, start of the next stroke segment
    pub last_cursor: Option<Vec2>,
    /// The brush erased this frame
    pub interacting: bool,

    /// Last reported progress (0-100)
    pub progress: f32,
    pub progress_throttle: Throttle,
    pub tracking_poll: Throttle,

    /// Background finished loading
    pub image_ready: bool,
    /// External "level done" flag as of the last tick
    pub complete: bool,
    /// One-shot completion flash, 1.0 at trigger and fading to 0
    pub completion_flash: f32,

    pub brush_size: f32,
    pub strength: f32,
    pub smoothing: f32,
    pub trails: bool,

    viewport: (usize, usize),
    /// Frames ticked this session
    pub frame: u64,
}

impl SessionState {
    /// Fresh state for a viewport; the fog is painted once the background is ready
    pub fn new(settings: &Settings, width: usize, height: usize) -> Self {
        let settings = settings.clone().sanitized();
        let viewport = Vec2::new(width as f32, height as f32);

        let mut particles = ParticleSystem::new(settings.max_particles(), settings.seed ^ 0x9E37_79B9);
        particles.grime = settings.preset.grime_particles();

        Self {
            surface: FogSurface::new(settings.fog_style(), settings.seed),
            estimator: ProgressEstimator::new(settings.progress_stride, settings.reveal_alpha_threshold),
            particles,
            input: InputFusion::new(
                viewport,
                settings.movement_sensitivity,
                settings.grace_period_ms(),
            ),
            cursor: None,
            last_cursor: None,
            interacting: false,
            progress: 0.0,
            progress_throttle: Throttle::new(settings.progress_interval_ms),
            tracking_poll: Throttle::new(settings.tracking_poll_ms),
            image_ready: false,
            complete: false,
            completion_flash: 0.0,
            brush_size: settings.brush_size,
            strength: settings.erase_strength(),
            smoothing: settings.tracking_smoothing,
            trails: settings.trails,
            viewport: (width, height),
            frame: 0,
        }
    }

    pub fn viewport(&self) -> (usize, usize) {
        self.viewport
    }

    /// Erase radius (half the brush diameter)
    pub fn erase_radius(&self) -> f32 {
        self.brush_size / 2.0
    }

    /// Background loaded and fog painted; erase/progress/particles may run
    pub fn is_ready(&self) -> bool {
        self.image_ready && self.surface.is_ready()
    }

    /// A new background started loading: hide everything until it lands
    pub fn begin_image_load(&mut self) {
        self.image_ready = false;
        self.clear_level();
    }

    /// The background finished loading: paint a fresh fog layer
    pub fn image_loaded(&mut self) {
        self.image_ready = true;
        let (w, h) = self.viewport;
        if self.surface.generation() == 0 {
            let seed = self.surface.seed();
            self.surface.initialize(w, h, seed);
        } else {
            self.surface.resize(w, h);
        }
        self.clear_level();
    }

    /// Viewport changed size; treated as starting the level over
    pub fn resize(&mut self, width: usize, height: usize) {
        self.viewport = (width, height);
        self.input
            .set_viewport(Vec2::new(width as f32, height as f32));
        if self.image_ready {
            self.surface.resize(width, height);
        }
        self.clear_level();
    }

    /// Difficulty knobs that do not need a fresh surface
    pub fn set_brush(&mut self, brush_size: f32, wipes_required: u32) {
        self.brush_size = brush_size.max(1.0);
        self.strength = 1.0 / wipes_required.max(1) as f32;
    }

    fn clear_level(&mut self) {
        self.progress = 0.0;
        self.progress_throttle.reset();
        self.last_cursor = None;
        self.interacting = false;
        self.particles.clear();
    }
}
