//! Fog Reveal - wipe a foggy window to uncover the picture behind it
//!
//! Core modules:
//! - `sim`: Deterministic engine (fog surface, progress sampling, particles, input fusion, frame tick)
//! - `session`: Explicit per-level session that owns the engine and the hand tracker
//! - `tracking`: Boundary to an external hand-tracking capability
//! - `renderer`: Software compositor producing RGBA frames
//! - `platform`: Browser glue (wasm32 only)
//! - `settings`: Data-driven tuning presets

pub mod error;
pub mod platform;
pub mod renderer;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tracking;

pub use error::Error;
pub use session::Session;
pub use settings::{Settings, TuningPreset};

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    /// Nominal frame rate the per-frame decay rates are tuned for
    pub const FRAME_RATE: f32 = 60.0;

    /// Fraction of the remaining cursor distance covered each frame
    pub const TRACKING_SMOOTHING: f32 = 0.5;
    /// Expansion of palm motion around the frame center
    pub const MOVEMENT_SENSITIVITY: f32 = 1.8;
    /// Time after the last palm sighting during which the camera still counts as active
    pub const LOST_TRACKING_GRACE_MS: f64 = 2000.0;
    /// Cadence of the tracking-loss check
    pub const TRACKING_POLL_INTERVAL_MS: f64 = 500.0;

    /// Fog base tint (RGB)
    pub const FOG_TINT: [u8; 3] = [235, 240, 245];
    /// Fog base opacity (0-1)
    pub const FOG_OPACITY: f32 = 0.95;
    /// Peak per-channel luminance noise
    pub const FOG_NOISE: f32 = 30.0;
    /// Chance that a pixel gets a pinhole
    pub const PINHOLE_CHANCE: f32 = 0.02;
    /// Alpha removed by a pinhole
    pub const PINHOLE_DEPTH: u8 = 50;
    /// Number of droplet highlights painted on a fresh surface
    pub const DROPLET_COUNT: usize = 400;
    /// Droplet highlight opacity
    pub const DROPLET_OPACITY: f32 = 0.4;

    /// Default brush diameter in pixels
    pub const DEFAULT_BRUSH_SIZE: f32 = 150.0;
    /// Default number of overlapping passes needed to clear a point
    pub const DEFAULT_WIPES_REQUIRED: u32 = 4;
    /// Stamp spacing along a stroke, as a fraction of the erase radius
    pub const STAMP_SPACING: f32 = 0.2;
    /// Inner fraction of the stamp radius erased at full strength
    pub const STAMP_CORE: f32 = 0.3;

    /// Examine every Nth pixel when sampling progress
    pub const PROGRESS_STRIDE: usize = 25;
    /// Alpha below which a pixel counts as revealed
    pub const REVEAL_ALPHA_THRESHOLD: u8 = 40;
    /// Sampled percentages at or above this snap to 100
    pub const FULL_REVEAL_PERCENT: f32 = 98.0;
    /// Minimum time between two progress samples
    pub const PROGRESS_INTERVAL_MS: f64 = 150.0;
    /// Progress at which the demo collaborator declares the level complete
    pub const COMPLETION_THRESHOLD: f32 = 99.0;

    /// Hard upper bound on live particles
    pub const MAX_PARTICLES: usize = 2000;
    /// Hard upper bound on live trail points
    pub const MAX_TRAIL_POINTS: usize = 256;
    /// Cap on spawn intensity (guards against big jumps when tracking resumes)
    pub const MAX_SPAWN_INTENSITY: f32 = 3.0;
    /// Pointer travel (px) below which no particles spawn
    pub const SPAWN_MIN_TRAVEL: f32 = 5.0;

    /// Frames the completion flash takes to fade
    pub const COMPLETION_FLASH_FRAMES: f32 = 60.0;
}

/// Linear interpolation from `start` toward `end`
#[inline]
pub fn lerp(start: Vec2, end: Vec2, factor: f32) -> Vec2 {
    start + (end - start) * factor
}
