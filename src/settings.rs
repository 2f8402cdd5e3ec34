//! Session settings and tuning presets
//!
//! Read from JSON; anything missing falls back to the preset defaults.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::Error;
use crate::sim::FogStyle;

/// Tuning presets
///
/// Two looks ship with the game: a light mist and a heavier grime layer that
/// also sheds falling dirt particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TuningPreset {
    #[default]
    Mist,
    Grime,
}

impl TuningPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            TuningPreset::Mist => "Mist",
            TuningPreset::Grime => "Grime",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mist" | "fog" => Some(TuningPreset::Mist),
            "grime" | "dirt" => Some(TuningPreset::Grime),
            _ => None,
        }
    }

    /// Fog opacity for this preset (0-1)
    pub fn fog_opacity(&self) -> f32 {
        match self {
            TuningPreset::Mist => FOG_OPACITY,
            TuningPreset::Grime => 0.98,
        }
    }

    /// Fog base tint for this preset
    pub fn fog_tint(&self) -> [u8; 3] {
        match self {
            TuningPreset::Mist => FOG_TINT,
            TuningPreset::Grime => [168, 150, 122],
        }
    }

    /// Tracking grace window in milliseconds
    pub fn grace_period_ms(&self) -> f64 {
        match self {
            TuningPreset::Mist => LOST_TRACKING_GRACE_MS,
            TuningPreset::Grime => 1500.0,
        }
    }

    /// Whether wiping sheds grime debris particles
    pub fn grime_particles(&self) -> bool {
        matches!(self, TuningPreset::Grime)
    }
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Look and feel preset
    pub preset: TuningPreset,

    // === Difficulty ===
    /// Brush diameter in pixels
    pub brush_size: f32,
    /// Overlapping passes needed to clear a point (>= 1)
    pub wipes_required: u32,

    // === Input ===
    /// Fraction of the remaining cursor distance covered per frame
    pub tracking_smoothing: f32,
    /// Palm motion expansion around the frame center
    pub movement_sensitivity: f32,
    /// Override for the preset grace window
    pub grace_period_ms: Option<f64>,
    /// Cadence of the tracking-loss check
    pub tracking_poll_ms: f64,

    // === Fog ===
    /// Override for the preset fog opacity
    pub fog_opacity: Option<f32>,
    pub noise_amplitude: f32,
    pub pinhole_chance: f32,
    pub droplet_count: usize,

    // === Progress ===
    pub progress_interval_ms: f64,
    pub progress_stride: usize,
    pub reveal_alpha_threshold: u8,

    // === Visual effects ===
    pub particles: bool,
    pub trails: bool,
    pub max_particles: usize,

    /// RNG seed for fog texture and particles
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preset: TuningPreset::Mist,

            brush_size: DEFAULT_BRUSH_SIZE,
            wipes_required: DEFAULT_WIPES_REQUIRED,

            tracking_smoothing: TRACKING_SMOOTHING,
            movement_sensitivity: MOVEMENT_SENSITIVITY,
            grace_period_ms: None,
            tracking_poll_ms: TRACKING_POLL_INTERVAL_MS,

            fog_opacity: None,
            noise_amplitude: FOG_NOISE,
            pinhole_chance: PINHOLE_CHANCE,
            droplet_count: DROPLET_COUNT,

            progress_interval_ms: PROGRESS_INTERVAL_MS,
            progress_stride: PROGRESS_STRIDE,
            reveal_alpha_threshold: REVEAL_ALPHA_THRESHOLD,

            particles: true,
            trails: true,
            max_particles: MAX_PARTICLES,

            seed: 0x5EED_F0C5,
        }
    }
}

impl Settings {
    /// Create settings from a preset (applies preset defaults)
    pub fn from_preset(preset: TuningPreset) -> Self {
        Self {
            preset,
            ..Self::default()
        }
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file, falling back to defaults (native only)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
            .and_then(|json| Self::from_json(&json));

        match parsed {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Clamp values into their usable ranges
    pub fn sanitized(mut self) -> Self {
        self.wipes_required = self.wipes_required.max(1);
        self.brush_size = self.brush_size.max(1.0);
        self.tracking_smoothing = self.tracking_smoothing.clamp(0.01, 1.0);
        self.movement_sensitivity = self.movement_sensitivity.max(0.1);
        self.progress_stride = self.progress_stride.max(1);
        self.max_particles = self.max_particles.min(MAX_PARTICLES);
        self.pinhole_chance = self.pinhole_chance.clamp(0.0, 1.0);
        self
    }

    /// Erase strength per stroke; more required wipes means weaker strokes
    pub fn erase_strength(&self) -> f32 {
        1.0 / self.wipes_required.max(1) as f32
    }

    /// Erase radius (half the brush diameter)
    pub fn erase_radius(&self) -> f32 {
        self.brush_size / 2.0
    }

    /// Effective grace window (override or preset)
    pub fn grace_period_ms(&self) -> f64 {
        self.grace_period_ms
            .unwrap_or_else(|| self.preset.grace_period_ms())
    }

    /// Effective particle cap
    pub fn max_particles(&self) -> usize {
        if !self.particles { 0 } else { self.max_particles }
    }

    /// Fog texture parameters for a fresh surface
    pub fn fog_style(&self) -> FogStyle {
        FogStyle {
            tint: self.preset.fog_tint(),
            opacity: self
                .fog_opacity
                .unwrap_or_else(|| self.preset.fog_opacity())
                .clamp(0.0, 1.0),
            noise: self.noise_amplitude,
            pinhole_chance: self.pinhole_chance,
            droplets: self.droplet_count,
        }
    }
}
