//! Deterministic engine module
//!
//! Everything the frame loop decides lives here. This module must stay pure:
//! - Time comes in through `TickInput`, never from a clock
//! - Seeded RNG only
//! - No rendering or platform dependencies

pub mod input;
pub mod particles;
pub mod progress;
pub mod state;
pub mod surface;
pub mod tick;

pub use input::{HandObservation, InputFusion, TrackingState, map_palm};
pub use particles::{Particle, ParticleArena, ParticleHandle, ParticleKind, ParticleSystem, TrailPoint};
pub use progress::{ProgressEstimator, Throttle};
pub use state::SessionState;
pub use surface::{FogStyle, FogSurface, Rgba, stamp_falloff};
pub use tick::{TickInput, TickOutput, tick};
