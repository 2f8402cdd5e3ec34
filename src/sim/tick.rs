//! Per-frame tick
//!
//! One call per displayed frame. Reads the fused input target, smooths the
//! cursor toward it, wipes and spawns feedback while the brush is driving,
//! advances particles, and samples progress on a throttle.

use super::particles::ParticleSystem;
use super::state::SessionState;
use crate::consts::*;
use crate::lerp;

/// Per-frame inputs from the host
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Monotonic frame timestamp in milliseconds
    pub now_ms: f64,
    /// Externally authoritative "level done" flag
    pub is_complete: bool,
}

/// What happened during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutput {
    /// Fresh progress sample (only on throttled frames)
    pub progress: Option<f32>,
    /// The brush wiped this frame
    pub interacting: bool,
    /// Erase stamps applied this frame
    pub stamps: usize,
    /// Particles spawned this frame
    pub spawned: usize,
}

/// Advance the session by one frame
pub fn tick(state: &mut SessionState, input: &TickInput) -> TickOutput {
    let mut out = TickOutput::default();
    state.frame += 1;

    // Completion edge (one-shot flash) and its decay
    if input.is_complete && !state.complete {
        log::info!("Level complete at {:.1}%", state.progress);
        state.completion_flash = 1.0;
    }
    state.complete = input.is_complete;
    if state.completion_flash > 0.0 {
        state.completion_flash = (state.completion_flash - 1.0 / COMPLETION_FLASH_FRAMES).max(0.0);
    }

    if state.tracking_poll.due(input.now_ms) {
        state.input.poll(input.now_ms);
    }

    // First-order low-pass toward the raw target
    if let Some(target) = state.input.target() {
        state.cursor = Some(match state.cursor {
            Some(cursor) => lerp(cursor, target, state.smoothing),
            None => target,
        });
    }

    state.interacting = state.input.is_driving()
        && state.input.is_tracker_ready()
        && !state.complete
        && state.is_ready();

    if state.interacting {
        if let Some(cursor) = state.cursor {
            let radius = state.erase_radius();
            out.stamps = state
                .surface
                .erase(state.last_cursor, cursor, radius, state.strength);

            if state.trails {
                state.particles.spawn_trail(cursor, state.brush_size / 2.0);
            }

            let travel = state
                .last_cursor
                .map_or(10.0, |last| last.distance(cursor));
            if travel > SPAWN_MIN_TRAVEL {
                let intensity = ParticleSystem::intensity_for_travel(travel);
                out.spawned = state.particles.spawn(cursor, intensity, state.brush_size);
            }
        }
    }
    out.interacting = state.interacting;

    let (_, height) = state.viewport();
    state.particles.update(height as f32);

    if state.is_ready() && state.progress_throttle.due(input.now_ms) {
        if let Some(progress) = state.estimator.sample(&state.surface) {
            state.progress = progress;
            out.progress = Some(progress);
        }
    }

    state.last_cursor = state.cursor;
    out
}
