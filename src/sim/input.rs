//! Input fusion: hand tracking and pointer merged into one target
//!
//! The hand feed arrives on its own cadence; pointer moves arrive on the frame
//! thread. Both overwrite a single target position (last write wins). This
//! controller only publishes the raw target and the tracking state; smoothing
//! belongs to the frame loop.

use glam::Vec2;

use crate::consts::*;

/// Which source currently drives the brush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    /// No palm seen yet and no pointer movement
    #[default]
    Uninitialized,
    /// A palm was seen recently
    CameraActive,
    /// Palm missing; still inside the grace window unless `show_guidance()` says otherwise
    CameraLostGrace,
    /// Pointer drives the brush
    MouseActive,
}

impl TrackingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingState::Uninitialized => "uninitialized",
            TrackingState::CameraActive => "camera",
            TrackingState::CameraLostGrace => "camera-lost",
            TrackingState::MouseActive => "mouse",
        }
    }
}

/// One result from the hand tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandObservation {
    pub hand_present: bool,
    /// Palm center, normalized to [0, 1] x [0, 1] in camera space
    pub palm: Option<Vec2>,
}

impl HandObservation {
    pub fn present(x: f32, y: f32) -> Self {
        Self {
            hand_present: true,
            palm: Some(Vec2::new(x, y)),
        }
    }

    pub fn absent() -> Self {
        Self {
            hand_present: false,
            palm: None,
        }
    }

    /// Palm position when the observation is usable
    pub fn palm(&self) -> Option<Vec2> {
        if self.hand_present {
            self.palm.filter(|p| p.is_finite())
        } else {
            None
        }
    }
}

/// Mirror a normalized camera point horizontally and expand it around the center
pub fn map_palm(palm: Vec2, sensitivity: f32) -> Vec2 {
    let mirrored = Vec2::new(1.0 - palm.x, palm.y);
    let expanded = (mirrored - Vec2::splat(0.5)) * sensitivity + Vec2::splat(0.5);
    expanded.clamp(Vec2::ZERO, Vec2::ONE)
}

/// Merges the two input sources into one target and a tracking state
#[derive(Debug, Clone)]
pub struct InputFusion {
    state: TrackingState,
    target: Option<Vec2>,
    viewport: Vec2,
    sensitivity: f32,
    grace_ms: f64,
    /// Time of the last positive palm observation
    last_hand_ms: Option<f64>,
    /// A palm arrived since the previous poll
    seen_since_poll: bool,
    /// Camera lost past the grace window; prompt the player to wave
    guidance: bool,
    tracker_ready: bool,
    /// First check after the tracker came up with no palm yet
    ready_since_ms: Option<f64>,
    tracker_available: bool,
}

impl InputFusion {
    pub fn new(viewport: Vec2, sensitivity: f32, grace_ms: f64) -> Self {
        Self {
            state: TrackingState::Uninitialized,
            target: None,
            viewport,
            sensitivity,
            grace_ms,
            last_hand_ms: None,
            seen_since_poll: false,
            guidance: false,
            tracker_ready: false,
            ready_since_ms: None,
            tracker_available: true,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    /// Latest raw target in viewport pixels
    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
    }

    /// Camera input is driving (or briefly lost but inside the grace window)
    pub fn is_tracking_active(&self) -> bool {
        match self.state {
            TrackingState::CameraActive => true,
            TrackingState::CameraLostGrace => !self.guidance,
            _ => false,
        }
    }

    /// The brush should follow the target this frame
    pub fn is_driving(&self) -> bool {
        self.is_tracking_active() || self.state == TrackingState::MouseActive
    }

    /// No palm within the grace window (after one was lost, or since the
    /// tracker came up) and nothing else took over
    pub fn show_guidance(&self) -> bool {
        self.guidance && self.state != TrackingState::MouseActive
    }

    /// The tracker finished starting up (the "camera ready" signal)
    pub fn tracker_ready(&mut self) {
        self.tracker_ready = true;
    }

    pub fn is_tracker_ready(&self) -> bool {
        self.tracker_ready
    }

    /// The tracker never started; run on pointer input alone
    pub fn tracker_unavailable(&mut self) {
        self.tracker_available = false;
        self.tracker_ready = true;
        self.guidance = false;
    }

    pub fn is_tracker_available(&self) -> bool {
        self.tracker_available
    }

    /// Feed one hand-tracker result
    pub fn observe_hand(&mut self, observation: HandObservation, now_ms: f64) {
        self.tracker_ready = true;
        match observation.palm() {
            Some(palm) => {
                let mapped = map_palm(palm, self.sensitivity);
                self.target = Some(mapped * self.viewport);
                self.last_hand_ms = Some(now_ms);
                self.seen_since_poll = true;
                self.guidance = false;
                self.transition(TrackingState::CameraActive);
            }
            None => {
                self.seen_since_poll = false;
                if self.state == TrackingState::CameraActive {
                    self.transition(TrackingState::CameraLostGrace);
                }
                self.check_grace(now_ms);
            }
        }
    }

    /// Periodic tracking-loss check; a camera that produced no palm since the
    /// previous poll drops into the grace state
    pub fn poll(&mut self, now_ms: f64) {
        if self.state == TrackingState::CameraActive && !self.seen_since_poll {
            self.transition(TrackingState::CameraLostGrace);
        }
        self.seen_since_poll = false;
        self.check_grace(now_ms);
    }

    /// Pointer moved to `pos` (viewport pixels, clamped to the viewport)
    pub fn pointer_move(&mut self, pos: Vec2, now_ms: f64) {
        if !pos.is_finite() {
            return;
        }
        let pos = pos.clamp(Vec2::ZERO, self.viewport.max(Vec2::ZERO));
        self.check_grace(now_ms);
        match self.state {
            TrackingState::CameraActive => {}
            TrackingState::CameraLostGrace if !self.guidance => {}
            _ => {
                self.guidance = false;
                self.target = Some(pos);
                self.transition(TrackingState::MouseActive);
            }
        }
    }

    /// Milliseconds since the last palm, if one was ever seen
    pub fn since_last_hand(&self, now_ms: f64) -> Option<f64> {
        self.last_hand_ms.map(|t| now_ms - t)
    }

    fn check_grace(&mut self, now_ms: f64) {
        let expired = match self.state {
            TrackingState::Uninitialized => {
                if !self.tracker_ready || !self.tracker_available {
                    return;
                }
                let since = *self.ready_since_ms.get_or_insert(now_ms);
                now_ms - since > self.grace_ms
            }
            TrackingState::CameraActive | TrackingState::CameraLostGrace => self
                .since_last_hand(now_ms)
                .is_none_or(|elapsed| elapsed > self.grace_ms),
            TrackingState::MouseActive => return,
        };
        if expired {
            if self.state == TrackingState::CameraActive {
                self.transition(TrackingState::CameraLostGrace);
            }
            if !self.guidance {
                log::debug!("No hand for more than {} ms", self.grace_ms);
            }
            self.guidance = true;
        }
    }

    fn transition(&mut self, next: TrackingState) {
        if self.state != next {
            log::debug!("Tracking {} -> {}", self.state.as_str(), next.as_str());
            self.state = next;
        }
    }
}
