//! Reveal progress estimation
//!
//! Reading the whole fog buffer is the most expensive thing the engine does,
//! so the estimator looks at every Nth pixel and the frame loop only asks for
//! a sample on a fixed cadence.

use super::surface::FogSurface;
use crate::consts::*;

/// Stride-sampled estimate of how much of the fog has been wiped away
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEstimator {
    /// Examine every `stride`-th pixel
    pub stride: usize,
    /// Alpha strictly below this counts as revealed
    pub reveal_threshold: u8,
    /// Raw percentages at or above this are reported as exactly 100
    pub full_reveal_percent: f32,
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self {
            stride: PROGRESS_STRIDE,
            reveal_threshold: REVEAL_ALPHA_THRESHOLD,
            full_reveal_percent: FULL_REVEAL_PERCENT,
        }
    }
}

impl ProgressEstimator {
    pub fn new(stride: usize, reveal_threshold: u8) -> Self {
        Self {
            stride: stride.max(1),
            reveal_threshold,
            ..Self::default()
        }
    }

    /// Percentage of sampled pixels below the reveal threshold, unsnapped.
    ///
    /// `None` while the surface is not ready.
    pub fn sample_raw(&self, surface: &FogSurface) -> Option<f32> {
        if !surface.is_ready() {
            return None;
        }
        let stride = self.stride.max(1);
        let (mut sampled, mut revealed) = (0usize, 0usize);
        for px in surface.pixels().iter().step_by(stride) {
            sampled += 1;
            if px.a < self.reveal_threshold {
                revealed += 1;
            }
        }
        if sampled == 0 {
            return None;
        }
        Some(revealed as f32 / sampled as f32 * 100.0)
    }

    /// Reported progress in [0, 100]; anything at or past the full-reveal
    /// mark is exactly 100 so soft brush edges cannot stall completion.
    pub fn sample(&self, surface: &FogSurface) -> Option<f32> {
        self.sample_raw(surface).map(|raw| self.snap(raw))
    }

    #[inline]
    pub fn snap(&self, raw: f32) -> f32 {
        if raw >= self.full_reveal_percent {
            100.0
        } else {
            raw.clamp(0.0, 100.0)
        }
    }
}

/// Minimum-interval gate (progress sampling, tracking-loss polls)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throttle {
    pub interval_ms: f64,
    last_ms: Option<f64>,
}

impl Throttle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// True (and re-armed) when at least `interval_ms` passed since the last
    /// accepted call. The first call is always due.
    pub fn due(&mut self, now_ms: f64) -> bool {
        match self.last_ms {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }

    /// Forget the last sample time so the next call is due
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::surface::FogStyle;
    use glam::Vec2;
    use proptest::prelude::*;

    fn surface(w: usize, h: usize) -> FogSurface {
        let mut s = FogSurface::new(FogStyle::default(), 11);
        s.initialize(w, h, 11);
        s
    }

    #[test]
    fn test_fresh_surface_is_zero() {
        let est = ProgressEstimator::default();
        assert_eq!(est.sample(&surface(200, 100)), Some(0.0));
    }

    #[test]
    fn test_unready_surface_has_no_sample() {
        let est = ProgressEstimator::default();
        let s = FogSurface::new(FogStyle::default(), 0);
        assert_eq!(est.sample(&s), None);
    }

    #[test]
    fn test_fully_wiped_is_hundred() {
        let est = ProgressEstimator::default();
        let mut s = surface(60, 40);
        for y in (0..40).step_by(4) {
            s.erase(Some(Vec2::new(0.0, y as f32)), Vec2::new(60.0, y as f32), 10.0, 1.0);
        }
        assert_eq!(est.sample(&s), Some(100.0));
    }

    #[test]
    fn test_partial_wipe_is_between() {
        let est = ProgressEstimator::new(1, REVEAL_ALPHA_THRESHOLD);
        let mut s = surface(100, 100);
        s.erase(None, Vec2::new(50.0, 50.0), 20.0, 1.0);
        let p = est.sample(&s).unwrap();
        assert!(p > 0.0 && p < 50.0, "got {p}");
    }

    #[test]
    fn test_snap_near_full() {
        let est = ProgressEstimator::default();
        assert_eq!(est.snap(98.3), 100.0);
        assert_eq!(est.snap(99.1), 100.0);
        assert_eq!(est.snap(98.0), 100.0);
        assert_eq!(est.snap(97.9), 97.9);
    }

    #[test]
    fn test_throttle_interval() {
        let mut throttle = Throttle::new(150.0);
        assert!(throttle.due(0.0));
        assert!(!throttle.due(100.0));
        assert!(!throttle.due(149.9));
        assert!(throttle.due(150.0));
        assert!(!throttle.due(160.0));
        throttle.reset();
        assert!(throttle.due(161.0));
    }

    #[test]
    fn test_stride_one_vs_coarse() {
        let mut s = surface(100, 100);
        s.erase(Some(Vec2::new(0.0, 50.0)), Vec2::new(100.0, 50.0), 30.0, 1.0);
        let fine = ProgressEstimator::new(1, REVEAL_ALPHA_THRESHOLD).sample_raw(&s).unwrap();
        let coarse = ProgressEstimator::new(25, REVEAL_ALPHA_THRESHOLD).sample_raw(&s).unwrap();
        assert!((fine - coarse).abs() < 10.0, "fine {fine} coarse {coarse}");
    }

    proptest! {
        #[test]
        fn prop_sample_is_pure(x in 0.0f32..80.0, y in 0.0f32..60.0, r in 1.0f32..40.0, stride in 1usize..40) {
            let est = ProgressEstimator::new(stride, REVEAL_ALPHA_THRESHOLD);
            let mut s = surface(80, 60);
            s.erase(None, Vec2::new(x, y), r, 1.0);
            let before = s.pixels().to_vec();
            let first = est.sample(&s);
            let second = est.sample(&s);
            prop_assert_eq!(first, second);
            prop_assert_eq!(before.as_slice(), s.pixels());
        }
    }
}
