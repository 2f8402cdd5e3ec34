//! Play session
//!
//! Owns one level's engine state, the hand tracker, the progress callback and
//! the compositor. The host drives it with `frame` once per display refresh
//! and forwards pointer, resize and background events. Dropping the session
//! stops the tracker.

use glam::Vec2;

use crate::renderer::{Background, Compositor, FrameBuffer};
use crate::settings::Settings;
use crate::sim::input::TrackingState;
use crate::sim::state::SessionState;
use crate::sim::tick::{TickInput, TickOutput, tick};
use crate::tracking::{HandFeed, HandTracker};

type ProgressCallback = Box<dyn FnMut(f32)>;

pub struct Session {
    state: SessionState,
    feed: HandFeed,
    tracker: Option<Box<dyn HandTracker>>,
    on_progress: Option<ProgressCallback>,
    background: Option<Background>,
    compositor: Compositor,
    frame: FrameBuffer,
}

impl Session {
    pub fn new(settings: &Settings, width: usize, height: usize) -> Self {
        log::info!(
            "Session {}x{} preset={} wipes={}",
            width,
            height,
            settings.preset.as_str(),
            settings.wipes_required
        );
        Self {
            state: SessionState::new(settings, width, height),
            feed: HandFeed::new(),
            tracker: None,
            on_progress: None,
            background: None,
            compositor: Compositor::new(),
            frame: FrameBuffer::new(width, height),
        }
    }

    /// Start a hand tracker. A tracker that fails to start leaves the session
    /// on pointer input; that is not an error for the caller.
    pub fn attach_tracker(&mut self, mut tracker: Box<dyn HandTracker>) {
        self.stop_tracker();
        match tracker.start(self.feed.clone()) {
            Ok(()) => {
                log::info!("Hand tracker '{}' started", tracker.name());
                self.tracker = Some(tracker);
            }
            Err(e) => {
                log::warn!("{e}; continuing with pointer input");
                self.state.input.tracker_unavailable();
            }
        }
    }

    /// Run on pointer input alone
    pub fn without_tracker(&mut self) {
        self.stop_tracker();
        self.state.input.tracker_unavailable();
    }

    /// Feed handle for hosts that push observations themselves
    pub fn feed(&self) -> HandFeed {
        self.feed.clone()
    }

    pub fn set_on_progress(&mut self, callback: impl FnMut(f32) + 'static) {
        self.on_progress = Some(Box::new(callback));
    }

    /// Pointer moved to viewport pixel (x, y)
    pub fn pointer_move(&mut self, x: f32, y: f32, now_ms: f64) {
        self.state.input.pointer_move(Vec2::new(x, y), now_ms);
    }

    /// A new picture started loading; the level is hidden until it lands
    pub fn begin_background_load(&mut self) {
        self.background = None;
        self.compositor.invalidate();
        self.state.begin_image_load();
    }

    /// The picture finished loading; paint fresh fog over it
    pub fn set_background(&mut self, background: Background) {
        log::debug!(
            "Background {}x{} ready",
            background.width(),
            background.height()
        );
        self.background = Some(background);
        self.compositor.invalidate();
        self.state.image_loaded();
    }

    /// Viewport changed; starts the level over
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) == self.state.viewport() {
            return;
        }
        log::info!("Resize to {}x{}; level reset", width, height);
        self.state.resize(width, height);
        self.compositor.invalidate();
    }

    /// Change brush diameter and wipe count mid-level; the fog is kept
    pub fn set_brush(&mut self, brush_size: f32, wipes_required: u32) {
        log::debug!("Brush {brush_size}px, {wipes_required} wipes");
        self.state.set_brush(brush_size, wipes_required);
    }

    /// Advance one frame and render it
    pub fn frame(&mut self, now_ms: f64, is_complete: bool) -> TickOutput {
        self.pump_tracker(now_ms);

        let out = tick(&mut self.state, &TickInput { now_ms, is_complete });
        if let (Some(progress), Some(callback)) = (out.progress, self.on_progress.as_mut()) {
            callback(progress);
        }

        self.compositor
            .render(&self.state, self.background.as_ref(), &mut self.frame);
        out
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn progress(&self) -> f32 {
        self.state.progress
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.state.input.state()
    }

    /// Camera lost for longer than the grace window; show the "wave" prompt
    pub fn show_guidance(&self) -> bool {
        self.state.input.show_guidance()
    }

    /// Stop the tracker and release the camera
    pub fn shutdown(&mut self) {
        self.stop_tracker();
        self.on_progress = None;
    }

    fn stop_tracker(&mut self) {
        if let Some(mut tracker) = self.tracker.take() {
            tracker.stop();
            log::info!("Hand tracker '{}' stopped", tracker.name());
        }
    }

    fn pump_tracker(&mut self, now_ms: f64) {
        let drained = self.feed.drain();
        if drained.ready && !self.state.input.is_tracker_ready() {
            log::info!("Hand tracker ready");
            self.state.input.tracker_ready();
        }
        if let Some(observation) = drained.observation {
            self.state.input.observe_hand(observation, now_ms);
        }
        if let Some(reason) = drained.failed {
            log::warn!("Hand tracker failed: {reason}; continuing with pointer input");
            self.stop_tracker();
            self.state.input.tracker_unavailable();
        }

        if self.tracker.is_none() && !self.state.input.is_tracker_ready() {
            log::info!("No hand tracker attached; pointer input only");
            self.state.input.tracker_unavailable();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sim::input::HandObservation;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Broken;

    impl HandTracker for Broken {
        fn start(&mut self, _feed: HandFeed) -> Result<(), Error> {
            Err(Error::TrackerInit("no camera".into()))
        }
        fn stop(&mut self) {}
    }

    /// Hands the feed back to the test so it can publish observations
    struct Scripted {
        feed: Rc<RefCell<Option<HandFeed>>>,
        stopped: Arc<AtomicBool>,
    }

    impl HandTracker for Scripted {
        fn start(&mut self, feed: HandFeed) -> Result<(), Error> {
            feed.mark_ready();
            *self.feed.borrow_mut() = Some(feed);
            Ok(())
        }
        fn stop(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    fn loaded(w: usize, h: usize) -> Session {
        let mut session = Session::new(&Settings::default(), w, h);
        session.set_background(Background::solid(w, h, [20, 120, 40]));
        session
    }

    #[test]
    fn test_broken_tracker_degrades_to_pointer() {
        let mut session = loaded(200, 150);
        session.attach_tracker(Box::new(Broken));
        session.pointer_move(100.0, 75.0, 0.0);
        let out = session.frame(0.0, false);
        assert!(out.interacting);
        assert_eq!(session.tracking_state(), TrackingState::MouseActive);
    }

    #[test]
    fn test_no_tracker_is_pointer_only() {
        let mut session = loaded(200, 150);
        session.pointer_move(10.0, 10.0, 0.0);
        assert!(session.frame(0.0, false).interacting);
    }

    #[test]
    fn test_host_can_publish_without_tracker() {
        let mut session = loaded(100, 100);
        session
            .feed()
            .publish(HandObservation::present(0.5, 0.5));
        session.frame(0.0, false);
        assert_eq!(session.tracking_state(), TrackingState::CameraActive);
    }

    #[test]
    fn test_progress_callback_fires_on_samples() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut session = loaded(100, 100);
        session.set_on_progress(move |p| sink.borrow_mut().push(p));

        session.frame(0.0, false);
        session.frame(16.0, false);
        session.frame(160.0, false);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_tracker_drives_and_stops_on_drop() {
        let feed = Rc::new(RefCell::new(None));
        let stopped = Arc::new(AtomicBool::new(false));
        {
            let mut session = loaded(200, 200);
            session.attach_tracker(Box::new(Scripted {
                feed: feed.clone(),
                stopped: stopped.clone(),
            }));
            let handle = feed.borrow().clone().unwrap();

            handle.publish(HandObservation::present(0.5, 0.5));
            let out = session.frame(0.0, false);
            assert!(out.interacting);
            assert_eq!(session.tracking_state(), TrackingState::CameraActive);
            assert_eq!(session.state().cursor, Some(Vec2::new(100.0, 100.0)));

            // Pointer is ignored while the camera drives
            session.pointer_move(5.0, 5.0, 20.0);
            session.frame(33.0, false);
            assert_eq!(session.state().cursor, Some(Vec2::new(100.0, 100.0)));
        }
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_tracker_failure_falls_back() {
        let feed = Rc::new(RefCell::new(None));
        let stopped = Arc::new(AtomicBool::new(false));
        let mut session = loaded(200, 200);
        session.attach_tracker(Box::new(Scripted {
            feed: feed.clone(),
            stopped: stopped.clone(),
        }));
        feed.borrow().as_ref().unwrap().mark_failed("stream ended");
        session.frame(0.0, false);
        assert!(stopped.load(Ordering::SeqCst));
        assert!(!session.state().input.is_tracker_available());

        session.pointer_move(50.0, 50.0, 10.0);
        assert!(session.frame(16.0, false).interacting);
    }

    #[test]
    fn test_background_reload_hides_level() {
        let mut session = loaded(120, 80);
        session.pointer_move(60.0, 40.0, 0.0);
        assert!(session.frame(0.0, false).interacting);

        session.begin_background_load();
        let out = session.frame(16.0, false);
        assert!(!out.interacting);
        assert_eq!(out.progress, None);

        session.set_background(Background::solid(30, 30, [0, 0, 255]));
        session.pointer_move(61.0, 40.0, 30.0);
        assert!(session.frame(32.0, false).interacting);
    }

    #[test]
    fn test_set_brush_changes_wipe_strength() {
        let wipe_once = |session: &mut Session| {
            session.pointer_move(50.0, 50.0, 0.0);
            session.frame(0.0, false);
            session.state().surface.alpha_at(50, 50).unwrap()
        };

        let mut gentle = loaded(100, 100);
        gentle.without_tracker();
        let gentle_alpha = wipe_once(&mut gentle);

        let mut harsh = loaded(100, 100);
        harsh.without_tracker();
        harsh.set_brush(60.0, 1);
        assert_eq!(wipe_once(&mut harsh), 0);
        assert!(gentle_alpha > 0);
        assert_eq!(harsh.state().brush_size, 60.0);
    }

    #[test]
    fn test_frame_matches_viewport_after_resize() {
        let mut session = loaded(64, 48);
        session.frame(0.0, false);
        assert_eq!(session.frame_buffer().as_bytes().len(), 64 * 48 * 4);

        session.resize(32, 32);
        session.frame(16.0, false);
        assert_eq!(session.frame_buffer().width, 32);
        assert_eq!(session.frame_buffer().pixels.len(), 32 * 32);
        assert_eq!(session.progress(), 0.0);
    }
}
