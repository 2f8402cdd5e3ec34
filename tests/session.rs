//! End-to-end session behavior through the public API

use std::cell::RefCell;
use std::rc::Rc;

use fog_reveal::consts::*;
use fog_reveal::renderer::Background;
use fog_reveal::sim::{HandObservation, TrackingState};
use fog_reveal::tracking::{HandFeed, HandTracker};
use fog_reveal::{Error, Session, Settings};

/// Tracker whose feed the test publishes into directly
struct Manual {
    feed: Rc<RefCell<Option<HandFeed>>>,
}

impl HandTracker for Manual {
    fn start(&mut self, feed: HandFeed) -> Result<(), Error> {
        feed.mark_ready();
        *self.feed.borrow_mut() = Some(feed);
        Ok(())
    }

    fn stop(&mut self) {}
}

fn session_with_hand(w: usize, h: usize) -> (Session, HandFeed) {
    let slot = Rc::new(RefCell::new(None));
    let mut session = Session::new(&Settings::default(), w, h);
    session.attach_tracker(Box::new(Manual { feed: slot.clone() }));
    session.set_background(Background::solid(w, h, [10, 80, 30]));
    let feed = slot.borrow().clone().expect("tracker started");
    (session, feed)
}

/// Sweep the pointer across the whole viewport in rows
fn sweep(session: &mut Session, w: usize, h: usize, now: &mut f64) {
    for y in (0..=h).step_by(40) {
        for x in (0..=w).step_by(20) {
            let x = if (y / 40) % 2 == 0 { x } else { w - x };
            session.pointer_move(x as f32, y as f32, *now);
            session.frame(*now, false);
            *now += 16.0;
        }
    }
}

#[test]
fn test_camera_mouse_camera_handoff() {
    let (mut session, feed) = session_with_hand(320, 240);
    assert_eq!(session.tracking_state(), TrackingState::Uninitialized);

    feed.publish(HandObservation::present(0.5, 0.5));
    session.frame(0.0, false);
    assert_eq!(session.tracking_state(), TrackingState::CameraActive);

    // No further palms; pointer moves are ignored inside the grace window
    session.pointer_move(10.0, 10.0, 1000.0);
    session.frame(1000.0, false);
    assert_ne!(session.tracking_state(), TrackingState::MouseActive);

    // Past the grace window the pointer takes over
    session.pointer_move(10.0, 10.0, 2001.0);
    session.frame(2016.0, false);
    assert_eq!(session.tracking_state(), TrackingState::MouseActive);

    // A palm pre-empts the mouse regardless of pointer activity
    session.pointer_move(20.0, 20.0, 2030.0);
    feed.publish(HandObservation::present(0.3, 0.3));
    session.frame(2032.0, false);
    assert_eq!(session.tracking_state(), TrackingState::CameraActive);
}

#[test]
fn test_guidance_after_hand_lost() {
    let (mut session, feed) = session_with_hand(320, 240);
    feed.publish(HandObservation::present(0.5, 0.5));
    session.frame(0.0, false);

    let mut now = 16.0;
    while now < 3000.0 {
        feed.publish(HandObservation::absent());
        session.frame(now, false);
        now += 16.0;
    }
    assert!(session.show_guidance());
    assert!(!session.frame(now, false).interacting);

    feed.publish(HandObservation::present(0.5, 0.5));
    session.frame(now + 16.0, false);
    assert!(!session.show_guidance());
}

#[test]
fn test_guidance_when_camera_sees_no_hand_at_startup() {
    let (mut session, feed) = session_with_hand(320, 240);
    let mut now = 0.0;
    while now < 5000.0 {
        let out = session.frame(now, false);
        assert!(!out.interacting);
        now += 16.0;
    }
    assert_eq!(session.tracking_state(), TrackingState::Uninitialized);
    assert!(session.show_guidance());

    feed.publish(HandObservation::present(0.5, 0.5));
    assert!(session.frame(now, false).interacting);
    assert!(!session.show_guidance());
}

#[test]
fn test_full_sweep_completes_and_stops_erasing() {
    let mut settings = Settings::default();
    settings.wipes_required = 1;
    let mut session = Session::new(&settings, 200, 160);
    session.without_tracker();
    session.set_background(Background::solid(200, 160, [200, 20, 20]));

    let reported = Rc::new(RefCell::new(Vec::new()));
    {
        let reported = reported.clone();
        session.set_on_progress(move |p| reported.borrow_mut().push(p));
    }

    let mut now = 0.0;
    sweep(&mut session, 200, 160, &mut now);
    now += 200.0;
    session.frame(now, false);

    let last = *reported.borrow().last().expect("progress reported");
    assert_eq!(last, 100.0);
    assert!(last >= COMPLETION_THRESHOLD);
    assert!(reported.borrow().windows(2).all(|w| w[1] >= w[0]));

    // The host declares completion; further input never wipes
    session.pointer_move(100.0, 80.0, now + 16.0);
    let out = session.frame(now + 16.0, true);
    assert!(!out.interacting);
    assert_eq!(out.stamps, 0);
    assert!(session.state().completion_flash > 0.0);

    // Revealed frame shows the picture
    let center = session.frame_buffer().pixels[80 * 200 + 100];
    assert!(center.r > center.g + 40, "{center:?}");
}

#[test]
fn test_resize_mid_session_resets_progress() {
    let mut session = Session::new(&Settings::default(), 200, 160);
    session.without_tracker();
    session.set_background(Background::solid(200, 160, [0, 0, 0]));

    let mut now = 0.0;
    sweep(&mut session, 200, 160, &mut now);
    now += 200.0;
    session.frame(now, false);
    assert!(session.progress() > 0.0);

    session.resize(240, 180);
    assert_eq!(session.progress(), 0.0);
    let out = session.frame(now + 16.0, true);
    assert_eq!(out.progress, Some(0.0));
    assert_eq!(session.frame_buffer().width, 240);
}

#[test]
fn test_particles_drain_after_interaction() {
    let mut session = Session::new(&Settings::default(), 200, 160);
    session.without_tracker();
    session.set_background(Background::solid(200, 160, [0, 0, 0]));

    let mut now = 0.0;
    sweep(&mut session, 200, 160, &mut now);
    assert!(!session.state().particles.is_empty());
    assert!(session.state().particles.len() <= MAX_PARTICLES);

    for _ in 0..300 {
        session.frame(now, true);
        now += 16.0;
    }
    assert!(session.state().particles.is_empty());
    assert!(session.state().particles.trail().is_empty());
}
