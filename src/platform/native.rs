//! Desktop support: PNG in/out and a synthetic hand tracker
//!
//! There is no webcam pipeline on the desktop build. `SyntheticTracker` plays
//! a scripted palm path from its own thread so the threaded feed handoff and
//! the tracking-loss handling run exactly as they do in the browser.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec2;

use crate::error::Error;
use crate::renderer::{Background, FrameBuffer};
use crate::sim::input::HandObservation;
use crate::tracking::{HandFeed, HandTracker};

/// Decode a picture file into a background
pub fn load_background(path: &Path) -> Result<Background, Error> {
    let image = image::open(path)
        .map_err(|e| Error::Frame(format!("{}: {e}", path.display())))?
        .to_rgba8();
    let (w, h) = image.dimensions();
    Background::from_rgba(w as usize, h as usize, image.as_raw())
}

/// Write a rendered frame as PNG
pub fn save_frame(frame: &FrameBuffer, path: &Path) -> Result<(), Error> {
    let image = image::RgbaImage::from_raw(
        frame.width as u32,
        frame.height as u32,
        frame.as_bytes().to_vec(),
    )
    .ok_or_else(|| Error::Frame(format!("{}x{} frame has the wrong size", frame.width, frame.height)))?;
    image
        .save(path)
        .map_err(|e| Error::Frame(format!("{}: {e}", path.display())))
}

/// Scripted palm motion: a boustrophedon sweep over the camera frame with an
/// optional window where the hand is out of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmScript {
    /// Horizontal passes per sweep
    pub rows: u32,
    /// Duration of one horizontal pass
    pub row_ms: f64,
    /// Hand leaves the frame during [start, end) ms
    pub dropout: Option<(f64, f64)>,
}

impl Default for PalmScript {
    fn default() -> Self {
        Self {
            rows: 6,
            row_ms: 900.0,
            dropout: Some((2500.0, 5000.0)),
        }
    }
}

impl PalmScript {
    /// Observation at `t_ms` since the script started
    pub fn observe(&self, t_ms: f64) -> HandObservation {
        if let Some((start, end)) = self.dropout {
            if t_ms >= start && t_ms < end {
                return HandObservation::absent();
            }
        }
        let rows = self.rows.max(1);
        let sweep_ms = self.row_ms * rows as f64;
        let t = t_ms.rem_euclid(sweep_ms);
        let row = ((t / self.row_ms) as u32).min(rows - 1);
        let along = ((t - row as f64 * self.row_ms) / self.row_ms) as f32;
        let along = if row % 2 == 0 { along } else { 1.0 - along };

        // Keep inside the band that maps onto the whole viewport after expansion
        let band = Vec2::new(0.22, 0.78);
        let x = band.x + (band.y - band.x) * along;
        let y = band.x + (band.y - band.x) * (row as f32 + 0.5) / rows as f32;
        HandObservation::present(x, y)
    }
}

/// Hand tracker that publishes a `PalmScript` from a background thread
pub struct SyntheticTracker {
    script: PalmScript,
    interval: Duration,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SyntheticTracker {
    pub fn new(script: PalmScript) -> Self {
        Self {
            script,
            // Typical webcam landmark rate
            interval: Duration::from_millis(33),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl HandTracker for SyntheticTracker {
    fn start(&mut self, feed: HandFeed) -> Result<(), Error> {
        if self.worker.is_some() {
            return Ok(());
        }
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let script = self.script;
        let interval = self.interval;

        let worker = thread::Builder::new()
            .name("synthetic-hands".into())
            .spawn(move || {
                let started = Instant::now();
                feed.mark_ready();
                while running.load(Ordering::SeqCst) {
                    let t_ms = started.elapsed().as_secs_f64() * 1000.0;
                    feed.publish(script.observe(t_ms));
                    thread::sleep(interval);
                }
            })
            .map_err(|e| Error::TrackerInit(e.to_string()))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Synthetic tracker thread panicked");
            }
        }
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

impl Drop for SyntheticTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_dropout_window() {
        let script = PalmScript::default();
        assert!(script.observe(0.0).hand_present);
        assert!(!script.observe(3000.0).hand_present);
        assert!(script.observe(5000.0).hand_present);
    }

    #[test]
    fn test_script_zigzags() {
        let script = PalmScript {
            rows: 2,
            row_ms: 1000.0,
            dropout: None,
        };
        let start = script.observe(0.0).palm.unwrap();
        let end_row0 = script.observe(999.0).palm.unwrap();
        let start_row1 = script.observe(1000.0).palm.unwrap();
        assert!(end_row0.x > start.x);
        assert!(start_row1.y > start.y);
        // Second row runs back the other way
        assert!((start_row1.x - end_row0.x).abs() < 0.01);
    }

    #[test]
    fn test_tracker_publishes_and_stops() {
        let feed = HandFeed::new();
        let mut tracker = SyntheticTracker::new(PalmScript {
            dropout: None,
            ..PalmScript::default()
        });
        tracker.start(feed.clone()).unwrap();
        thread::sleep(Duration::from_millis(120));
        tracker.stop();
        let published = feed.published();
        assert!(published >= 1);
        assert!(feed.drain().ready);

        // Stopped threads publish nothing more
        thread::sleep(Duration::from_millis(80));
        assert_eq!(feed.published(), published);
        tracker.stop();
    }

    #[test]
    fn test_png_round_trip() {
        let mut frame = FrameBuffer::new(3, 2);
        frame.pixels[4] = crate::sim::surface::Rgba::new(10, 20, 30, 255);
        let path = std::env::temp_dir().join(format!("fog-reveal-{}.png", std::process::id()));
        save_frame(&frame, &path).unwrap();
        let background = load_background(&path).unwrap();
        assert_eq!((background.width(), background.height()), (3, 2));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_picture_is_frame_error() {
        let err = load_background(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, Error::Frame(_)));
    }
}
