//! Hand-tracking boundary
//!
//! The tracker is an external capability that produces `HandObservation`s on
//! its own thread or callback cadence. It publishes into a `HandFeed`, a
//! latest-value slot the frame loop drains once per frame. Only the newest
//! observation matters, so publishing never blocks on the consumer.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Error;
use crate::sim::input::HandObservation;

#[derive(Debug, Default)]
struct FeedSlot {
    latest: Option<HandObservation>,
    published: u64,
    ready: bool,
    failed: Option<String>,
}

/// Shared handoff between a tracker and the frame loop
#[derive(Debug, Clone, Default)]
pub struct HandFeed {
    slot: Arc<Mutex<FeedSlot>>,
}

/// Everything the frame loop picks up from the feed in one go
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDrain {
    /// Newest observation since the previous drain
    pub observation: Option<HandObservation>,
    /// Tracker reported it is up
    pub ready: bool,
    /// Tracker reported it died after starting
    pub failed: Option<String>,
}

impl HandFeed {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking tracker thread must not take the frame loop down with it
    fn lock(&self) -> MutexGuard<'_, FeedSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Overwrite the pending observation (last write wins)
    pub fn publish(&self, observation: HandObservation) {
        let mut slot = self.lock();
        slot.latest = Some(observation);
        slot.published += 1;
        slot.ready = true;
    }

    /// The tracker finished starting up
    pub fn mark_ready(&self) {
        self.lock().ready = true;
    }

    /// The tracker stopped producing results for good
    pub fn mark_failed(&self, reason: impl Into<String>) {
        self.lock().failed = Some(reason.into());
    }

    /// Total observations ever published
    pub fn published(&self) -> u64 {
        self.lock().published
    }

    /// Take the pending observation and status flags
    pub fn drain(&self) -> FeedDrain {
        let mut slot = self.lock();
        FeedDrain {
            observation: slot.latest.take(),
            ready: slot.ready,
            failed: slot.failed.take(),
        }
    }
}

/// A source of hand observations (camera + landmark model, or a stand-in)
pub trait HandTracker {
    /// Begin producing observations into `feed`.
    ///
    /// An error means the capability is unavailable; the session then runs
    /// on pointer input alone.
    fn start(&mut self, feed: HandFeed) -> Result<(), Error>;

    /// Stop producing observations and release the camera. Must be idempotent.
    fn stop(&mut self);

    fn name(&self) -> &str {
        "hand-tracker"
    }
}
