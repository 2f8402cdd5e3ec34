//! Crate error type
//!
//! Nothing in the engine is fatal; these surface at the seams where a caller
//! can choose a fallback (pointer-only input, default settings, skipped export).

use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The hand-tracking capability could not be started
    TrackerInit(String),
    /// Settings could not be read or parsed
    Config(String),
    /// A pixel buffer had the wrong size or could not be exported
    Frame(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TrackerInit(s) => write!(f, "Hand tracker init error: {s}"),
            Error::Config(s) => write!(f, "Settings error: {s}"),
            Error::Frame(s) => write!(f, "Frame error: {s}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
