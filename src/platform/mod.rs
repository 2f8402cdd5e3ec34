//! Platform layer
//!
//! Handles browser/native differences for:
//! - Hand tracking (MediaPipe Hands in the browser, a scripted stand-in natively)
//! - Background image loading
//! - Presenting frames (canvas on web, PNG export natively)

#[cfg(not(target_arch = "wasm32"))]
pub mod native;
#[cfg(target_arch = "wasm32")]
pub mod web;
