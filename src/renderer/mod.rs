//! Software rendering module
//!
//! Composites background, fog and feedback into a plain RGBA frame. The host
//! decides how to present it (canvas `putImageData` in the browser, PNG on
//! the desktop demo).

pub mod compose;
pub mod framebuffer;

pub use compose::{Background, Compositor};
pub use framebuffer::FrameBuffer;
