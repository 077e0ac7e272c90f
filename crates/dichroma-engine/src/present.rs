//! Presentation seam.

use dichroma_core::SurfaceBuffer;

use crate::timing::FrameStats;

/// Receives each finished surface.
///
/// Called on the frame loop, so implementations should copy out what they
/// need and return quickly.
pub trait PresentationSink: Send {
    fn present(&mut self, surface: &SurfaceBuffer, stats: &FrameStats);
}
