//! Camera capture seam.
//!
//! The processor never touches a platform camera API directly. Hosts provide
//! a [`CaptureDevice`] that can check and request access, and hand back a
//! [`CaptureTrack`] that yields RGBA frames until it is stopped.

use dichroma_core::FrameGeometry;
use futures_util::future::BoxFuture;

/// Errors raised while acquiring or reading the camera.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("camera capture is not supported on this host")]
    Unsupported,

    #[error("camera access was denied")]
    PermissionDenied,

    #[error("capture stream has no video track")]
    NoVideoTrack,

    #[error("capture device error: {0}")]
    Device(String),
}

/// A camera that can be opened into a video track.
pub trait CaptureDevice: Send {
    /// Report whether access is already granted, without prompting.
    fn query_permission(&mut self) -> BoxFuture<'_, Result<bool, CaptureError>>;

    /// Request access (prompting if needed) and open a video track.
    fn open(&mut self) -> BoxFuture<'_, Result<Box<dyn CaptureTrack>, CaptureError>>;
}

/// An open video track.
pub trait CaptureTrack: Send {
    /// Negotiated frame size. Fixed for the lifetime of the track.
    fn geometry(&self) -> FrameGeometry;

    /// Copy the newest frame into `dst` as tightly packed RGBA.
    ///
    /// `dst` holds exactly `geometry().byte_len()` bytes. Returns `Ok(false)`
    /// when no frame has arrived since the previous read.
    fn read_frame(&mut self, dst: &mut [u8]) -> Result<bool, CaptureError>;

    /// Stop the track and release the camera.
    fn stop(&mut self);
}
