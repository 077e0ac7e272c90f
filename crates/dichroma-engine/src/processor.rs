//! The live frame processor.
//!
//! Lifecycle:
//!
//! ```text
//! Idle ──check_permission──▶ CheckingPermission ─┬─ granted ──▶ Starting ──▶ Running
//!                                                └─ not yet ──▶ AwaitingPermission
//! AwaitingPermission ──load──▶ Starting ──▶ Running | AwaitingPermission (on failure)
//! Running ──hidden──▶ Paused ──visible──▶ Starting ──▶ Running
//! any ──stop──▶ Stopped ──load──▶ Starting
//! load while hidden ──▶ Paused (camera left closed)
//! ```
//!
//! While `Running`, every [`render_frame`](FrameProcessor::render_frame)
//! reads the newest camera frame, blurs it by the acuity setting, remaps it
//! through the active LUT, and letterboxes it onto the presentation surface.

use std::sync::Arc;
use std::time::Instant;

use dichroma_core::frame::blur_radius;
use dichroma_core::{
    ColorLut, FrameError, FrameGeometry, FrameTransformer, LutBuilder, Placement, SurfaceBuffer,
    VisionMode,
};
use serde::Serialize;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::broadcast;

use crate::capture::{CaptureDevice, CaptureError, CaptureTrack};
use crate::config::ProcessorConfig;
use crate::events::{EventBus, ProcessorEvent};
use crate::loader::LutLoader;
use crate::present::PresentationSink;
use crate::slot::LutSlot;
use crate::source::{LutLocator, LutSource};
use crate::timing::{FrameStats, FrameTiming};

/// Errors raised by the processor.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("frame processor must be created inside a tokio runtime")]
    NoRuntime(#[from] TryCurrentError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("frame loop has shut down")]
    LoopClosed,
}

/// Where the processor is in its capture lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorState {
    Idle,
    CheckingPermission,
    AwaitingPermission,
    Starting,
    Running,
    Paused,
    Stopped,
}

/// Result of one [`render_frame`](FrameProcessor::render_frame) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not running; nothing was read or presented.
    Inactive,
    /// Running, but the camera had no new frame.
    NoFrame,
    /// A frame was presented at this placement.
    Presented(Placement),
}

/// Turns camera frames into color-transformed, letterboxed surfaces.
pub struct FrameProcessor {
    config: ProcessorConfig,
    state: ProcessorState,
    visible: bool,
    acuity: f32,

    capture: Box<dyn CaptureDevice>,
    track: Option<Box<dyn CaptureTrack>>,
    sink: Box<dyn PresentationSink>,

    loader: LutLoader,
    slot: LutSlot,
    events: EventBus,

    // ── Frame buffers ──
    source_geometry: FrameGeometry,
    dest_geometry: FrameGeometry,
    capture_buffer: Vec<u8>,
    output_buffer: Vec<u8>,
    transformer: FrameTransformer,
    surface: SurfaceBuffer,
    timing: FrameTiming,
}

impl FrameProcessor {
    /// Create an idle processor.
    ///
    /// Must be called from within a tokio runtime; LUT builds are spawned
    /// onto it.
    pub fn new(
        capture: Box<dyn CaptureDevice>,
        sink: Box<dyn PresentationSink>,
        source: Arc<dyn LutSource>,
        config: ProcessorConfig,
    ) -> Result<Self, ProcessorError> {
        let runtime = Handle::try_current()?;
        let events = EventBus::new(config.event_capacity);
        let slot = LutSlot::default();
        let loader = LutLoader::new(
            source,
            LutBuilder::new(config.resolution),
            slot.clone(),
            events.clone(),
            runtime,
        );

        Ok(Self {
            state: ProcessorState::Idle,
            visible: true,
            acuity: clamp_acuity(config.initial_acuity),
            capture,
            track: None,
            sink,
            loader,
            slot,
            events,
            source_geometry: FrameGeometry::default(),
            dest_geometry: config.initial_surface,
            capture_buffer: Vec::new(),
            output_buffer: Vec::new(),
            transformer: FrameTransformer::new(),
            surface: SurfaceBuffer::new(config.initial_surface),
            timing: FrameTiming::new(config.fps_window),
            config,
        })
    }

    // ── Accessors ──

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn acuity(&self) -> f32 {
        self.acuity
    }

    /// Geometry negotiated with the camera; empty before the first capture.
    pub fn source_geometry(&self) -> FrameGeometry {
        self.source_geometry
    }

    /// Size of the presentation surface.
    pub fn dest_geometry(&self) -> FrameGeometry {
        self.dest_geometry
    }

    /// The table new frames are transformed with.
    pub fn active_lut(&self) -> Arc<ColorLut> {
        self.slot.current()
    }

    pub fn lut_slot(&self) -> LutSlot {
        self.slot.clone()
    }

    /// True while a LUT build is in flight.
    pub fn is_lut_loading(&self) -> bool {
        self.loader.is_busy()
    }

    pub fn stats(&self) -> FrameStats {
        self.timing.stats()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessorEvent> {
        self.events.subscribe()
    }

    // ── Capture lifecycle ──

    /// Check for an existing camera grant and start capturing if there is one.
    ///
    /// Only acts from `Idle`. Without a grant the processor waits in
    /// `AwaitingPermission` for an explicit [`load`](Self::load).
    pub async fn check_permission(&mut self) -> Result<(), ProcessorError> {
        if self.state != ProcessorState::Idle {
            tracing::debug!("permission already checked ({:?})", self.state);
            return Ok(());
        }

        self.state = ProcessorState::CheckingPermission;
        let granted = self.capture.query_permission().await;
        match granted {
            Ok(true) => {
                tracing::info!("camera access already granted");
                self.load().await
            }
            Ok(false) => {
                tracing::info!("camera access not granted yet, waiting for load");
                self.state = ProcessorState::AwaitingPermission;
                Ok(())
            }
            Err(e) => {
                self.state = ProcessorState::AwaitingPermission;
                Err(self.capture_failed(e))
            }
        }
    }

    /// Request camera access and start capturing.
    ///
    /// A no-op while a track is already open. On failure the processor
    /// returns to `AwaitingPermission` and a retry is allowed. While the view
    /// is hidden the camera stays closed and the processor parks in `Paused`
    /// until [`set_visible(true)`](Self::set_visible).
    pub async fn load(&mut self) -> Result<(), ProcessorError> {
        if self.track.is_some() {
            tracing::debug!("capture already running");
            return Ok(());
        }
        if !self.visible {
            if self.state != ProcessorState::Paused {
                self.state = ProcessorState::Paused;
                tracing::info!("view hidden, capture deferred until visible");
                self.events.emit(ProcessorEvent::Paused);
            }
            return Ok(());
        }

        self.state = ProcessorState::Starting;
        tracing::info!("requesting camera access");

        let opened = self.capture.open().await;
        let mut track = match opened {
            Ok(track) => track,
            Err(e) => {
                self.state = ProcessorState::AwaitingPermission;
                return Err(self.capture_failed(e));
            }
        };

        let geometry = track.geometry();
        if geometry.is_empty() {
            track.stop();
            self.state = ProcessorState::AwaitingPermission;
            return Err(self.capture_failed(CaptureError::NoVideoTrack));
        }

        self.attach(track, geometry);
        Ok(())
    }

    /// Release the camera. The processor can be restarted with
    /// [`load`](Self::load).
    pub fn stop(&mut self) {
        self.release_track();
        if self.state != ProcessorState::Stopped {
            self.state = ProcessorState::Stopped;
            tracing::info!("frame processor stopped");
            self.events.emit(ProcessorEvent::Stopped);
        }
    }

    /// React to the host view being shown or hidden.
    ///
    /// Hiding a running processor releases the camera; showing a paused one
    /// reacquires it.
    pub async fn set_visible(&mut self, visible: bool) -> Result<(), ProcessorError> {
        if self.visible == visible {
            return Ok(());
        }
        self.visible = visible;

        match (visible, self.state) {
            (false, ProcessorState::Running) => {
                self.release_track();
                self.state = ProcessorState::Paused;
                tracing::info!("view hidden, capture paused");
                self.events.emit(ProcessorEvent::Paused);
                Ok(())
            }
            (true, ProcessorState::Paused) => {
                tracing::info!("view visible, resuming capture");
                self.load().await
            }
            _ => Ok(()),
        }
    }

    fn attach(&mut self, track: Box<dyn CaptureTrack>, geometry: FrameGeometry) {
        if geometry != self.source_geometry {
            let len = geometry.byte_len();
            self.capture_buffer.resize(len, 0);
            self.output_buffer.resize(len, 0);
            self.transformer.prepare(geometry);
            self.source_geometry = geometry;
        }

        self.track = Some(track);
        self.timing.reset();
        self.state = ProcessorState::Running;
        tracing::info!("capturing at {geometry}");
        self.events.emit(ProcessorEvent::CaptureStarted { geometry });
    }

    fn release_track(&mut self) {
        if let Some(mut track) = self.track.take() {
            track.stop();
            tracing::debug!("camera released");
        }
    }

    fn capture_failed(&self, e: CaptureError) -> ProcessorError {
        tracing::error!("camera unavailable: {e}");
        self.events.emit(ProcessorEvent::CaptureFailed {
            message: e.to_string(),
        });
        e.into()
    }

    // ── Mode and view controls ──

    /// Switch to the table at `locator`, or to identity for `None`.
    ///
    /// Returns immediately; the switch completes in the background.
    pub fn change_mode(&self, locator: Option<LutLocator>) {
        self.loader.request(locator);
    }

    /// Apply a catalog mode: its table and its acuity. `None` is normal vision.
    ///
    /// Acuity is independent of the table and takes effect on the next frame.
    /// The table switch is asynchronous; if its build fails the previous
    /// table stays active alongside the new acuity.
    pub fn select_mode(&mut self, mode: Option<&VisionMode>) {
        self.set_acuity(mode.map_or(1.0, VisionMode::acuity));
        self.change_mode(mode.map(LutLocator::from));
    }

    /// Set the acuity degradation factor. Values below 1 mean full sharpness.
    pub fn set_acuity(&mut self, acuity: f32) {
        self.acuity = clamp_acuity(acuity);
    }

    /// Record a new surface size. The surface is reallocated lazily by the
    /// next frame; the capture resolution is unaffected.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.dest_geometry = FrameGeometry::new(width, height);
        tracing::debug!("surface resized to {}", self.dest_geometry);
    }

    // ── Frame loop ──

    /// Process and present one frame.
    ///
    /// `now` is the presentation time used for FPS sampling.
    pub fn render_frame(&mut self, now: Instant) -> Result<FrameOutcome, ProcessorError> {
        if self.state != ProcessorState::Running {
            return Ok(FrameOutcome::Inactive);
        }
        let Some(track) = self.track.as_mut() else {
            return Ok(FrameOutcome::Inactive);
        };

        if !track.read_frame(&mut self.capture_buffer)? {
            return Ok(FrameOutcome::NoFrame);
        }

        let lut = self.slot.current();
        self.transformer.transform(
            &self.capture_buffer,
            &mut self.output_buffer,
            self.source_geometry,
            &lut,
            blur_radius(self.acuity),
        )?;

        self.surface.resize(self.dest_geometry);
        let placement = self
            .surface
            .blit_letterboxed(&self.output_buffer, self.source_geometry)?;

        let stats = self.timing.record(now);
        self.sink.present(&self.surface, &stats);
        Ok(FrameOutcome::Presented(placement))
    }
}

impl Drop for FrameProcessor {
    fn drop(&mut self) {
        self.release_track();
    }
}

fn clamp_acuity(acuity: f32) -> f32 {
    if acuity.is_finite() { acuity.max(1.0) } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_acuity() {
        assert_eq!(clamp_acuity(0.5), 1.0);
        assert_eq!(clamp_acuity(f32::INFINITY), 1.0);
        assert_eq!(clamp_acuity(f32::NAN), 1.0);
        assert_eq!(clamp_acuity(2.5), 2.5);
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        struct NoCamera;
        impl CaptureDevice for NoCamera {
            fn query_permission(
                &mut self,
            ) -> futures_util::future::BoxFuture<'_, Result<bool, CaptureError>> {
                Box::pin(async { Err(CaptureError::Unsupported) })
            }
            fn open(
                &mut self,
            ) -> futures_util::future::BoxFuture<'_, Result<Box<dyn CaptureTrack>, CaptureError>>
            {
                Box::pin(async { Err(CaptureError::Unsupported) })
            }
        }
        struct NullSink;
        impl PresentationSink for NullSink {
            fn present(&mut self, _: &SurfaceBuffer, _: &FrameStats) {}
        }

        let result = FrameProcessor::new(
            Box::new(NoCamera),
            Box::new(NullSink),
            Arc::new(crate::source::ModelLutSource),
            ProcessorConfig::default(),
        );
        assert!(matches!(result, Err(ProcessorError::NoRuntime(_))));
    }
}
