//! Synthetic camera and a logging presentation sink.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dichroma_core::{FrameGeometry, SurfaceBuffer};
use dichroma_engine::{CaptureDevice, CaptureError, CaptureTrack, FrameStats, PresentationSink};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

/// A camera that is always permitted and streams a moving gradient.
pub struct SyntheticCamera {
    geometry: FrameGeometry,
}

impl SyntheticCamera {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self { geometry }
    }
}

impl CaptureDevice for SyntheticCamera {
    fn query_permission(&mut self) -> BoxFuture<'_, Result<bool, CaptureError>> {
        async { Ok(true) }.boxed()
    }

    fn open(&mut self) -> BoxFuture<'_, Result<Box<dyn CaptureTrack>, CaptureError>> {
        let geometry = self.geometry;
        async move {
            if geometry.is_empty() {
                return Err(CaptureError::NoVideoTrack);
            }
            tracing::info!("synthetic camera opened at {geometry}");
            Ok(Box::new(GradientTrack { geometry, tick: 0 }) as Box<dyn CaptureTrack>)
        }
        .boxed()
    }
}

struct GradientTrack {
    geometry: FrameGeometry,
    tick: u32,
}

impl CaptureTrack for GradientTrack {
    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn read_frame(&mut self, dst: &mut [u8]) -> Result<bool, CaptureError> {
        let width = self.geometry.width.max(1);
        let height = self.geometry.height.max(1);
        let shift = self.tick % 256;
        for (i, px) in dst.chunks_exact_mut(4).enumerate() {
            let x = i as u32 % width;
            let y = i as u32 / width;
            px[0] = ((x * 255 / width + shift) % 256) as u8;
            px[1] = (y * 255 / height) as u8;
            px[2] = ((shift * 3) % 256) as u8;
            px[3] = 255;
        }
        self.tick = self.tick.wrapping_add(1);
        Ok(true)
    }

    fn stop(&mut self) {
        tracing::info!("synthetic camera stopped");
    }
}

/// Logs the FPS readout periodically and counts presented frames.
pub struct LoggingSink {
    presented: Arc<AtomicU64>,
    log_every: u64,
    snapshot: Option<PathBuf>,
}

impl LoggingSink {
    pub fn new(log_every: u64, snapshot: Option<PathBuf>) -> Self {
        Self {
            presented: Arc::new(AtomicU64::new(0)),
            log_every: log_every.max(1),
            snapshot,
        }
    }

    /// Shared count of presented frames.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.presented)
    }

    fn save_snapshot(&self, surface: &SurfaceBuffer) {
        let Some(path) = &self.snapshot else {
            return;
        };
        let geometry = surface.geometry();
        let pixels = surface.pixels().to_vec();
        let Some(image) = image::RgbaImage::from_raw(geometry.width, geometry.height, pixels) else {
            tracing::warn!("surface buffer does not match {geometry}, snapshot skipped");
            return;
        };
        if let Err(e) = image.save(path) {
            tracing::warn!("failed to save snapshot {}: {e}", path.display());
        }
    }
}

impl PresentationSink for LoggingSink {
    fn present(&mut self, surface: &SurfaceBuffer, stats: &FrameStats) {
        let count = self.presented.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.log_every == 0 {
            let p = surface.placement();
            tracing::info!(
                "{stats} | frame {} | {}x{} at ({}, {}) on {}",
                stats.frames,
                p.width,
                p.height,
                p.x,
                p.y,
                surface.geometry()
            );
            self.save_snapshot(surface);
        }
    }
}
