//! Test doubles shared by the engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use dichroma_core::{FrameGeometry, LutImage, Placement, SurfaceBuffer};
use dichroma_engine::{
    CaptureDevice, CaptureError, CaptureTrack, FrameProcessor, FrameStats, LutLocator, LutSource,
    LutSourceError, PresentationSink, ProcessorConfig, ProcessorEvent,
};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};

pub const WAIT: Duration = Duration::from_secs(10);

pub fn locator(name: &str) -> LutLocator {
    LutLocator::new(name, format!("LUTs/{}.lut.png", name.to_lowercase()))
}

// ── LUT source ──

/// Serves solid-color reference images, optionally held back until released.
#[derive(Default)]
pub struct GatedSource {
    colors: HashMap<String, Result<[u8; 3], String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl GatedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every color maps to `rgb` for this locator.
    pub fn with_solid(mut self, locator: &LutLocator, rgb: [u8; 3]) -> Self {
        self.colors.insert(locator.uri.clone(), Ok(rgb));
        self
    }

    /// Fetching this locator fails with `message`.
    pub fn with_failure(mut self, locator: &LutLocator, message: &str) -> Self {
        self.colors.insert(locator.uri.clone(), Err(message.to_string()));
        self
    }

    /// Hold fetches of `locator` until the returned gate is notified.
    pub fn gate(&self, locator: &LutLocator) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(locator.uri.clone(), Arc::clone(&gate));
        gate
    }

    /// URIs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl LutSource for GatedSource {
    fn fetch(&self, locator: &LutLocator) -> BoxFuture<'static, Result<LutImage, LutSourceError>> {
        let uri = locator.uri.clone();
        self.calls.lock().push(uri.clone());
        let gate = self.gates.lock().get(&uri).cloned();
        let outcome = self.colors.get(&uri).cloned();

        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            match outcome {
                Some(Ok(rgb)) => Ok(LutImage::solid(rgb)),
                Some(Err(message)) => Err(LutSourceError::Source(message)),
                None => Err(LutSourceError::NotFound(uri)),
            }
        }
        .boxed()
    }
}

// ── Capture ──

#[derive(Default)]
pub struct CaptureCounters {
    pub permission_queries: AtomicUsize,
    pub opens: AtomicUsize,
    pub stops: AtomicUsize,
    pub reads: AtomicUsize,
    pub last_read_len: AtomicUsize,
}

impl CaptureCounters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// A camera that always delivers the same RGBA color.
pub struct MockCamera {
    pub granted: bool,
    pub fail_open: Arc<AtomicBool>,
    pub geometry: FrameGeometry,
    pub color: [u8; 4],
    pub counters: Arc<CaptureCounters>,
}

impl MockCamera {
    pub fn new(granted: bool, geometry: FrameGeometry) -> Self {
        Self {
            granted,
            fail_open: Arc::new(AtomicBool::new(false)),
            geometry,
            color: [200, 40, 90, 255],
            counters: Arc::new(CaptureCounters::default()),
        }
    }
}

impl CaptureDevice for MockCamera {
    fn query_permission(&mut self) -> BoxFuture<'_, Result<bool, CaptureError>> {
        self.counters.permission_queries.fetch_add(1, Ordering::SeqCst);
        let granted = self.granted;
        async move { Ok(granted) }.boxed()
    }

    fn open(&mut self) -> BoxFuture<'_, Result<Box<dyn CaptureTrack>, CaptureError>> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open.load(Ordering::SeqCst) {
            return async { Err(CaptureError::PermissionDenied) }.boxed();
        }

        let track = MockTrack {
            geometry: self.geometry,
            color: self.color,
            counters: Arc::clone(&self.counters),
        };
        async move { Ok(Box::new(track) as Box<dyn CaptureTrack>) }.boxed()
    }
}

struct MockTrack {
    geometry: FrameGeometry,
    color: [u8; 4],
    counters: Arc<CaptureCounters>,
}

impl CaptureTrack for MockTrack {
    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn read_frame(&mut self, dst: &mut [u8]) -> Result<bool, CaptureError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.counters.last_read_len.store(dst.len(), Ordering::SeqCst);
        for px in dst.chunks_exact_mut(4) {
            px.copy_from_slice(&self.color);
        }
        Ok(true)
    }

    fn stop(&mut self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Presentation ──

/// What the sink saw for one presented frame.
#[derive(Debug, Clone, Copy)]
pub struct PresentedFrame {
    pub geometry: FrameGeometry,
    pub placement: Placement,
    /// Pixel at the center of the placement.
    pub center: Option<[u8; 4]>,
    /// Pixel at the surface origin.
    pub corner: Option<[u8; 4]>,
    pub stats: FrameStats,
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub frames: Arc<Mutex<Vec<PresentedFrame>>>,
}

impl RecordingSink {
    pub fn last(&self) -> Option<PresentedFrame> {
        self.frames.lock().last().copied()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().len()
    }
}

impl PresentationSink for RecordingSink {
    fn present(&mut self, surface: &SurfaceBuffer, stats: &FrameStats) {
        let placement = surface.placement();
        self.frames.lock().push(PresentedFrame {
            geometry: surface.geometry(),
            placement,
            center: surface.pixel(
                placement.x + placement.width / 2,
                placement.y + placement.height / 2,
            ),
            corner: surface.pixel(0, 0),
            stats: *stats,
        });
    }
}

// ── Harness ──

pub struct Harness {
    pub processor: FrameProcessor,
    pub events: broadcast::Receiver<ProcessorEvent>,
    pub counters: Arc<CaptureCounters>,
    pub fail_open: Arc<AtomicBool>,
    pub sink: RecordingSink,
}

/// A processor over `camera` and `source`. Must run inside a tokio runtime.
pub fn harness(camera: MockCamera, source: Arc<dyn LutSource>) -> Harness {
    harness_with_config(camera, source, ProcessorConfig::default())
}

pub fn harness_with_config(
    camera: MockCamera,
    source: Arc<dyn LutSource>,
    config: ProcessorConfig,
) -> Harness {
    let counters = Arc::clone(&camera.counters);
    let fail_open = Arc::clone(&camera.fail_open);
    let sink = RecordingSink::default();
    let processor =
        FrameProcessor::new(Box::new(camera), Box::new(sink.clone()), source, config).unwrap();
    let events = processor.subscribe();
    Harness {
        processor,
        events,
        counters,
        fail_open,
        sink,
    }
}

// ── Waiting ──

pub async fn next_event(events: &mut broadcast::Receiver<ProcessorEvent>) -> ProcessorEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for a processor event")
        .expect("event channel closed")
}

/// Poll `condition` until it holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}
