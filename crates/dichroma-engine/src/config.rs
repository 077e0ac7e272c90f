//! Processor configuration.

use std::time::Duration;

use dichroma_core::{FrameGeometry, LutResolution};
use serde::{Deserialize, Serialize};

/// Default presentation rate.
const DEFAULT_FPS: u32 = 60;
/// Default capacity of the event channel.
const DEFAULT_EVENT_CAPACITY: usize = 64;
/// Default FPS sampling window.
const DEFAULT_FPS_WINDOW: Duration = Duration::from_millis(200);
/// Surface size before the host reports one.
const DEFAULT_SURFACE: FrameGeometry = FrameGeometry::new(320, 240);

/// Runtime configuration for a [`FrameProcessor`](crate::FrameProcessor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Table resolution for built LUTs.
    pub resolution: LutResolution,
    /// Interval between frame ticks of the driver loop.
    pub frame_interval: Duration,
    /// Buffered events per subscriber before the oldest are dropped.
    pub event_capacity: usize,
    /// Acuity factor applied before any mode is selected.
    pub initial_acuity: f32,
    /// How often the FPS readout refreshes.
    pub fps_window: Duration,
    /// Destination surface until the first resize.
    pub initial_surface: FrameGeometry,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            resolution: LutResolution::default(),
            frame_interval: frame_interval(DEFAULT_FPS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            initial_acuity: 1.0,
            fps_window: DEFAULT_FPS_WINDOW,
            initial_surface: DEFAULT_SURFACE,
        }
    }
}

impl ProcessorConfig {
    /// Defaults overridden by `DICHROMA_LUT_RESOLUTION` and `DICHROMA_FPS`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    /// Unparseable values are logged and ignored.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup("DICHROMA_LUT_RESOLUTION") {
            match value.parse() {
                Ok(resolution) => config.resolution = resolution,
                Err(e) => tracing::warn!("ignoring DICHROMA_LUT_RESOLUTION: {e}"),
            }
        }

        if let Some(value) = lookup("DICHROMA_FPS") {
            match value.trim().parse::<u32>() {
                Ok(fps) if fps > 0 => config.frame_interval = frame_interval(fps),
                _ => tracing::warn!("ignoring DICHROMA_FPS={value:?}, expected a positive integer"),
            }
        }

        config
    }
}

/// Tick interval for `fps` frames per second.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}
