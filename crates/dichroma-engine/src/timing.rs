//! Frame timing and FPS sampling.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Timing readout attached to every presented frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// Frames per second from the last sampled delta.
    pub fps: u32,
    /// The last sampled inter-frame delta.
    pub delta: Duration,
    /// Frames presented since capture started.
    pub frames: u64,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.delta.as_secs_f64() * 1000.0;
        write!(f, "{:>4}FPS | Δ{ms:.1}/ms", self.fps)
    }
}

/// Tracks inter-frame deltas and refreshes [`FrameStats`] once per window.
///
/// The readout shows the single delta that closed the window, not an average.
#[derive(Debug)]
pub struct FrameTiming {
    window: Duration,
    last_frame: Option<Instant>,
    accumulated: Duration,
    stats: FrameStats,
}

impl FrameTiming {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_frame: None,
            accumulated: Duration::ZERO,
            stats: FrameStats::default(),
        }
    }

    /// Forget the previous frame so a paused gap is not counted as a delta.
    pub fn reset(&mut self) {
        self.last_frame = None;
        self.accumulated = Duration::ZERO;
        self.stats = FrameStats::default();
    }

    /// Record a frame presented at `now`.
    pub fn record(&mut self, now: Instant) -> FrameStats {
        self.stats.frames += 1;

        if let Some(last) = self.last_frame {
            let delta = now.saturating_duration_since(last);
            self.accumulated += delta;
            if self.accumulated > self.window {
                self.accumulated = Duration::ZERO;
                self.stats.delta = delta;
                self.stats.fps = if delta.is_zero() {
                    0
                } else {
                    (1.0 / delta.as_secs_f64()).floor() as u32
                };
            }
        }

        self.last_frame = Some(now);
        self.stats
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_updates_once_window_elapses() {
        let mut timing = FrameTiming::new(Duration::from_millis(200));
        let start = Instant::now();
        let step = Duration::from_millis(16);

        // 13 frames span 192ms: still inside the window.
        for i in 0..13 {
            timing.record(start + step * i);
        }
        assert_eq!(timing.stats().fps, 0);
        assert_eq!(timing.stats().frames, 13);

        let stats = timing.record(start + step * 13);
        assert_eq!(stats.fps, 62);
        assert_eq!(stats.delta, step);
    }

    #[test]
    fn test_first_frame_has_no_delta() {
        let mut timing = FrameTiming::new(Duration::from_millis(200));
        let stats = timing.record(Instant::now());
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.delta, Duration::ZERO);
    }

    #[test]
    fn test_reset_ignores_gap() {
        let mut timing = FrameTiming::new(Duration::from_millis(200));
        let start = Instant::now();
        timing.record(start);
        timing.reset();

        // Five seconds later; without the reset this would read 0 FPS.
        let stats = timing.record(start + Duration::from_secs(5));
        assert_eq!(stats.fps, 0);
        assert_eq!(stats.delta, Duration::ZERO);
        assert_eq!(stats.frames, 1);
    }

    #[test]
    fn test_display_readout() {
        let stats = FrameStats {
            fps: 60,
            delta: Duration::from_micros(16_700),
            frames: 3,
        };
        assert_eq!(stats.to_string(), "  60FPS | Δ16.7/ms");
    }
}
