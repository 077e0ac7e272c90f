//! Dichroma Engine: the live frame processor.
//!
//! Owns the capture lifecycle and the coalescing LUT switch protocol, and
//! runs the per-frame transform/present loop. The camera, the display and the
//! asset store are injected through the [`CaptureDevice`],
//! [`PresentationSink`] and [`LutSource`] traits.

pub mod capture;
pub mod config;
pub mod driver;
pub mod events;
pub mod loader;
pub mod present;
pub mod processor;
pub mod slot;
pub mod source;
pub mod timing;

// Re-exports for convenience.
pub use capture::{CaptureDevice, CaptureError, CaptureTrack};
pub use config::ProcessorConfig;
pub use driver::{ProcessorCommand, ProcessorHandle};
pub use events::{EventBus, ProcessorEvent};
pub use loader::LutLoader;
pub use present::PresentationSink;
pub use processor::{FrameOutcome, FrameProcessor, ProcessorError, ProcessorState};
pub use slot::LutSlot;
pub use source::{LutLocator, LutSource, LutSourceError, ModelLutSource};
pub use timing::{FrameStats, FrameTiming};
