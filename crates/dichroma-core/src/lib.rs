//! Dichroma Core: domain layer for live color-vision simulation.
//!
//! This crate contains the color lookup tables, the reference-image LUT
//! builder, the per-frame pixel transform, letterbox presentation math, and
//! the simulation models used to generate reference assets. No async and no
//! I/O beyond decoding bytes that are already in memory.

pub mod builder;
pub mod frame;
pub mod lut;
pub mod mode;
pub mod simulate;
pub mod surface;

// Re-exports for convenience.
pub use builder::{LutBuildError, LutBuilder, LutImage};
pub use frame::{FrameError, FrameGeometry, FrameTransformer};
pub use lut::{ColorLut, LutResolution, PixelLayout};
pub use mode::VisionMode;
pub use simulate::VisionModel;
pub use surface::{Placement, SurfaceBuffer};
