//! Per-frame pixel transform: optional acuity blur, then color remapping.
//!
//! Frames are RGBA, row-major, 4 bytes per pixel. The blur models optical
//! blur ahead of color perception, so it always runs before the LUT.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lut::{ColorLut, PixelLayout};

/// Bytes per pixel of every frame buffer in the pipeline.
pub const BYTES_PER_PIXEL: usize = 4;

/// Width and height of a frame or surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either side is zero.
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, or 0 for an empty geometry.
    pub fn aspect_ratio(self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of an RGBA buffer holding one frame of this geometry.
    pub const fn byte_len(self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Errors raised by frame-level operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("{buffer} buffer holds {actual} bytes, a {geometry} frame needs {expected}")]
    BufferTooSmall {
        buffer: &'static str,
        geometry: FrameGeometry,
        expected: usize,
        actual: usize,
    },
}

fn check_len(
    buffer: &'static str,
    geometry: FrameGeometry,
    actual: usize,
) -> Result<(), FrameError> {
    let expected = geometry.byte_len();
    if actual < expected {
        return Err(FrameError::BufferTooSmall {
            buffer,
            geometry,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Box-blur radius for an acuity degradation factor.
///
/// Acuity 1 (or anything below, or non-finite) means full sharpness.
pub fn blur_radius(acuity: f32) -> usize {
    if !acuity.is_finite() || acuity <= 1.0 {
        return 0;
    }
    (acuity - 1.0).round() as usize
}

/// Reusable frame transform state.
///
/// Holds the blur scratch buffer so steady-state frames allocate nothing.
/// The scratch only grows when a larger resolution arrives.
#[derive(Debug, Default)]
pub struct FrameTransformer {
    scratch: Vec<u8>,
    reallocations: u64,
}

impl FrameTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the scratch buffer for `geometry` ahead of the first frame.
    pub fn prepare(&mut self, geometry: FrameGeometry) {
        let len = geometry.byte_len();
        if self.scratch.len() < len {
            self.scratch.resize(len, 0);
            self.reallocations += 1;
            tracing::debug!("frame scratch grown to {geometry}");
        }
    }

    /// Number of times the scratch buffer has grown.
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    /// Copy `src` into `dst`, blurring by `blur_radius` if non-zero, then
    /// remap colors through `lut`.
    ///
    /// Both buffers must hold at least one RGBA frame of `geometry`; bytes
    /// past that are left alone.
    pub fn transform(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        geometry: FrameGeometry,
        lut: &ColorLut,
        blur_radius: usize,
    ) -> Result<(), FrameError> {
        check_len("source", geometry, src.len())?;
        check_len("destination", geometry, dst.len())?;

        let len = geometry.byte_len();
        let (src, dst) = (&src[..len], &mut dst[..len]);

        if blur_radius == 0 || geometry.is_empty() {
            dst.copy_from_slice(src);
        } else {
            self.prepare(geometry);
            box_blur(src, &mut self.scratch[..len], dst, geometry, blur_radius);
        }

        lut.apply_in_place(dst, PixelLayout::Rgba);
        Ok(())
    }
}

/// Separable box blur of the color channels: rows into `scratch`, then
/// columns into `dst`. Alpha is copied through untouched.
fn box_blur(
    src: &[u8],
    scratch: &mut [u8],
    dst: &mut [u8],
    geometry: FrameGeometry,
    radius: usize,
) {
    let width = geometry.width as usize;
    let height = geometry.height as usize;
    let row_stride = width * BYTES_PER_PIXEL;

    for y in 0..height {
        for c in 0..3 {
            blur_line(src, scratch, y * row_stride + c, BYTES_PER_PIXEL, width, radius);
        }
    }
    for x in 0..width {
        for c in 0..3 {
            blur_line(scratch, dst, x * BYTES_PER_PIXEL + c, row_stride, height, radius);
        }
    }
    for (out, inp) in dst.chunks_exact_mut(BYTES_PER_PIXEL).zip(src.chunks_exact(BYTES_PER_PIXEL)) {
        out[3] = inp[3];
    }
}

/// Sliding-window mean over `len` samples spaced `step` bytes apart.
/// Samples past either end clamp to the edge value.
///
/// The radius saturates at `len - 1`, so a line costs O(len) for any acuity.
fn blur_line(src: &[u8], dst: &mut [u8], start: usize, step: usize, len: usize, radius: usize) {
    let last = len - 1;
    let radius = radius.min(last);
    let sample = |i: usize| u64::from(src[start + i.min(last) * step]);
    let window = 2 * radius as u64 + 1;

    let mut sum = sample(0) * radius as u64 + (0..=radius).map(sample).sum::<u64>();
    for i in 0..len {
        dst[start + i * step] = ((sum + window / 2) / window) as u8;
        // sum always contains the outgoing sample, so this cannot underflow.
        sum = sum + sample(i + radius + 1) - sample(i.saturating_sub(radius));
    }
}
