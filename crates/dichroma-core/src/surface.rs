//! Presentation surface and aspect-preserving placement.
//!
//! Frames are scaled to the surface width and centered vertically. When the
//! scaled height would overflow the surface, the frame is fit to the height
//! and centered horizontally instead, so it is never cropped.

use serde::{Deserialize, Serialize};

use crate::frame::{BYTES_PER_PIXEL, FrameError, FrameGeometry};

/// Opaque black used for the bars around a letterboxed frame.
pub const BAR_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Where a frame lands on the surface, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Compute the aspect-preserving placement of `source` on `dest`.
pub fn letterbox(source: FrameGeometry, dest: FrameGeometry) -> Placement {
    if source.is_empty() || dest.is_empty() {
        return Placement::default();
    }

    let (sw, sh) = (source.width as u64, source.height as u64);
    let (dw, dh) = (dest.width as u64, dest.height as u64);

    let height = dw * sh / sw;
    if height <= dh {
        return Placement {
            x: 0,
            y: ((dh - height) / 2) as u32,
            width: dest.width,
            height: height as u32,
        };
    }

    let width = dh * sw / sh;
    Placement {
        x: ((dw - width) / 2) as u32,
        y: 0,
        width: width as u32,
        height: dest.height,
    }
}

/// An RGBA pixel surface the processed frame is drawn onto.
///
/// The backing buffer is reallocated only when the geometry changes.
#[derive(Debug, Default)]
pub struct SurfaceBuffer {
    geometry: FrameGeometry,
    pixels: Vec<u8>,
    placement: Placement,
}

impl SurfaceBuffer {
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            geometry,
            pixels: vec![0; geometry.byte_len()],
            placement: Placement::default(),
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Placement used by the most recent blit.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Match `geometry`, reallocating only if it differs from the current one.
    pub fn resize(&mut self, geometry: FrameGeometry) {
        if geometry == self.geometry {
            return;
        }
        self.geometry = geometry;
        self.pixels = vec![0; geometry.byte_len()];
        self.placement = Placement::default();
    }

    /// RGBA value at surface pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.geometry.width || y >= self.geometry.height {
            return None;
        }
        let i = (y as usize * self.geometry.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.pixels[i..i + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Draw `frame` letterboxed onto the surface with nearest-neighbour
    /// scaling, filling the bars with [`BAR_COLOR`].
    pub fn blit_letterboxed(
        &mut self,
        frame: &[u8],
        source: FrameGeometry,
    ) -> Result<Placement, FrameError> {
        if frame.len() < source.byte_len() {
            return Err(FrameError::BufferTooSmall {
                buffer: "frame",
                geometry: source,
                expected: source.byte_len(),
                actual: frame.len(),
            });
        }

        let placement = letterbox(source, self.geometry);
        self.placement = placement;

        let src_row = source.width as usize * BYTES_PER_PIXEL;
        let width = self.geometry.width;
        for (i, px) in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            let x = i as u32 % width;
            let y = i as u32 / width;
            if !placement.contains(x, y) {
                px.copy_from_slice(&BAR_COLOR);
                continue;
            }
            let sx = (x - placement.x) as u64 * source.width as u64 / placement.width as u64;
            let sy = (y - placement.y) as u64 * source.height as u64 / placement.height as u64;
            let offset = sy as usize * src_row + sx as usize * BYTES_PER_PIXEL;
            px.copy_from_slice(&frame[offset..offset + BYTES_PER_PIXEL]);
        }

        Ok(placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_wide_source_centers_vertically() {
        let p = letterbox(FrameGeometry::new(640, 480), FrameGeometry::new(800, 800));
        assert_eq!(p, Placement { x: 0, y: 100, width: 800, height: 600 });
    }

    #[test]
    fn test_letterbox_tall_source_fits_height_without_cropping() {
        let p = letterbox(FrameGeometry::new(640, 480), FrameGeometry::new(800, 300));
        assert_eq!(p, Placement { x: 200, y: 0, width: 400, height: 300 });
    }

    #[test]
    fn test_letterbox_same_aspect_fills_surface() {
        let p = letterbox(FrameGeometry::new(320, 240), FrameGeometry::new(640, 480));
        assert_eq!(p, Placement { x: 0, y: 0, width: 640, height: 480 });
    }

    #[test]
    fn test_letterbox_empty_geometry_is_empty() {
        assert!(letterbox(FrameGeometry::new(0, 480), FrameGeometry::new(10, 10)).is_empty());
        assert!(letterbox(FrameGeometry::new(10, 10), FrameGeometry::new(10, 0)).is_empty());
    }

    #[test]
    fn test_blit_scales_and_fills_bars() {
        // 2x1 source (red, blue) onto a 4x4 surface: 4x2 image, bars above and below.
        let frame = [255, 0, 0, 255, 0, 0, 255, 255];
        let mut surface = SurfaceBuffer::new(FrameGeometry::new(4, 4));
        let placement = surface.blit_letterboxed(&frame, FrameGeometry::new(2, 1)).unwrap();

        assert_eq!(placement, Placement { x: 0, y: 1, width: 4, height: 2 });
        assert_eq!(surface.pixel(0, 0), Some(BAR_COLOR));
        assert_eq!(surface.pixel(3, 3), Some(BAR_COLOR));
        assert_eq!(surface.pixel(0, 1), Some([255, 0, 0, 255]));
        assert_eq!(surface.pixel(1, 2), Some([255, 0, 0, 255]));
        assert_eq!(surface.pixel(2, 1), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(3, 2), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(4, 0), None);
    }

    #[test]
    fn test_resize_to_same_geometry_keeps_buffer() {
        let mut surface = SurfaceBuffer::new(FrameGeometry::new(8, 8));
        let ptr = surface.pixels().as_ptr();
        surface.resize(FrameGeometry::new(8, 8));
        assert_eq!(surface.pixels().as_ptr(), ptr);

        surface.resize(FrameGeometry::new(4, 2));
        assert_eq!(surface.pixels().len(), 32);
    }

    #[test]
    fn test_blit_rejects_short_frame() {
        let mut surface = SurfaceBuffer::new(FrameGeometry::new(4, 4));
        assert!(surface.blit_letterboxed(&[0; 4], FrameGeometry::new(2, 2)).is_err());
    }
}
