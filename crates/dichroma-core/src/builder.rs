//! Reference LUT images and the table builder.
//!
//! A reference image is 512×512 and stores one output color per quantized
//! input color. It is an 8×8 grid of 64×64 tiles: the tile is picked by the
//! quantized blue level, and within a tile x is red and y is green.
//!
//! ```text
//! x = (b mod 8) × 64 + r
//! y = (b div 8) × 64 + g        (r, g, b already divided by 4)
//! ```
//!
//! This mapping is shared with every generated asset; changing it breaks
//! compatibility with existing images.

use crate::lut::{ColorLut, LEVELS, LutResolution, PixelLayout, QUANTIZE_SHIFT, QUANTIZED_ENTRIES};

/// Width and height of a reference image in pixels.
pub const IMAGE_SIZE: u32 = 512;

/// Width and height of one blue-level tile.
pub const TILE_SIZE: u32 = 64;

/// Tiles per row of the reference image.
pub const TILES_PER_ROW: u32 = IMAGE_SIZE / TILE_SIZE;

/// Pixel coordinate holding the output for an 8-bit input color.
#[inline]
pub const fn image_coord(r: u8, g: u8, b: u8) -> (u32, u32) {
    let r = (r >> QUANTIZE_SHIFT) as u32;
    let g = (g >> QUANTIZE_SHIFT) as u32;
    let b = (b >> QUANTIZE_SHIFT) as u32;
    (
        (b % TILES_PER_ROW) * TILE_SIZE + r,
        (b / TILES_PER_ROW) * TILE_SIZE + g,
    )
}

/// Errors raised while turning a reference image into a table.
#[derive(Debug, thiserror::Error)]
pub enum LutBuildError {
    #[error("reference image must be {IMAGE_SIZE}x{IMAGE_SIZE}, got {width}x{height}")]
    DimensionMismatch { width: u32, height: u32 },
    #[error("reference image buffer holds {actual} bytes, expected at least {expected}")]
    BufferTooShort { expected: usize, actual: usize },
    #[error("failed to decode reference image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decoded pixel bytes of a reference image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Byte layout of `pixels`.
    pub layout: PixelLayout,
    /// Interleaved, row-major pixel bytes.
    pub pixels: Vec<u8>,
}

impl LutImage {
    pub fn new(width: u32, height: u32, layout: PixelLayout, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            layout,
            pixels,
        }
    }

    /// A reference-sized image where every pixel is `rgb`.
    pub fn solid(rgb: [u8; 3]) -> Self {
        let count = (IMAGE_SIZE * IMAGE_SIZE) as usize;
        let pixels = std::iter::repeat_n([rgb[0], rgb[1], rgb[2], 255], count)
            .flatten()
            .collect();
        Self::new(IMAGE_SIZE, IMAGE_SIZE, PixelLayout::Rgba, pixels)
    }

    /// Decode an encoded image (PNG or any format the `image` crate reads).
    pub fn decode(bytes: &[u8]) -> Result<Self, LutBuildError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        Ok(rgba.into())
    }

    /// Convert into an `image` buffer for encoding.
    ///
    /// Returns `None` if the byte length does not match the dimensions.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        match self.layout {
            PixelLayout::Rgba => {
                image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            }
            PixelLayout::Rgb => {
                let rgb = image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())?;
                Some(image::DynamicImage::ImageRgb8(rgb).to_rgba8())
            }
        }
    }
}

impl From<image::RgbaImage> for LutImage {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, PixelLayout::Rgba, img.into_raw())
    }
}

impl From<image::RgbImage> for LutImage {
    fn from(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, PixelLayout::Rgb, img.into_raw())
    }
}

/// Builds [`ColorLut`]s from reference images.
#[derive(Debug, Clone, Copy, Default)]
pub struct LutBuilder {
    /// Layout of the tables this builder produces.
    pub resolution: LutResolution,
}

impl LutBuilder {
    pub fn new(resolution: LutResolution) -> Self {
        Self { resolution }
    }

    /// Read every quantized sample out of `image` into a new table.
    ///
    /// The image is validated before anything is allocated, so a malformed
    /// asset never yields a partial table. Building is pure: the same bytes
    /// always produce a bit-identical table.
    pub fn build(&self, name: &str, image: &LutImage) -> Result<ColorLut, LutBuildError> {
        if image.width != IMAGE_SIZE || image.height != IMAGE_SIZE {
            return Err(LutBuildError::DimensionMismatch {
                width: image.width,
                height: image.height,
            });
        }

        let stride = image.layout.stride();
        let expected = (IMAGE_SIZE * IMAGE_SIZE) as usize * stride;
        if image.pixels.len() < expected {
            return Err(LutBuildError::BufferTooShort {
                expected,
                actual: image.pixels.len(),
            });
        }

        let mut samples = vec![[0u8; 4]; QUANTIZED_ENTRIES].into_boxed_slice();
        let tiles = TILES_PER_ROW as usize;
        let tile = TILE_SIZE as usize;
        let row = IMAGE_SIZE as usize;
        for r in 0..LEVELS {
            for g in 0..LEVELS {
                for b in 0..LEVELS {
                    let x = (b % tiles) * tile + r;
                    let y = (b / tiles) * tile + g;
                    let offset = (y * row + x) * stride;
                    let px = &image.pixels[offset..offset + 3];
                    samples[(r * LEVELS + g) * LEVELS + b] = [px[0], px[1], px[2], 0];
                }
            }
        }

        tracing::debug!(
            "built {} LUT '{}' from {:?} reference image",
            self.resolution,
            name,
            image.layout
        );
        Ok(ColorLut::from_quantized_samples(name, self.resolution, samples))
    }
}

/// Render a reference image by evaluating `f` for every quantized color.
///
/// Each bucket is sampled at its lower bound (`level × 4`). Building a table
/// from the result reproduces `f` at those sample points.
pub fn render_reference_image<F>(f: F) -> LutImage
where
    F: Fn([u8; 3]) -> [u8; 3],
{
    let row = IMAGE_SIZE as usize;
    let mut pixels = vec![0u8; row * row * 4];
    for r in 0..LEVELS {
        for g in 0..LEVELS {
            for b in 0..LEVELS {
                let input = [
                    (r << QUANTIZE_SHIFT) as u8,
                    (g << QUANTIZE_SHIFT) as u8,
                    (b << QUANTIZE_SHIFT) as u8,
                ];
                let (x, y) = image_coord(input[0], input[1], input[2]);
                let offset = (y as usize * row + x as usize) * 4;
                let [or, og, ob] = f(input);
                pixels[offset..offset + 4].copy_from_slice(&[or, og, ob, 255]);
            }
        }
    }
    LutImage::new(IMAGE_SIZE, IMAGE_SIZE, PixelLayout::Rgba, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invert(rgb: [u8; 3]) -> [u8; 3] {
        [255 - rgb[0], 255 - rgb[1], 255 - rgb[2]]
    }

    #[test]
    fn test_image_coord_known_positions() {
        assert_eq!(image_coord(0, 0, 0), (0, 0));
        assert_eq!(image_coord(4, 0, 0), (1, 0));
        assert_eq!(image_coord(0, 4, 0), (0, 1));
        // Blue level 7 is the last tile of the first row.
        assert_eq!(image_coord(0, 0, 28), (448, 0));
        // Blue level 8 wraps to the second tile row.
        assert_eq!(image_coord(0, 0, 32), (0, 64));
        assert_eq!(image_coord(255, 255, 255), (511, 511));
    }

    #[test]
    fn test_image_coord_truncates_channels() {
        assert_eq!(image_coord(3, 3, 3), image_coord(0, 0, 0));
        assert_eq!(image_coord(7, 11, 35), image_coord(4, 8, 32));
    }

    #[test]
    fn test_solid_gray_image_maps_everything_to_gray() {
        let lut = LutBuilder::default().build("gray", &LutImage::solid([128, 128, 128])).unwrap();
        for &(r, g, b) in &[(0, 0, 0), (255, 255, 255), (255, 0, 0), (12, 200, 77)] {
            assert_eq!(lut.lookup(r, g, b), [128, 128, 128]);
        }

        let mut frame: Vec<u8> = (0..400).map(|i| (i * 31 % 256) as u8).collect();
        lut.apply_in_place(&mut frame, PixelLayout::Rgba);
        for px in frame.chunks_exact(4) {
            assert_eq!(&px[..3], &[128, 128, 128]);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let image = render_reference_image(|[r, g, b]| [g, b, r]);
        let builder = LutBuilder::default();
        let a = builder.build("a", &image).unwrap();
        let b = builder.build("b", &image).unwrap();
        assert_eq!(a.table_bytes(), b.table_bytes());
    }

    #[test]
    fn test_build_reads_samples_from_tile_coordinates() {
        let lut = LutBuilder::default().build("invert", &render_reference_image(invert)).unwrap();
        assert_eq!(lut.lookup(0, 0, 0), [255, 255, 255]);
        // 7 quantizes to the bucket sampled at 4.
        assert_eq!(lut.lookup(7, 7, 7), [251, 251, 251]);
        assert_eq!(lut.lookup(200, 100, 36), invert([200, 100, 36]));
    }

    #[test]
    fn test_dense_build_replicates_each_sample_across_its_bucket() {
        let image = render_reference_image(invert);
        let quantized = LutBuilder::new(LutResolution::Quantized).build("q", &image).unwrap();
        let dense = LutBuilder::new(LutResolution::Dense).build("d", &image).unwrap();
        assert_eq!(dense.resolution(), Some(LutResolution::Dense));
        for &(r, g, b) in &[(0, 1, 2), (3, 3, 3), (100, 101, 102), (255, 254, 253)] {
            assert_eq!(dense.lookup(r, g, b), quantized.lookup(r, g, b));
        }
    }

    #[test]
    fn test_build_accepts_rgb_layout() {
        let rgba = LutImage::solid([10, 20, 30]);
        let rgb_pixels: Vec<u8> =
            rgba.pixels.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect();
        let image = LutImage::new(IMAGE_SIZE, IMAGE_SIZE, PixelLayout::Rgb, rgb_pixels);
        let lut = LutBuilder::default().build("rgb", &image).unwrap();
        assert_eq!(lut.lookup(99, 99, 99), [10, 20, 30]);
    }

    #[test]
    fn test_build_rejects_wrong_dimensions() {
        let image = LutImage::new(256, 256, PixelLayout::Rgba, vec![0; 256 * 256 * 4]);
        match LutBuilder::default().build("small", &image) {
            Err(LutBuildError::DimensionMismatch { width: 256, height: 256 }) => {}
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_build_rejects_short_buffer() {
        let image = LutImage::new(IMAGE_SIZE, IMAGE_SIZE, PixelLayout::Rgba, vec![0; 1024]);
        match LutBuilder::default().build("short", &image) {
            Err(LutBuildError::BufferTooShort { expected, actual }) => {
                assert_eq!(expected, 512 * 512 * 4);
                assert_eq!(actual, 1024);
            }
            other => panic!("expected BufferTooShort, got {other:?}"),
        }
    }

    #[test]
    fn test_png_encode_decode_preserves_reference_pixels() {
        let image = render_reference_image(invert);
        let mut png = Vec::new();
        image
            .to_rgba_image()
            .unwrap()
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let decoded = LutImage::decode(&png).unwrap();
        assert_eq!(decoded, image);
    }
}
