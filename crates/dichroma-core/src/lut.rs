//! 24-bit color lookup tables.
//!
//! A [`ColorLut`] maps every 8-bit RGB triple to a replacement triple in
//! O(1). Tables are immutable once built; switching filters means building a
//! new table and publishing it, never editing one in place.
//!
//! # Layouts
//! - **Quantized** (default): 64 levels per channel, 2^18 entries. Each
//!   channel is integer-divided by 4 before indexing, matching the reference
//!   image tile layout in [`crate::builder`].
//! - **Dense**: one entry per 24-bit color, 2^24 entries, indexed by
//!   `(r << 16) | (g << 8) | b`. Four times the lookups per cache line are
//!   lost but no shift is needed.
//! - **Identity**: no table at all; lookups return their input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Bits dropped from each channel by the quantized layout (divide by 4).
pub const QUANTIZE_SHIFT: u32 = 2;

/// Quantized levels per channel.
pub const LEVELS: usize = 256 >> QUANTIZE_SHIFT;

/// Entries in a quantized table (64³).
pub const QUANTIZED_ENTRIES: usize = LEVELS * LEVELS * LEVELS;

/// Entries in a dense table (256³).
pub const DENSE_ENTRIES: usize = 1 << 24;

/// Display name of the identity table.
pub const IDENTITY_NAME: &str = "Normal";

/// Storage layout for a materialized table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LutResolution {
    /// 2^18 entries, 1 MiB. Channels are quantized on lookup.
    #[default]
    Quantized,
    /// 2^24 entries, 64 MiB. Direct indexing.
    Dense,
}

impl LutResolution {
    /// Number of entries a table of this resolution holds.
    pub const fn entries(self) -> usize {
        match self {
            Self::Quantized => QUANTIZED_ENTRIES,
            Self::Dense => DENSE_ENTRIES,
        }
    }
}

impl fmt::Display for LutResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quantized => write!(f, "quantized"),
            Self::Dense => write!(f, "dense"),
        }
    }
}

impl FromStr for LutResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quantized" => Ok(Self::Quantized),
            "dense" => Ok(Self::Dense),
            other => Err(format!("unknown LUT resolution '{other}' (expected quantized or dense)")),
        }
    }
}

/// Interleaved byte layout of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    /// 3 bytes per pixel: R, G, B.
    Rgb,
    /// 4 bytes per pixel: R, G, B, A. The fourth byte is never touched.
    #[default]
    Rgba,
}

impl PixelLayout {
    /// Bytes per pixel.
    pub const fn stride(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// Index into a quantized table.
#[inline(always)]
pub const fn quantized_index(r: u8, g: u8, b: u8) -> usize {
    let r = (r >> QUANTIZE_SHIFT) as usize;
    let g = (g >> QUANTIZE_SHIFT) as usize;
    let b = (b >> QUANTIZE_SHIFT) as usize;
    (r * LEVELS + g) * LEVELS + b
}

/// Index into a dense table.
#[inline(always)]
pub const fn dense_index(r: u8, g: u8, b: u8) -> usize {
    ((r as usize) << 16) | ((g as usize) << 8) | b as usize
}

/// Table entries are padded to 4 bytes so a dense table is one `u32` per color.
type Entry = [u8; 4];

#[derive(Clone)]
enum LutTable {
    Identity,
    Quantized(Box<[Entry]>),
    Dense(Box<[Entry]>),
}

/// An immutable color mapping from every 24-bit input color to an output color.
#[derive(Clone)]
pub struct ColorLut {
    name: String,
    table: LutTable,
}

impl ColorLut {
    /// The pass-through table. Needs no asset and allocates nothing.
    pub fn identity() -> Self {
        Self {
            name: IDENTITY_NAME.to_string(),
            table: LutTable::Identity,
        }
    }

    /// Materialize a table by evaluating `f` for every entry.
    ///
    /// A quantized table evaluates `f` once per bucket, at the bucket's lower
    /// bound (`level × 4`), which is the same sample the reference image
    /// generator uses.
    pub fn from_fn<F>(name: impl Into<String>, resolution: LutResolution, f: F) -> Self
    where
        F: Fn([u8; 3]) -> [u8; 3],
    {
        let mut entries = vec![[0u8; 4]; resolution.entries()].into_boxed_slice();
        match resolution {
            LutResolution::Quantized => {
                for r in 0..LEVELS {
                    for g in 0..LEVELS {
                        for b in 0..LEVELS {
                            let input = [
                                (r << QUANTIZE_SHIFT) as u8,
                                (g << QUANTIZE_SHIFT) as u8,
                                (b << QUANTIZE_SHIFT) as u8,
                            ];
                            let [or, og, ob] = f(input);
                            entries[(r * LEVELS + g) * LEVELS + b] = [or, og, ob, 0];
                        }
                    }
                }
            }
            LutResolution::Dense => {
                for (index, entry) in entries.iter_mut().enumerate() {
                    let input = [(index >> 16) as u8, (index >> 8) as u8, index as u8];
                    let [or, og, ob] = f(input);
                    *entry = [or, og, ob, 0];
                }
            }
        }
        Self::from_entries(name, resolution, entries)
    }

    /// Wrap a quantized sample table, expanding it when `resolution` is dense.
    ///
    /// Dense expansion replicates each quantized sample across the 4×4×4
    /// full-resolution inputs that quantize to it.
    pub(crate) fn from_quantized_samples(
        name: impl Into<String>,
        resolution: LutResolution,
        samples: Box<[[u8; 4]]>,
    ) -> Self {
        debug_assert_eq!(samples.len(), QUANTIZED_ENTRIES);
        match resolution {
            LutResolution::Quantized => Self::from_entries(name, resolution, samples),
            LutResolution::Dense => {
                let mut dense = vec![[0u8; 4]; DENSE_ENTRIES].into_boxed_slice();
                for (index, entry) in dense.iter_mut().enumerate() {
                    let (r, g, b) = ((index >> 16) as u8, (index >> 8) as u8, index as u8);
                    *entry = samples[quantized_index(r, g, b)];
                }
                Self::from_entries(name, resolution, dense)
            }
        }
    }

    fn from_entries(
        name: impl Into<String>,
        resolution: LutResolution,
        entries: Box<[Entry]>,
    ) -> Self {
        let table = match resolution {
            LutResolution::Quantized => LutTable::Quantized(entries),
            LutResolution::Dense => LutTable::Dense(entries),
        };
        Self {
            name: name.into(),
            table,
        }
    }

    /// Label for diagnostics and UI display.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the pass-through table.
    pub fn is_identity(&self) -> bool {
        matches!(self.table, LutTable::Identity)
    }

    /// Storage layout, or `None` for the identity table.
    pub fn resolution(&self) -> Option<LutResolution> {
        match self.table {
            LutTable::Identity => None,
            LutTable::Quantized(_) => Some(LutResolution::Quantized),
            LutTable::Dense(_) => Some(LutResolution::Dense),
        }
    }

    /// Map one color. Total over all 2^24 inputs.
    #[inline(always)]
    pub fn lookup(&self, r: u8, g: u8, b: u8) -> [u8; 3] {
        let entry = match &self.table {
            LutTable::Identity => return [r, g, b],
            LutTable::Quantized(entries) => entries[quantized_index(r, g, b)],
            LutTable::Dense(entries) => entries[dense_index(r, g, b)],
        };
        [entry[0], entry[1], entry[2]]
    }

    /// Remap every complete pixel of `buffer` in place.
    ///
    /// Only the first three bytes of each pixel are rewritten; an alpha byte
    /// is left as-is. Trailing bytes that do not form a whole pixel are
    /// ignored.
    pub fn apply_in_place(&self, buffer: &mut [u8], layout: PixelLayout) {
        if self.is_identity() {
            return;
        }

        match layout {
            PixelLayout::Rgba => {
                let whole = buffer.len() - buffer.len() % 4;
                let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut buffer[..whole]);
                for px in pixels {
                    let [r, g, b] = self.lookup(px[0], px[1], px[2]);
                    px[0] = r;
                    px[1] = g;
                    px[2] = b;
                }
            }
            PixelLayout::Rgb => {
                for px in buffer.chunks_exact_mut(3) {
                    let [r, g, b] = self.lookup(px[0], px[1], px[2]);
                    px[0] = r;
                    px[1] = g;
                    px[2] = b;
                }
            }
        }
    }

    /// Raw table bytes (4 per entry, the fourth always 0), or `None` for identity.
    pub fn table_bytes(&self) -> Option<&[u8]> {
        match &self.table {
            LutTable::Identity => None,
            LutTable::Quantized(entries) | LutTable::Dense(entries) => {
                Some(bytemuck::cast_slice(&entries[..]))
            }
        }
    }
}

impl Default for ColorLut {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for ColorLut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorLut")
            .field("name", &self.name)
            .field("resolution", &self.resolution())
            .finish()
    }
}

impl fmt::Display for ColorLut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
