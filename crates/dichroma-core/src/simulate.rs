//! Color-vision-deficiency models used to generate reference LUTs.
//!
//! Dichromacy is simulated by projecting each color along its confusion line
//! (through the deficiency's copunctal point in CIE uv) onto the gamut line
//! the dichromat can still perceive, keeping luminance. Out-of-gamut results
//! are pulled toward the neutral of equal luminance.
//!
//! Anomalous trichromacy is a fixed blend of the dichromat result with the
//! original color. Achromatopsia is Rec. 601 luma.
//!
//! These tables are approximations for visualization, not colorimetry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::builder::{LutImage, render_reference_image};
use crate::lut::{ColorLut, LutResolution};

const GAMMA: f64 = 2.2;

/// D65-ish white point used for the neutral-gray pull.
const WHITE_X: f64 = 0.312713;
const WHITE_Y: f64 = 0.329016;
const WHITE_Z: f64 = 0.358271;

/// Weight of the simulated color in an anomalous blend (original weighs 1).
const ANOMALY_WEIGHT: f64 = 1.75;

const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.430574, 0.341550, 0.178325],
    [0.222015, 0.706655, 0.071330],
    [0.020183, 0.129553, 0.939180],
];

const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.063218, -1.393325, -0.475802],
    [-0.969243, 1.875966, 0.041555],
    [0.067871, -0.228834, 1.069251],
];

/// Copunctal point and perceivable gamut line of one dichromacy.
struct ConfusionModel {
    /// Copunctal point u.
    cpu: f64,
    /// Copunctal point v.
    cpv: f64,
    /// Gamut line slope.
    am: f64,
    /// Gamut line intercept.
    ayi: f64,
}

const PROTAN: ConfusionModel = ConfusionModel {
    cpu: 0.735,
    cpv: 0.265,
    am: 1.273463,
    ayi: -0.073894,
};
const DEUTAN: ConfusionModel = ConfusionModel {
    cpu: 1.14,
    cpv: -0.14,
    am: 0.968437,
    ayi: 0.003331,
};
const TRITAN: ConfusionModel = ConfusionModel {
    cpu: 0.171,
    cpv: -0.003,
    am: 0.062921,
    ayi: 0.292119,
};

/// A simulated color vision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionModel {
    Normal,
    Protanopia,
    Protanomaly,
    Deuteranopia,
    Deuteranomaly,
    Tritanopia,
    Tritanomaly,
    Achromatopsia,
    Achromatomaly,
}

impl VisionModel {
    pub const ALL: [Self; 9] = [
        Self::Normal,
        Self::Protanopia,
        Self::Protanomaly,
        Self::Deuteranopia,
        Self::Deuteranomaly,
        Self::Tritanopia,
        Self::Tritanomaly,
        Self::Achromatopsia,
        Self::Achromatomaly,
    ];

    /// Stable lowercase identifier, also the reference asset's file stem.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Protanopia => "protanopia",
            Self::Protanomaly => "protanomaly",
            Self::Deuteranopia => "deuteranopia",
            Self::Deuteranomaly => "deuteranomaly",
            Self::Tritanopia => "tritanopia",
            Self::Tritanomaly => "tritanomaly",
            Self::Achromatopsia => "achromatopsia",
            Self::Achromatomaly => "achromatomaly",
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Protanopia => "Protanopia",
            Self::Protanomaly => "Protanomaly",
            Self::Deuteranopia => "Deuteranopia",
            Self::Deuteranomaly => "Deuteranomaly",
            Self::Tritanopia => "Tritanopia",
            Self::Tritanomaly => "Tritanomaly",
            Self::Achromatopsia => "Achromatopsia",
            Self::Achromatomaly => "Achromatomaly",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id().eq_ignore_ascii_case(id))
    }

    /// Weakened (anomalous) rather than absent perception.
    pub const fn is_anomalous(self) -> bool {
        matches!(
            self,
            Self::Protanomaly | Self::Deuteranomaly | Self::Tritanomaly | Self::Achromatomaly
        )
    }

    /// Simulate how `rgb` is perceived.
    pub fn simulate(self, rgb: [u8; 3]) -> [u8; 3] {
        let simulated = match self {
            Self::Normal => return rgb,
            Self::Protanopia | Self::Protanomaly => dichromat(rgb, &PROTAN),
            Self::Deuteranopia | Self::Deuteranomaly => dichromat(rgb, &DEUTAN),
            Self::Tritanopia | Self::Tritanomaly => dichromat(rgb, &TRITAN),
            Self::Achromatopsia | Self::Achromatomaly => monochrome(rgb),
        };

        if self.is_anomalous() {
            anomalize(rgb, simulated)
        } else {
            simulated.map(to_byte)
        }
    }

    /// Build a table for this model directly, without a reference image.
    pub fn to_lut(self, resolution: LutResolution) -> ColorLut {
        if self == Self::Normal {
            return ColorLut::identity();
        }
        ColorLut::from_fn(self.label(), resolution, |rgb| self.simulate(rgb))
    }

    /// Render this model's 512×512 reference image.
    pub fn reference_image(self) -> LutImage {
        render_reference_image(|rgb| self.simulate(rgb))
    }
}

impl fmt::Display for VisionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn mul(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Dichromat projection. Returns channels in `0.0..=255.0`.
fn dichromat(rgb: [u8; 3], model: &ConfusionModel) -> [f64; 3] {
    let linear = rgb.map(|c| (c as f64 / 255.0).powf(GAMMA));
    let [x, y, z] = mul(&RGB_TO_XYZ, linear);

    let sum = x + y + z;
    let (u, v) = if sum != 0.0 { (x / sum, y / sum) } else { (0.0, 0.0) };

    // Confusion line through the copunctal point and this color.
    let slope = (model.cpv - v) / (model.cpu - u);
    let intercept = v - u * slope;

    // Where it meets the dichromat's gamut line.
    let du = (model.ayi - intercept) / (slope - model.am);
    let dv = slope * du + intercept;

    let sim_xyz = [du * y / dv, y, (1.0 - (du + dv)) * y / dv];
    let sim = mul(&XYZ_TO_RGB, sim_xyz);

    // Offset from the simulated color to the neutral of equal luminance.
    let neutral_x = WHITE_X * y / WHITE_Y;
    let neutral_z = WHITE_Z * y / WHITE_Y;
    let diff = mul(&XYZ_TO_RGB, [neutral_x - sim_xyz[0], 0.0, neutral_z - sim_xyz[2]]);

    let shift = (0..3)
        .map(|c| {
            if diff[c] == 0.0 {
                return 0.0;
            }
            let target = if sim[c] < 0.0 { 0.0 } else { 1.0 };
            (target - sim[c]) / diff[c]
        })
        .filter(|a| (0.0..=1.0).contains(a))
        .fold(0.0, f64::max);

    [0, 1, 2].map(|c| encode(sim[c] + shift * diff[c]))
}

/// Inverse gamma, clamped, scaled to `0.0..=255.0`.
fn encode(linear: f64) -> f64 {
    if linear.is_nan() || linear <= 0.0 {
        0.0
    } else if linear >= 1.0 {
        255.0
    } else {
        255.0 * linear.powf(1.0 / GAMMA)
    }
}

fn monochrome(rgb: [u8; 3]) -> [f64; 3] {
    let luma = (rgb[0] as f64 * 0.299 + rgb[1] as f64 * 0.587 + rgb[2] as f64 * 0.114).round();
    [luma; 3]
}

fn anomalize(original: [u8; 3], simulated: [f64; 3]) -> [u8; 3] {
    [0, 1, 2].map(|c| {
        to_byte((ANOMALY_WEIGHT * simulated[c] + original[c] as f64) / (ANOMALY_WEIGHT + 1.0))
    })
}

fn to_byte(v: f64) -> u8 {
    if v.is_finite() { v.round().clamp(0.0, 255.0) as u8 } else { 0 }
}
