//! Vision-mode catalog: the selectable filters offered to the UI shell.

use serde::{Deserialize, Serialize};

use crate::simulate::VisionModel;

/// One selectable vision mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionMode {
    /// Stable identifier, e.g. `"deuteranopia"`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Grouping label, e.g. `"Red/Green"`.
    pub classification: String,
    #[serde(default)]
    pub summary: String,
    /// Locator of the reference LUT image, relative to the asset root.
    pub uri: String,
    /// Acuity degradation factor; absent means full sharpness.
    #[serde(default)]
    pub acuity_degrade: Option<f32>,
    /// Prevalence in percent, `[male, female]`.
    #[serde(default)]
    pub rates: [f32; 2],
    #[serde(default)]
    pub animal: bool,
    /// Model that can regenerate this mode's table, if any.
    #[serde(default)]
    pub model: Option<VisionModel>,
}

impl VisionMode {
    /// Acuity factor to apply with this mode (1.0 = sharp).
    pub fn acuity(&self) -> f32 {
        self.acuity_degrade.unwrap_or(1.0).max(1.0)
    }
}

fn human(model: VisionModel, classification: &str, summary: &str, rates: [f32; 2]) -> VisionMode {
    VisionMode {
        id: model.id().to_string(),
        name: model.label().to_string(),
        classification: classification.to_string(),
        summary: summary.to_string(),
        uri: format!("LUTs/{}.lut.png", model.id()),
        acuity_degrade: None,
        rates,
        animal: false,
        model: Some(model),
    }
}

fn animal(id: &str, name: &str, acuity: f32) -> VisionMode {
    VisionMode {
        id: id.to_string(),
        name: name.to_string(),
        classification: "Monochromatic".to_string(),
        summary: String::new(),
        uri: format!("LUTs/animals/{id}.lut.png"),
        acuity_degrade: Some(acuity),
        rates: [100.0, 100.0],
        animal: true,
        model: None,
    }
}

/// The built-in catalog, alphabetical with animals last.
pub fn builtin_modes() -> Vec<VisionMode> {
    use VisionModel::*;
    vec![
        human(Achromatomaly, "Monochromatic", "Weak to all colors", [0.0, 0.0]),
        human(
            Achromatopsia,
            "Monochromatic",
            "Monochromatic vision, devoid of working cone cells",
            [0.0, 0.0],
        ),
        human(
            Deuteranomaly,
            "Red/Green",
            "Weakness in M-opsins resulting in limited greens with some affect on reds",
            [5.0, 0.035],
        ),
        human(
            Deuteranopia,
            "Red/Green",
            "Devoid of M-opsins resulting in loss of greens with an affect on reds",
            [1.2, 0.01],
        ),
        human(
            Protanomaly,
            "Red/Green",
            "Weakness in L-opsins resulting in limited reds with an affect on greens",
            [1.3, 0.02],
        ),
        human(
            Protanopia,
            "Red/Green",
            "Devoid of L-opsins resulting in loss of reds with severe limit on greens",
            [1.3, 0.02],
        ),
        human(
            Tritanomaly,
            "Blue/Yellow",
            "Weakness in S-opsins resulting in limited blue recognition and affected yellows",
            [0.0001, 0.0001],
        ),
        human(
            Tritanopia,
            "Blue/Yellow",
            "Devoid of S-opsins resulting in no blues with limited yellows",
            [0.001, 0.03],
        ),
        animal("canine", "Canine (Dog)", 3.0),
        animal("feline", "Feline (Cat)", 2.0),
    ]
}

/// Parse a catalog from a JSON array of modes.
pub fn parse_catalog(json: &str) -> Result<Vec<VisionMode>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Look up a mode by id (case-insensitive).
pub fn find_mode<'a>(modes: &'a [VisionMode], id: &str) -> Option<&'a VisionMode> {
    modes.iter().find(|m| m.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_covers_every_deficiency() {
        let modes = builtin_modes();
        assert_eq!(modes.len(), 10);
        for model in VisionModel::ALL.into_iter().filter(|m| *m != VisionModel::Normal) {
            let mode = find_mode(&modes, model.id()).expect("missing builtin mode");
            assert_eq!(mode.model, Some(model));
            assert_eq!(mode.uri, format!("LUTs/{}.lut.png", model.id()));
        }
    }

    #[test]
    fn test_animal_modes_carry_acuity() {
        let modes = builtin_modes();
        assert_eq!(find_mode(&modes, "canine").unwrap().acuity(), 3.0);
        assert_eq!(find_mode(&modes, "Feline").unwrap().acuity(), 2.0);
        assert_eq!(find_mode(&modes, "protanopia").unwrap().acuity(), 1.0);
    }

    #[test]
    fn test_parse_catalog_applies_defaults() {
        let json = r#"[
            {"id": "owl", "name": "Owl", "classification": "Night", "uri": "LUTs/owl.lut.png",
             "acuity_degrade": 0.5},
            {"id": "protanopia", "name": "Protanopia", "classification": "Red/Green",
             "uri": "p.png", "model": "protanopia", "rates": [1.3, 0.02]}
        ]"#;
        let modes = parse_catalog(json).unwrap();
        assert_eq!(modes.len(), 2);
        assert_eq!(modes[0].summary, "");
        assert!(!modes[0].animal);
        assert_eq!(modes[0].model, None);
        // Acuity never goes below full sharpness.
        assert_eq!(modes[0].acuity(), 1.0);
        assert_eq!(modes[1].model, Some(VisionModel::Protanopia));
    }

    #[test]
    fn test_parse_catalog_rejects_missing_fields() {
        assert!(parse_catalog(r#"[{"id": "x"}]"#).is_err());
    }
}
