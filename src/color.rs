use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Lab, Mix, Srgb};

use crate::analysis::groups::StudyGroup;
use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize, saturation: f32, lightness: f32) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, saturation, lightness);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Soft red, green and blue for the three study groups, in group order.
const GROUP_COLORS: [Color32; 3] = [
    Color32::from_rgb(229, 153, 153),
    Color32::from_rgb(153, 229, 153),
    Color32::from_rgb(153, 153, 229),
];

pub fn group_color(group: StudyGroup) -> Color32 {
    GROUP_COLORS[group.index()]
}

// ---------------------------------------------------------------------------
// Diverging blue → red map for numeric hues
// ---------------------------------------------------------------------------

const COOL: (f32, f32, f32) = (0.23, 0.30, 0.75);
const NEUTRAL: (f32, f32, f32) = (0.87, 0.87, 0.87);
const WARM: (f32, f32, f32) = (0.71, 0.02, 0.15);

/// Colour at `t ∈ [0, 1]` on a cool-warm scale, mixed in Lab space.
pub fn coolwarm(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let lab = |(r, g, b): (f32, f32, f32)| -> Lab { Srgb::new(r, g, b).into_color() };
    let mixed = if t < 0.5 {
        lab(COOL).mix(lab(NEUTRAL), t * 2.0)
    } else {
        lab(NEUTRAL).mix(lab(WARM), (t - 0.5) * 2.0)
    };
    let rgb: Srgb = mixed.into_color();
    to_color32(rgb)
}

// ---------------------------------------------------------------------------
// Hue mapping: cell value → Color32
// ---------------------------------------------------------------------------

/// Maps the hue column's values to colours: a continuous scale when every
/// value is numeric, distinct colours otherwise.
#[derive(Debug, Clone)]
pub enum HueMap {
    Continuous { min: f64, max: f64 },
    Categorical(BTreeMap<CellValue, Color32>),
}

impl HueMap {
    /// Build a map from the hue values present; `None` if there are none.
    pub fn new<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> Option<Self> {
        let unique: BTreeSet<&CellValue> = values.into_iter().filter(|v| !v.is_missing()).collect();
        if unique.is_empty() {
            return None;
        }

        let numeric: Option<Vec<f64>> = unique.iter().map(|v| v.as_f64()).collect();
        if let Some(nums) = numeric {
            let min = nums.iter().copied().fold(f64::INFINITY, f64::min);
            let max = nums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            return Some(HueMap::Continuous { min, max });
        }

        let palette = generate_palette(unique.len(), 0.75, 0.55);
        Some(HueMap::Categorical(
            unique
                .into_iter()
                .cloned()
                .zip(palette)
                .collect(),
        ))
    }

    /// Look up the colour for a given hue value.
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        match self {
            HueMap::Continuous { min, max } => match value.as_f64() {
                Some(v) if max > min => coolwarm(((v - min) / (max - min)) as f32),
                Some(_) => coolwarm(0.5),
                None => Color32::GRAY,
            },
            HueMap::Categorical(mapping) => {
                mapping.get(value).copied().unwrap_or(Color32::GRAY)
            }
        }
    }

    /// Return the legend entries (value label → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        match self {
            HueMap::Continuous { min, max } => vec![
                (format!("{min}"), coolwarm(0.0)),
                (format!("{max}"), coolwarm(1.0)),
            ],
            HueMap::Categorical(mapping) => mapping
                .iter()
                .map(|(v, c)| (v.to_string(), *c))
                .collect(),
        }
    }
}
