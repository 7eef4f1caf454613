use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Custom (user supplied) models are authored brighter than the built-in set, so they are
/// dimmed and brightened along a steeper curve.
const CUSTOM_CURVE_EXPONENT: f32 = 1.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialParams {
    pub color: Vec3,
    #[serde(default)]
    pub emissive: Vec3,
    #[serde(default)]
    pub emissive_intensity: f32,
    /// Environment reflection strength; metalness-like properties scale with it.
    #[serde(default)]
    pub reflectivity: f32,
    #[serde(default = "MaterialParams::default_opacity")]
    pub opacity: f32,
}

impl MaterialParams {
    pub fn color(color: Vec3) -> Self {
        Self { color, ..Self::default() }
    }

    fn default_opacity() -> f32 {
        1.0
    }

    pub fn approx_eq(&self, other: &MaterialParams, epsilon: f32) -> bool {
        self.color.abs_diff_eq(other.color, epsilon)
            && self.emissive.abs_diff_eq(other.emissive, epsilon)
            && (self.emissive_intensity - other.emissive_intensity).abs() <= epsilon
            && (self.reflectivity - other.reflectivity).abs() <= epsilon
            && (self.opacity - other.opacity).abs() <= epsilon
    }
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            emissive: Vec3::ZERO,
            emissive_intensity: 0.0,
            reflectivity: 0.0,
            opacity: Self::default_opacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Built-in character and prop materials.
    #[default]
    Standard,
    /// Materials that came with an on-demand custom model.
    Custom,
    /// Flat screen-facing elements (labels, status bars); only opacity is adjusted.
    Billboard,
}

/// A material whose live values are always derived from the values it was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustableMaterial {
    kind: MaterialKind,
    base: MaterialParams,
    live: MaterialParams,
}

impl AdjustableMaterial {
    pub fn new(kind: MaterialKind, base: MaterialParams) -> Self {
        Self { kind, base, live: base }
    }

    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    pub fn base(&self) -> &MaterialParams {
        &self.base
    }

    pub fn live(&self) -> &MaterialParams {
        &self.live
    }

    /// Replaces the base colour and re-derives the live values at `brightness`.
    pub fn set_base_color(&mut self, color: Vec3, brightness: f32) {
        self.base.color = color;
        self.apply_brightness(brightness);
    }

    pub fn apply_brightness(&mut self, brightness: f32) {
        self.live = adjusted(self.kind, &self.base, brightness);
    }
}

pub fn adjusted(kind: MaterialKind, base: &MaterialParams, brightness: f32) -> MaterialParams {
    let brightness = if brightness.is_finite() { brightness.max(0.0) } else { 1.0 };
    let mut out = *base;
    match kind {
        MaterialKind::Standard => {
            out.color = base.color * brightness;
            out.emissive_intensity = base.emissive_intensity * brightness;
        }
        MaterialKind::Custom => {
            let factor = brightness.powf(CUSTOM_CURVE_EXPONENT);
            out.color = base.color * factor;
            out.emissive_intensity = base.emissive_intensity * factor;
            out.reflectivity = base.reflectivity * factor;
        }
        MaterialKind::Billboard => {
            out.opacity = (base.opacity * brightness).clamp(0.0, 1.0);
        }
    }
    out
}

pub fn apply_brightness(materials: &mut [AdjustableMaterial], brightness: f32) {
    for material in materials {
        material.apply_brightness(brightness);
    }
}
