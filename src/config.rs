use crate::animation::{AnimationMapping, ClassAnimationMapping};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Pointer thresholds and timing windows. Touch values are deliberately looser than mouse ones.
#[derive(Debug, Clone, Deserialize)]
pub struct GestureConfig {
    #[serde(default = "GestureConfig::default_mouse_drag_threshold_px")]
    pub mouse_drag_threshold_px: f32,
    #[serde(default = "GestureConfig::default_touch_drag_threshold_px")]
    pub touch_drag_threshold_px: f32,
    #[serde(default = "GestureConfig::default_agent_double_click_ms")]
    pub agent_double_click_ms: u64,
    #[serde(default = "GestureConfig::default_building_double_click_ms")]
    pub building_double_click_ms: u64,
    #[serde(default = "GestureConfig::default_area_double_click_ms")]
    pub area_double_click_ms: u64,
    #[serde(default = "GestureConfig::default_touch_double_tap_ms")]
    pub touch_double_tap_ms: u64,
    #[serde(default = "GestureConfig::default_touch_tap_max_ms")]
    pub touch_tap_max_ms: u64,
    #[serde(default = "GestureConfig::default_long_press_ms")]
    pub long_press_ms: u64,
    #[serde(default = "GestureConfig::default_wheel_zoom_sensitivity")]
    pub wheel_zoom_sensitivity: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PickingConfig {
    #[serde(default = "PickingConfig::default_resize_handle_radius_px")]
    pub resize_handle_radius_px: f32,
    #[serde(default)]
    pub ground_height: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormationConfig {
    #[serde(default = "FormationConfig::default_spacing")]
    pub spacing: f32,
    #[serde(default = "FormationConfig::default_circle_max")]
    pub circle_max: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "PoolConfig::default_character_scale")]
    pub character_scale: f32,
    #[serde(default = "PoolConfig::default_brightness")]
    pub brightness: f32,
    #[serde(default = "PoolConfig::default_move_speed")]
    pub move_speed: f32,
    /// Movement shorter than this is treated as a snap, not an interpolated walk.
    #[serde(default = "PoolConfig::default_move_epsilon")]
    pub move_epsilon: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnimationConfig {
    #[serde(default)]
    pub defaults: AnimationMapping,
    #[serde(default)]
    pub classes: HashMap<String, ClassAnimationMapping>,
    #[serde(default = "AnimationConfig::default_one_shot_clips")]
    pub one_shot_clips: Vec<String>,
    #[serde(default = "AnimationConfig::default_walk_clip")]
    pub walk_clip: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeckConfig {
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub picking: PickingConfig,
    #[serde(default)]
    pub formation: FormationConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

#[derive(Debug, Clone, Default)]
pub struct DeckConfigOverrides {
    pub brightness: Option<f32>,
    pub character_scale: Option<f32>,
}

impl GestureConfig {
    const fn default_mouse_drag_threshold_px() -> f32 {
        5.0
    }

    const fn default_touch_drag_threshold_px() -> f32 {
        12.0
    }

    const fn default_agent_double_click_ms() -> u64 {
        300
    }

    const fn default_building_double_click_ms() -> u64 {
        400
    }

    const fn default_area_double_click_ms() -> u64 {
        400
    }

    const fn default_touch_double_tap_ms() -> u64 {
        450
    }

    const fn default_touch_tap_max_ms() -> u64 {
        300
    }

    const fn default_long_press_ms() -> u64 {
        500
    }

    const fn default_wheel_zoom_sensitivity() -> f32 {
        0.0015
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            mouse_drag_threshold_px: Self::default_mouse_drag_threshold_px(),
            touch_drag_threshold_px: Self::default_touch_drag_threshold_px(),
            agent_double_click_ms: Self::default_agent_double_click_ms(),
            building_double_click_ms: Self::default_building_double_click_ms(),
            area_double_click_ms: Self::default_area_double_click_ms(),
            touch_double_tap_ms: Self::default_touch_double_tap_ms(),
            touch_tap_max_ms: Self::default_touch_tap_max_ms(),
            long_press_ms: Self::default_long_press_ms(),
            wheel_zoom_sensitivity: Self::default_wheel_zoom_sensitivity(),
        }
    }
}

impl PickingConfig {
    const fn default_resize_handle_radius_px() -> f32 {
        12.0
    }
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self { resize_handle_radius_px: Self::default_resize_handle_radius_px(), ground_height: 0.0 }
    }
}

impl FormationConfig {
    const fn default_spacing() -> f32 {
        1.5
    }

    const fn default_circle_max() -> usize {
        6
    }
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self { spacing: Self::default_spacing(), circle_max: Self::default_circle_max() }
    }
}

impl PoolConfig {
    const fn default_character_scale() -> f32 {
        1.0
    }

    const fn default_brightness() -> f32 {
        1.0
    }

    const fn default_move_speed() -> f32 {
        4.0
    }

    const fn default_move_epsilon() -> f32 {
        0.01
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            character_scale: Self::default_character_scale(),
            brightness: Self::default_brightness(),
            move_speed: Self::default_move_speed(),
            move_epsilon: Self::default_move_epsilon(),
        }
    }
}

impl AnimationConfig {
    fn default_one_shot_clips() -> Vec<String> {
        ["Death", "No", "Yes", "ThumbsUp"].iter().map(|name| name.to_string()).collect()
    }

    fn default_walk_clip() -> String {
        "Walking".to_string()
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            defaults: AnimationMapping::default(),
            classes: HashMap::new(),
            one_shot_clips: Self::default_one_shot_clips(),
            walk_clip: Self::default_walk_clip(),
        }
    }
}

impl DeckConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &DeckConfigOverrides) {
        if let Some(brightness) = overrides.brightness {
            self.pool.brightness = brightness;
        }
        if let Some(scale) = overrides.character_scale {
            self.pool.character_scale = scale;
        }
    }
}

impl DeckConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.brightness.is_none() && self.character_scale.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.brightness.is_some() {
            fields.push("brightness");
        }
        if self.character_scale.is_some() {
            fields.push("character_scale");
        }
        fields
    }
}
