use crate::animation::ClipInfo;
use crate::material::{AdjustableMaterial, MaterialKind, MaterialParams};
use crate::roster::{AgentRecord, AgentStatus};
use crate::scene::{NodeBlueprint, NodeRole};
use anyhow::{bail, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Quality tier of the shared character assets. `Full` supersedes `Basic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetTier {
    Basic,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharedAssets {
    #[default]
    Loading,
    Ready(AssetTier),
}

impl SharedAssets {
    pub fn tier(self) -> Option<AssetTier> {
        match self {
            SharedAssets::Loading => None,
            SharedAssets::Ready(tier) => Some(tier),
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, SharedAssets::Ready(_))
    }
}

/// An on-demand model fetched for one visual class.
#[derive(Debug, Clone)]
pub struct CustomModel {
    pub key: String,
    pub body: NodeBlueprint,
    pub clips: Vec<ClipInfo>,
}

impl CustomModel {
    /// Single box body with the given clips; what hosts without a mesh loader resolve to.
    pub fn primitive(key: impl Into<String>, color: Vec3, clips: Vec<ClipInfo>) -> Self {
        let body = NodeBlueprint::new("custom_body", NodeRole::Body)
            .with_bounds(Vec3::new(-0.6, 0.0, -0.6), Vec3::new(0.6, 2.2, 0.6))
            .with_material(AdjustableMaterial::new(
                MaterialKind::Custom,
                MaterialParams { reflectivity: 0.5, ..MaterialParams::color(color) },
            ));
        Self { key: key.into(), body, clips }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum AvatarSource<'a> {
    Shared(AssetTier),
    Custom(&'a CustomModel),
}

#[derive(Debug, Clone)]
pub struct AvatarBlueprint {
    pub root: NodeBlueprint,
    pub clips: Vec<ClipInfo>,
}

/// Builds avatar subtrees. The pool only calls this once the source is available.
pub trait AvatarFactory {
    fn build_avatar(&mut self, record: &AgentRecord, source: AvatarSource<'_>) -> Result<AvatarBlueprint>;
}

const BODY_HALF_WIDTH: f32 = 0.5;
const BODY_HEIGHT: f32 = 1.8;

/// Box-and-billboard avatars. The basic tier has no clips and runs procedurally.
#[derive(Debug, Clone)]
pub struct PrimitiveAvatarFactory {
    full_clips: Vec<ClipInfo>,
}

impl Default for PrimitiveAvatarFactory {
    fn default() -> Self {
        let full_clips = [
            ("Idle", 2.0),
            ("Working", 1.6),
            ("Walking", 1.0),
            ("Wave", 1.2),
            ("Yes", 1.0),
            ("No", 1.0),
            ("ThumbsUp", 1.1),
            ("Death", 1.5),
            ("Sitting", 2.0),
        ]
        .into_iter()
        .map(|(name, duration)| ClipInfo::new(name, duration))
        .collect();
        Self { full_clips }
    }
}

impl PrimitiveAvatarFactory {
    pub fn with_full_clips(clips: Vec<ClipInfo>) -> Self {
        Self { full_clips: clips }
    }

    fn shared_body(record: &AgentRecord) -> NodeBlueprint {
        NodeBlueprint::new("body", NodeRole::Body)
            .with_bounds(
                Vec3::new(-BODY_HALF_WIDTH, 0.0, -BODY_HALF_WIDTH),
                Vec3::new(BODY_HALF_WIDTH, BODY_HEIGHT, BODY_HALF_WIDTH),
            )
            .with_material(AdjustableMaterial::new(
                MaterialKind::Standard,
                MaterialParams::color(class_color(&record.visual_class)),
            ))
    }
}

impl AvatarFactory for PrimitiveAvatarFactory {
    fn build_avatar(&mut self, record: &AgentRecord, source: AvatarSource<'_>) -> Result<AvatarBlueprint> {
        let (body, clips) = match source {
            AvatarSource::Shared(AssetTier::Basic) => (Self::shared_body(record), Vec::new()),
            AvatarSource::Shared(AssetTier::Full) => (Self::shared_body(record), self.full_clips.clone()),
            AvatarSource::Custom(model) => {
                if model.body.role != NodeRole::Body {
                    bail!("custom model '{}' has no body node", model.key);
                }
                (model.body.clone(), model.clips.clone())
            }
        };
        let root = NodeBlueprint::new(record.id.clone(), NodeRole::Root)
            .with_child(body)
            .with_child(
                NodeBlueprint::new("label", NodeRole::Label)
                    .at(Vec3::new(0.0, BODY_HEIGHT + 0.6, 0.0))
                    .with_material(billboard(Vec3::ONE)),
            )
            .with_child(
                NodeBlueprint::new("status_bar", NodeRole::StatusBar)
                    .at(Vec3::new(0.0, BODY_HEIGHT + 0.3, 0.0))
                    .with_material(billboard(status_color(record.status))),
            )
            .with_child(ring(record.selected))
            .with_child(alert(record.status == AgentStatus::Error));
        Ok(AvatarBlueprint { root, clips })
    }
}

fn billboard(color: Vec3) -> AdjustableMaterial {
    AdjustableMaterial::new(MaterialKind::Billboard, MaterialParams::color(color))
}

fn ring(selected: bool) -> NodeBlueprint {
    let ring = NodeBlueprint::new("selection_ring", NodeRole::SelectionRing)
        .at(Vec3::new(0.0, 0.02, 0.0))
        .with_material(AdjustableMaterial::new(
            MaterialKind::Standard,
            MaterialParams { emissive_intensity: 0.8, ..MaterialParams::color(Vec3::new(0.2, 0.9, 0.4)) },
        ));
    if selected {
        ring
    } else {
        ring.hidden()
    }
}

fn alert(visible: bool) -> NodeBlueprint {
    let sprite = NodeBlueprint::new("alert", NodeRole::Effect)
        .at(Vec3::new(0.0, BODY_HEIGHT + 1.0, 0.0))
        .with_material(billboard(Vec3::new(1.0, 0.2, 0.1)));
    if visible {
        sprite
    } else {
        sprite.hidden()
    }
}

pub fn status_color(status: AgentStatus) -> Vec3 {
    match status {
        AgentStatus::Idle => Vec3::new(0.6, 0.6, 0.6),
        AgentStatus::Working => Vec3::new(0.2, 0.8, 0.3),
        AgentStatus::Waiting | AgentStatus::WaitingPermission => Vec3::new(0.95, 0.75, 0.2),
        AgentStatus::Error => Vec3::new(0.9, 0.2, 0.15),
        AgentStatus::Offline | AgentStatus::Orphaned => Vec3::new(0.3, 0.3, 0.35),
    }
}

/// Stable per-class tint so classes are distinguishable without custom models.
fn class_color(class: &str) -> Vec3 {
    let hash = class.bytes().fold(0x811c_9dc5_u32, |acc, b| (acc ^ b as u32).wrapping_mul(0x0100_0193));
    let channel = |shift: u32| 0.35 + ((hash >> shift) & 0xff) as f32 / 255.0 * 0.6;
    Vec3::new(channel(0), channel(8), channel(16))
}
