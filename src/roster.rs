use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type AgentId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Working,
    Waiting,
    WaitingPermission,
    Error,
    Offline,
    Orphaned,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Working => "working",
            AgentStatus::Waiting => "waiting",
            AgentStatus::WaitingPermission => "waiting_permission",
            AgentStatus::Error => "error",
            AgentStatus::Offline => "offline",
            AgentStatus::Orphaned => "orphaned",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One agent as reported by the authoritative roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    #[serde(default)]
    pub name: String,
    pub position: Vec3,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default = "AgentRecord::default_visual_class")]
    pub visual_class: String,
    /// Key of an on-demand model for this visual class; `None` uses the shared character set.
    #[serde(default)]
    pub custom_model: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

impl AgentRecord {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            position,
            status: AgentStatus::Idle,
            visual_class: Self::default_visual_class(),
            custom_model: None,
            selected: false,
        }
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_visual_class(mut self, class: impl Into<String>) -> Self {
        self.visual_class = class.into();
        self
    }

    pub fn with_custom_model(mut self, key: impl Into<String>) -> Self {
        self.custom_model = Some(key.into());
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    fn default_visual_class() -> String {
        "default".to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    #[serde(default)]
    pub agents: Vec<AgentRecord>,
}

impl RosterSnapshot {
    pub fn new(agents: Vec<AgentRecord>) -> Self {
        Self { agents }
    }

    /// Selected agent ids in roster order.
    pub fn selection(&self) -> Vec<AgentId> {
        self.agents.iter().filter(|agent| agent.selected).map(|agent| agent.id.clone()).collect()
    }
}

/// A static service building, hit-tested as an axis-aligned box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub id: String,
    pub position: Vec3,
    pub half_extents: Vec3,
}

impl BuildingRecord {
    pub fn new(id: impl Into<String>, position: Vec3, half_extents: Vec3) -> Self {
        Self { id: id.into(), position, half_extents }
    }

    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.position - self.half_extents, self.position + self.half_extents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaCorner {
    MinMin,
    MinMax,
    MaxMin,
    MaxMax,
}

impl AreaCorner {
    pub const ALL: [AreaCorner; 4] =
        [AreaCorner::MinMin, AreaCorner::MinMax, AreaCorner::MaxMin, AreaCorner::MaxMax];
}

/// A zone drawn on the ground plane. `min`/`max` are ground (x, z) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub id: String,
    pub min: Vec2,
    pub max: Vec2,
}

impl AreaRecord {
    pub fn new(id: impl Into<String>, a: Vec2, b: Vec2) -> Self {
        Self { id: id.into(), min: a.min(b), max: a.max(b) }
    }

    pub fn contains(&self, ground: Vec2) -> bool {
        ground.x >= self.min.x && ground.x <= self.max.x && ground.y >= self.min.y && ground.y <= self.max.y
    }

    pub fn corner(&self, corner: AreaCorner) -> Vec2 {
        match corner {
            AreaCorner::MinMin => Vec2::new(self.min.x, self.min.y),
            AreaCorner::MinMax => Vec2::new(self.min.x, self.max.y),
            AreaCorner::MaxMin => Vec2::new(self.max.x, self.min.y),
            AreaCorner::MaxMax => Vec2::new(self.max.x, self.max.y),
        }
    }
}

pub fn ground_xz(point: Vec3) -> Vec2 {
    Vec2::new(point.x, point.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_normalizes_corners_and_contains_edges() {
        let area = AreaRecord::new("zone", Vec2::new(4.0, -1.0), Vec2::new(-2.0, 3.0));
        assert_eq!(area.min, Vec2::new(-2.0, -1.0));
        assert_eq!(area.max, Vec2::new(4.0, 3.0));
        assert!(area.contains(Vec2::new(4.0, 3.0)));
        assert!(!area.contains(Vec2::new(4.1, 0.0)));
        assert_eq!(area.corner(AreaCorner::MinMax), Vec2::new(-2.0, 3.0));
    }

    #[test]
    fn status_parses_snake_case() {
        let status: AgentStatus = serde_json::from_str("\"waiting_permission\"").expect("status");
        assert_eq!(status, AgentStatus::WaitingPermission);
    }
}
