use crate::config::AnimationConfig;
use crate::roster::AgentStatus;
use bevy_ecs::entity::Entity;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A baked clip available on an avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    pub name: String,
    #[serde(default)]
    pub duration: f32,
}

impl ClipInfo {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self { name: name.into(), duration }
    }
}

/// Motion driver for avatars without baked clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProceduralMode {
    Idle,
    Working,
    Waiting,
    Error,
    Static,
}

impl ProceduralMode {
    pub fn from_status(status: AgentStatus) -> Self {
        match status {
            AgentStatus::Idle => ProceduralMode::Idle,
            AgentStatus::Working => ProceduralMode::Working,
            AgentStatus::Waiting | AgentStatus::WaitingPermission => ProceduralMode::Waiting,
            AgentStatus::Error => ProceduralMode::Error,
            AgentStatus::Offline | AgentStatus::Orphaned => ProceduralMode::Static,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProceduralMode::Idle => "idle",
            ProceduralMode::Working => "working",
            ProceduralMode::Waiting => "waiting",
            ProceduralMode::Error => "error",
            ProceduralMode::Static => "static",
        }
    }
}

/// Status → clip names applied to every visual class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationMapping {
    #[serde(default = "AnimationMapping::default_idle")]
    pub idle: String,
    #[serde(default = "AnimationMapping::default_working")]
    pub working: String,
    #[serde(default = "AnimationMapping::default_waiting")]
    pub waiting: String,
    #[serde(default = "AnimationMapping::default_waiting_permission")]
    pub waiting_permission: String,
    #[serde(default = "AnimationMapping::default_error")]
    pub error: String,
    #[serde(default = "AnimationMapping::default_offline")]
    pub offline: String,
    #[serde(default = "AnimationMapping::default_orphaned")]
    pub orphaned: String,
}

impl AnimationMapping {
    fn default_idle() -> String {
        "Idle".to_string()
    }

    fn default_working() -> String {
        "Working".to_string()
    }

    fn default_waiting() -> String {
        "Wave".to_string()
    }

    fn default_waiting_permission() -> String {
        "Yes".to_string()
    }

    fn default_error() -> String {
        "No".to_string()
    }

    fn default_offline() -> String {
        "Death".to_string()
    }

    fn default_orphaned() -> String {
        "Sitting".to_string()
    }

    pub fn clip_for(&self, status: AgentStatus) -> &str {
        match status {
            AgentStatus::Idle => &self.idle,
            AgentStatus::Working => &self.working,
            AgentStatus::Waiting => &self.waiting,
            AgentStatus::WaitingPermission => &self.waiting_permission,
            AgentStatus::Error => &self.error,
            AgentStatus::Offline => &self.offline,
            AgentStatus::Orphaned => &self.orphaned,
        }
    }
}

impl Default for AnimationMapping {
    fn default() -> Self {
        Self {
            idle: Self::default_idle(),
            working: Self::default_working(),
            waiting: Self::default_waiting(),
            waiting_permission: Self::default_waiting_permission(),
            error: Self::default_error(),
            offline: Self::default_offline(),
            orphaned: Self::default_orphaned(),
        }
    }
}

/// Per visual class idle/working clips, used only when the avatar actually has them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassAnimationMapping {
    #[serde(default)]
    pub idle: Option<String>,
    #[serde(default)]
    pub working: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationTarget {
    Clip { name: String, one_shot: bool },
    Procedural(ProceduralMode),
}

impl AnimationTarget {
    pub fn clip_name(&self) -> Option<&str> {
        match self {
            AnimationTarget::Clip { name, .. } => Some(name),
            AnimationTarget::Procedural(_) => None,
        }
    }

    pub fn is_one_shot(&self) -> bool {
        matches!(self, AnimationTarget::Clip { one_shot: true, .. })
    }
}

/// What an entity is currently playing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationBindingState {
    current: Option<AnimationTarget>,
}

impl AnimationBindingState {
    pub fn current(&self) -> Option<&AnimationTarget> {
        self.current.as_ref()
    }

    pub fn current_clip(&self) -> Option<&str> {
        self.current.as_ref().and_then(AnimationTarget::clip_name)
    }

    pub fn is_one_shot(&self) -> bool {
        self.current.as_ref().is_some_and(AnimationTarget::is_one_shot)
    }

    /// Records `target` and reports whether the player has to be told.
    ///
    /// A one-shot already current is left alone so it is not restarted mid-play. A looping
    /// target is replayed whenever it differs from what is current, even if some other clip
    /// already started this frame.
    pub fn transition(&mut self, target: AnimationTarget) -> bool {
        let play = self.current.as_ref() != Some(&target);
        if play {
            self.current = Some(target);
        }
        play
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Plays clips and procedural motion on registered avatars. Implemented by the host renderer.
pub trait AnimationPlayer {
    fn register(&mut self, agent: &str, root: Entity, clips: &[ClipInfo]);
    fn play_clip(&mut self, agent: &str, clip: &str, looped: bool);
    fn set_procedural(&mut self, agent: &str, mode: ProceduralMode);
    fn unregister(&mut self, agent: &str);
}

/// Player that drops every request; used when the host has no animation system.
#[derive(Debug, Default)]
pub struct NullPlayer;

impl AnimationPlayer for NullPlayer {
    fn register(&mut self, _agent: &str, _root: Entity, _clips: &[ClipInfo]) {}
    fn play_clip(&mut self, _agent: &str, _clip: &str, _looped: bool) {}
    fn set_procedural(&mut self, _agent: &str, _mode: ProceduralMode) {}
    fn unregister(&mut self, _agent: &str) {}
}

pub struct AnimationSelector {
    defaults: AnimationMapping,
    classes: HashMap<String, ClassAnimationMapping>,
    one_shot: HashSet<String>,
    walk_clip: String,
}

impl AnimationSelector {
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            defaults: config.defaults.clone(),
            classes: config.classes.clone(),
            one_shot: config.one_shot_clips.iter().cloned().collect(),
            walk_clip: config.walk_clip.clone(),
        }
    }

    pub fn set_idle_animation(&mut self, clip: impl Into<String>) {
        self.defaults.idle = clip.into();
    }

    pub fn set_working_animation(&mut self, clip: impl Into<String>) {
        self.defaults.working = clip.into();
    }

    pub fn defaults(&self) -> &AnimationMapping {
        &self.defaults
    }

    pub fn resolve(&self, status: AgentStatus, visual_class: &str, clips: &[ClipInfo]) -> AnimationTarget {
        let Some(first) = clips.first() else {
            return AnimationTarget::Procedural(ProceduralMode::from_status(status));
        };
        let has = |name: &str| clips.iter().any(|clip| clip.name == name);
        let class = self.classes.get(visual_class);
        let class_clip = class
            .and_then(|mapping| match status {
                AgentStatus::Idle => mapping.idle.as_deref(),
                AgentStatus::Working => mapping.working.as_deref(),
                _ => None,
            })
            .filter(|name| has(name));
        let wanted = class_clip.unwrap_or_else(|| self.defaults.clip_for(status));
        let name = if has(wanted) {
            wanted
        } else {
            class
                .and_then(|mapping| mapping.idle.as_deref())
                .filter(|name| has(name))
                .unwrap_or(first.name.as_str())
        };
        self.clip_target(name)
    }

    /// Clip played while an avatar walks to a new position, if it has one.
    pub fn walk_target(&self, clips: &[ClipInfo]) -> Option<AnimationTarget> {
        clips.iter().any(|clip| clip.name == self.walk_clip).then(|| self.clip_target(&self.walk_clip))
    }

    fn clip_target(&self, name: &str) -> AnimationTarget {
        AnimationTarget::Clip { name: name.to_string(), one_shot: self.one_shot.contains(name) }
    }
}
