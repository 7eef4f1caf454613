#![allow(dead_code)]

use agent_deck::animation::{AnimationPlayer, ClipInfo, ProceduralMode};
use agent_deck::assets::{AssetTier, AvatarBlueprint, AvatarFactory, AvatarSource, PrimitiveAvatarFactory};
use agent_deck::camera::{Projector, Ray};
use agent_deck::config::PickingConfig;
use agent_deck::dispatch::DispatchContext;
use agent_deck::picking::{AgentPicker, HitTestScene};
use agent_deck::roster::{AgentId, AgentRecord, AreaRecord, BuildingRecord};
use bevy_ecs::entity::Entity;
use glam::{Vec2, Vec3};
use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

/// Straight-down camera where one screen pixel is one ground unit: screen (x, y) is ground (x, z).
pub struct TopDown;

impl Projector for TopDown {
    fn screen_ray(&self, screen: Vec2) -> Option<Ray> {
        Some(Ray { origin: Vec3::new(screen.x, 50.0, screen.y), dir: Vec3::NEG_Y })
    }

    fn project_point(&self, point: Vec3) -> Option<Vec2> {
        Some(Vec2::new(point.x, point.z))
    }
}

/// Agents picked as vertical cylinders of radius 0.5.
pub struct StubAgents(pub Vec<(AgentId, Vec3)>);

impl AgentPicker for StubAgents {
    fn pick_agent(&self, ray: &Ray) -> Option<(AgentId, f32)> {
        self.0
            .iter()
            .filter(|(_, pos)| Vec2::new(ray.origin.x - pos.x, ray.origin.z - pos.z).length() <= 0.5)
            .map(|(id, pos)| (id.clone(), ray.origin.y - pos.y))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

pub struct Field {
    pub projector: TopDown,
    pub agents: StubAgents,
    pub buildings: Vec<BuildingRecord>,
    pub areas: Vec<AreaRecord>,
    pub picking: PickingConfig,
    pub selection: Vec<AgentId>,
    pub resize_armed: Option<String>,
    pub draw_mode: bool,
}

impl Field {
    /// Agents `a` at (100, 100) and `b` at (140, 100), building `hq` around (200, 200),
    /// area `zone` spanning (300..400, 300..400).
    pub fn new() -> Self {
        Self {
            projector: TopDown,
            agents: StubAgents(vec![
                ("a".to_string(), Vec3::new(100.0, 0.0, 100.0)),
                ("b".to_string(), Vec3::new(140.0, 0.0, 100.0)),
            ]),
            buildings: vec![BuildingRecord::new("hq", Vec3::new(200.0, 2.0, 200.0), Vec3::splat(5.0))],
            areas: vec![AreaRecord::new("zone", Vec2::new(300.0, 300.0), Vec2::new(400.0, 400.0))],
            picking: PickingConfig::default(),
            selection: Vec::new(),
            resize_armed: None,
            draw_mode: false,
        }
    }

    pub fn ctx(&self) -> DispatchContext<'_> {
        DispatchContext {
            projector: &self.projector,
            agents: &self.agents,
            agent_positions: &self.agents.0,
            scene: HitTestScene {
                buildings: &self.buildings,
                areas: &self.areas,
                resize_armed: self.resize_armed.as_deref(),
                draw_mode: self.draw_mode,
            },
            picking: &self.picking,
            selection: &self.selection,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Register { agent: String, clips: usize },
    Play { agent: String, clip: String, looped: bool },
    Procedural { agent: String, mode: ProceduralMode },
    Unregister { agent: String },
}

/// Animation player that records every call into a shared log.
#[derive(Clone, Default)]
pub struct RecordingPlayer {
    pub log: Rc<RefCell<Vec<PlayerCall>>>,
}

impl RecordingPlayer {
    pub fn calls(&self) -> Vec<PlayerCall> {
        self.log.borrow().clone()
    }

    pub fn plays_for(&self, agent: &str) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|call| match call {
                PlayerCall::Play { agent: a, clip, .. } if a == agent => Some(clip.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl AnimationPlayer for RecordingPlayer {
    fn register(&mut self, agent: &str, _root: Entity, clips: &[ClipInfo]) {
        self.log.borrow_mut().push(PlayerCall::Register { agent: agent.to_string(), clips: clips.len() });
    }

    fn play_clip(&mut self, agent: &str, clip: &str, looped: bool) {
        self.log.borrow_mut().push(PlayerCall::Play { agent: agent.to_string(), clip: clip.to_string(), looped });
    }

    fn set_procedural(&mut self, agent: &str, mode: ProceduralMode) {
        self.log.borrow_mut().push(PlayerCall::Procedural { agent: agent.to_string(), mode });
    }

    fn unregister(&mut self, agent: &str) {
        self.log.borrow_mut().push(PlayerCall::Unregister { agent: agent.to_string() });
    }
}

/// Primitive avatars, with every build request and its source logged.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    inner: Rc<RefCell<PrimitiveAvatarFactory>>,
    pub log: Rc<RefCell<Vec<(String, String)>>>,
}

impl RecordingFactory {
    pub fn builds(&self) -> Vec<(String, String)> {
        self.log.borrow().clone()
    }
}

impl AvatarFactory for RecordingFactory {
    fn build_avatar(&mut self, record: &AgentRecord, source: AvatarSource<'_>) -> Result<AvatarBlueprint> {
        let label = match source {
            AvatarSource::Shared(AssetTier::Basic) => "basic".to_string(),
            AvatarSource::Shared(AssetTier::Full) => "full".to_string(),
            AvatarSource::Custom(model) => format!("custom:{}", model.key),
        };
        self.log.borrow_mut().push((record.id.clone(), label));
        self.inner.borrow_mut().build_avatar(record, source)
    }
}
