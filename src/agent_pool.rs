//! Live avatar entities keyed by agent id.
//!
//! The pool is the only owner of the [`SceneGraph`]. Agents whose assets are not available yet
//! wait in one of two insertion-ordered queues: `pending` for the shared character set and
//! `awaiting_model` for an on-demand custom model. An id is live, pending or awaiting, never
//! more than one of those at a time.

use crate::animation::{
    AnimationBindingState, AnimationPlayer, AnimationSelector, AnimationTarget, ClipInfo,
};
use crate::assets::{status_color, AssetTier, AvatarBlueprint, AvatarFactory, AvatarSource, CustomModel, SharedAssets};
use crate::camera::Ray;
use crate::config::{AnimationConfig, PoolConfig};
use crate::picking::AgentPicker;
use crate::roster::{AgentId, AgentRecord, AgentStatus, RosterSnapshot};
use crate::scene::{NodeRole, SceneGraph, SpawnedSubtree};
use anyhow::{bail, Result};
use bevy_ecs::entity::Entity;
use glam::Vec3;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    /// Shared character assets are still loading.
    Deferred,
    /// Waiting for the agent's custom model.
    AwaitingModel,
    /// The id was already known; its record was replaced.
    Updated,
    /// The factory failed for every available source.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub live: usize,
    pub pending: usize,
    pub awaiting_model: usize,
    pub created: u64,
    pub disposed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltFrom {
    Shared(AssetTier),
    Custom,
}

#[derive(Debug)]
enum ModelState {
    Loading,
    Loaded(Rc<CustomModel>),
    Failed,
}

struct AgentEntity {
    record: AgentRecord,
    subtree: SpawnedSubtree,
    built_from: BuiltFrom,
    clips: Vec<ClipInfo>,
    animation: AnimationBindingState,
    /// Destination of an in-flight interpolation.
    heading_to: Option<Vec3>,
}

impl AgentEntity {
    fn node_with_role(&self, scene: &SceneGraph, role: NodeRole) -> Option<Entity> {
        self.subtree.nodes.iter().copied().find(|&node| scene.role(node) == Some(role))
    }
}

pub struct AgentMeshPool {
    config: PoolConfig,
    scene: SceneGraph,
    factory: Box<dyn AvatarFactory>,
    player: Box<dyn AnimationPlayer>,
    selector: AnimationSelector,
    shared: SharedAssets,
    entities: IndexMap<AgentId, AgentEntity>,
    node_owner: HashMap<Entity, AgentId>,
    pending: IndexMap<AgentId, AgentRecord>,
    awaiting_model: IndexMap<AgentId, AgentRecord>,
    models: HashMap<String, ModelState>,
    model_requests: Vec<String>,
    brightness: f32,
    character_scale: f32,
    created: u64,
    disposed: u64,
}

impl AgentMeshPool {
    pub fn new(
        config: PoolConfig,
        animation: &AnimationConfig,
        factory: Box<dyn AvatarFactory>,
        player: Box<dyn AnimationPlayer>,
    ) -> Self {
        Self {
            brightness: config.brightness,
            character_scale: config.character_scale,
            config,
            scene: SceneGraph::new(),
            factory,
            player,
            selector: AnimationSelector::new(animation),
            shared: SharedAssets::Loading,
            entities: IndexMap::new(),
            node_owner: HashMap::new(),
            pending: IndexMap::new(),
            awaiting_model: IndexMap::new(),
            models: HashMap::new(),
            model_requests: Vec::new(),
            created: 0,
            disposed: 0,
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn shared_assets(&self) -> SharedAssets {
        self.shared
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live: self.entities.len(),
            pending: self.pending.len(),
            awaiting_model: self.awaiting_model.len(),
            created: self.created,
            disposed: self.disposed,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.entities.contains_key(id) || self.pending.contains_key(id) || self.awaiting_model.contains_key(id)
    }

    /// Live ids in creation order.
    pub fn live_ids(&self) -> Vec<AgentId> {
        self.entities.keys().cloned().collect()
    }

    pub fn pending_ids(&self) -> Vec<AgentId> {
        self.pending.keys().cloned().collect()
    }

    pub fn awaiting_ids(&self) -> Vec<AgentId> {
        self.awaiting_model.keys().cloned().collect()
    }

    pub fn record(&self, id: &str) -> Option<&AgentRecord> {
        self.entities
            .get(id)
            .map(|entity| &entity.record)
            .or_else(|| self.pending.get(id))
            .or_else(|| self.awaiting_model.get(id))
    }

    pub fn root(&self, id: &str) -> Option<Entity> {
        self.entities.get(id).map(|entity| entity.subtree.root)
    }

    pub fn nodes(&self, id: &str) -> &[Entity] {
        self.entities.get(id).map_or(&[], |entity| entity.subtree.nodes.as_slice())
    }

    /// Current rendered position, which trails the record while walking.
    pub fn position(&self, id: &str) -> Option<Vec3> {
        self.root(id).and_then(|root| self.scene.translation(root))
    }

    /// Rendered positions of every live agent, for screen-space selection.
    pub fn positions(&self) -> Vec<(AgentId, Vec3)> {
        self.entities
            .iter()
            .filter_map(|(id, entity)| Some((id.clone(), self.scene.translation(entity.subtree.root)?)))
            .collect()
    }

    pub fn is_moving(&self, id: &str) -> bool {
        self.entities.get(id).is_some_and(|entity| entity.heading_to.is_some())
    }

    pub fn tier(&self, id: &str) -> Option<AssetTier> {
        match self.entities.get(id)?.built_from {
            BuiltFrom::Shared(tier) => Some(tier),
            BuiltFrom::Custom => None,
        }
    }

    pub fn is_custom(&self, id: &str) -> bool {
        self.entities.get(id).is_some_and(|entity| entity.built_from == BuiltFrom::Custom)
    }

    pub fn animation_state(&self, id: &str) -> Option<&AnimationBindingState> {
        self.entities.get(id).map(|entity| &entity.animation)
    }

    pub fn role_visible(&self, id: &str, role: NodeRole) -> Option<bool> {
        let entity = self.entities.get(id)?;
        let node = entity.node_with_role(&self.scene, role)?;
        Some(self.scene.is_visible(node))
    }

    /// Owning agent of a scene node, through the side table.
    pub fn owner_of(&self, node: Entity) -> Option<&str> {
        self.node_owner.get(&node).map(String::as_str)
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn character_scale(&self) -> f32 {
        self.character_scale
    }

    /// Custom model keys the host has to fetch; each key is requested once.
    pub fn take_model_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.model_requests)
    }

    pub fn add(&mut self, record: AgentRecord) -> AddOutcome {
        if self.is_known(&record.id) {
            self.update(record, false);
            return AddOutcome::Updated;
        }
        self.admit(record)
    }

    /// Creates `record` now, or queues it until whatever it depends on is available.
    fn admit(&mut self, record: AgentRecord) -> AddOutcome {
        if let Some(key) = record.custom_model.clone() {
            match self.models.get(&key) {
                Some(ModelState::Loaded(model)) => {
                    let model = Rc::clone(model);
                    return self.create(record, Some(model.as_ref()));
                }
                Some(ModelState::Failed) => {}
                Some(ModelState::Loading) => {
                    self.awaiting_model.insert(record.id.clone(), record);
                    return AddOutcome::AwaitingModel;
                }
                None => {
                    debug!(agent = %record.id, model = %key, "requesting custom model");
                    self.models.insert(key.clone(), ModelState::Loading);
                    self.model_requests.push(key);
                    self.awaiting_model.insert(record.id.clone(), record);
                    return AddOutcome::AwaitingModel;
                }
            }
        }
        if !self.shared.is_ready() {
            self.pending.insert(record.id.clone(), record);
            return AddOutcome::Deferred;
        }
        self.create(record, None)
    }

    fn create(&mut self, record: AgentRecord, custom: Option<&CustomModel>) -> AddOutcome {
        let built = match custom {
            Some(model) => match self.factory.build_avatar(&record, AvatarSource::Custom(model)) {
                Ok(avatar) => Ok((avatar, BuiltFrom::Custom)),
                Err(err) => {
                    warn!(agent = %record.id, model = %model.key, "custom avatar failed, using default: {err:#}");
                    self.build_shared(&record)
                }
            },
            None => self.build_shared(&record),
        };
        let (avatar, built_from) = match built {
            Ok(built) => built,
            Err(err) => {
                if !self.shared.is_ready() {
                    self.pending.insert(record.id.clone(), record);
                    return AddOutcome::Deferred;
                }
                warn!(agent = %record.id, "avatar construction failed: {err:#}");
                return AddOutcome::Failed;
            }
        };
        self.install(record, avatar, built_from);
        AddOutcome::Created
    }

    /// Spawns a built avatar and makes it the live entity for its id.
    fn install(&mut self, record: AgentRecord, avatar: AvatarBlueprint, built_from: BuiltFrom) {
        let subtree = self.scene.spawn(&avatar.root);
        self.scene.set_translation(subtree.root, record.position);
        self.scene.set_scale(subtree.root, Vec3::splat(self.character_scale));
        self.scene.apply_brightness(&subtree.nodes, self.brightness);
        for &node in &subtree.nodes {
            self.node_owner.insert(node, record.id.clone());
        }
        self.player.register(&record.id, subtree.root, &avatar.clips);
        debug!(agent = %record.id, class = %record.visual_class, ?built_from, "avatar created");

        let id = record.id.clone();
        let mut entity = AgentEntity {
            record,
            subtree,
            built_from,
            clips: avatar.clips,
            animation: AnimationBindingState::default(),
            heading_to: None,
        };
        sync_decorations(&mut self.scene, &entity, self.brightness);
        animate(&self.selector, self.player.as_mut(), &mut entity);
        self.entities.insert(id, entity);
        self.created += 1;
    }

    fn build_shared(&mut self, record: &AgentRecord) -> Result<(AvatarBlueprint, BuiltFrom)> {
        let Some(tier) = self.shared.tier() else {
            bail!("shared character assets are still loading");
        };
        let avatar = self.factory.build_avatar(record, AvatarSource::Shared(tier))?;
        Ok((avatar, BuiltFrom::Shared(tier)))
    }

    /// Removes an agent wherever it is; returns false for unknown ids.
    pub fn remove(&mut self, id: &str) -> bool {
        let pending = self.pending.shift_remove(id).is_some();
        let awaiting = self.awaiting_model.shift_remove(id).is_some();
        let queued = pending || awaiting;
        match self.entities.shift_remove(id) {
            Some(entity) => {
                self.dispose(entity);
                true
            }
            None => queued,
        }
    }

    fn dispose(&mut self, entity: AgentEntity) {
        for node in &entity.subtree.nodes {
            self.node_owner.remove(node);
        }
        let stats = self.scene.despawn_subtree(entity.subtree.root);
        self.player.unregister(&entity.record.id);
        self.disposed += 1;
        debug!(agent = %entity.record.id, nodes = stats.nodes, materials = stats.materials, "avatar disposed");
    }

    /// Applies a new record. `moving` walks to the new position instead of snapping.
    pub fn update(&mut self, record: AgentRecord, moving: bool) {
        // A record that would be queued again keeps its queue slot.
        let stays_pending = record
            .custom_model
            .as_ref()
            .map_or(true, |key| matches!(self.models.get(key), Some(ModelState::Failed)));
        if let Some(queued) = self.pending.get_mut(&record.id) {
            if stays_pending {
                *queued = record;
                return;
            }
        }
        if let Some(queued) = self.awaiting_model.get_mut(&record.id) {
            if queued.custom_model == record.custom_model {
                *queued = record;
                return;
            }
        }
        let rebuild = match self.entities.get(&record.id) {
            Some(entity) => entity.record.custom_model != record.custom_model,
            None => true,
        };
        if rebuild {
            self.remove(&record.id);
            self.admit(record);
            return;
        }

        let epsilon = self.config.move_epsilon;
        let brightness = self.brightness;
        let Some(entity) = self.entities.get_mut(&record.id) else {
            return;
        };
        let root = entity.subtree.root;
        let current = self.scene.translation(root).unwrap_or(record.position);
        if moving && current.distance(record.position) > epsilon {
            entity.heading_to = Some(record.position);
        } else {
            entity.heading_to = None;
            self.scene.set_translation(root, record.position);
        }
        entity.record = record;
        sync_decorations(&mut self.scene, entity, brightness);
        animate(&self.selector, self.player.as_mut(), entity);
    }

    /// Advances walking avatars by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        let step = self.config.move_speed * dt.max(0.0);
        for entity in self.entities.values_mut() {
            let Some(destination) = entity.heading_to else {
                continue;
            };
            let root = entity.subtree.root;
            let Some(current) = self.scene.translation(root) else {
                continue;
            };
            let remaining = destination - current;
            if remaining.length() <= step.max(self.config.move_epsilon) {
                self.scene.set_translation(root, destination);
                entity.heading_to = None;
                animate(&self.selector, self.player.as_mut(), entity);
            } else {
                self.scene.set_translation(root, current + remaining.normalize() * step);
            }
        }
    }

    /// Disposes everything, live and queued, and rebuilds from `roster`.
    pub fn sync_all(&mut self, roster: &RosterSnapshot) {
        let entities = std::mem::take(&mut self.entities);
        for (_, entity) in entities {
            self.dispose(entity);
        }
        self.pending.clear();
        self.awaiting_model.clear();
        for record in &roster.agents {
            self.add(record.clone());
        }
        info!(agents = roster.agents.len(), live = self.entities.len(), "pool resynced");
    }

    /// Diffs `roster` against what the pool knows: new ids are added, known ones updated
    /// (walking when their position changed), missing ones removed.
    pub fn apply_roster(&mut self, roster: &RosterSnapshot) {
        let wanted: HashSet<&str> = roster.agents.iter().map(|agent| agent.id.as_str()).collect();
        let stale: Vec<AgentId> = self
            .entities
            .keys()
            .chain(self.pending.keys())
            .chain(self.awaiting_model.keys())
            .filter(|id| !wanted.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.remove(&id);
        }
        for record in &roster.agents {
            match self.entities.get(&record.id) {
                Some(entity) => {
                    // A repeated destination must not snap an avatar that is still walking.
                    let moving = entity.heading_to.is_some()
                        || entity.record.position.distance(record.position) > self.config.move_epsilon;
                    self.update(record.clone(), moving);
                }
                None => {
                    self.add(record.clone());
                }
            }
        }
    }

    /// Shared character assets finished loading at `tier`.
    ///
    /// The first readiness drains the pending queue once, in insertion order. An upgrade from
    /// `Basic` to `Full` rebuilds every entity built from the basic set in place.
    pub fn on_character_assets_ready(&mut self, tier: AssetTier) {
        let previous = self.shared;
        if previous.tier().is_some_and(|current| current >= tier) {
            return;
        }
        self.shared = SharedAssets::Ready(tier);

        if !self.pending.is_empty() {
            let queued = std::mem::take(&mut self.pending);
            info!(count = queued.len(), ?tier, "creating deferred agents");
            for (_, record) in queued {
                self.admit(record);
            }
        }

        if previous == SharedAssets::Ready(AssetTier::Basic) && tier == AssetTier::Full {
            let basic: Vec<AgentId> = self
                .entities
                .iter()
                .filter(|(_, entity)| entity.built_from == BuiltFrom::Shared(AssetTier::Basic))
                .map(|(id, _)| id.clone())
                .collect();
            info!(count = basic.len(), "upgrading avatars to the full character set");
            for id in basic {
                self.hot_swap(&id);
            }
        }
    }

    /// Rebuilds one basic entity from the full set. The basic entity stays live if the full
    /// avatar cannot be built.
    fn hot_swap(&mut self, id: &str) {
        let Some((index, _, old)) = self.entities.get_full(id) else {
            return;
        };
        let position = self.scene.translation(old.subtree.root).unwrap_or(old.record.position);
        let walking = old.heading_to.is_some();
        let record = old.record.clone();
        let rebuilt = AgentRecord { position, ..record.clone() };
        let (avatar, built_from) = match self.build_shared(&rebuilt) {
            Ok(built) => built,
            Err(err) => {
                warn!(agent = %id, "full avatar failed, keeping the basic one: {err:#}");
                return;
            }
        };
        if let Some((_, old)) = self.entities.shift_remove_index(index) {
            self.dispose(old);
        }
        self.install(rebuilt, avatar, built_from);
        // Back to the original slot so iteration order is unchanged.
        let last = self.entities.len() - 1;
        self.entities.move_index(last, index);
        if walking {
            // A walking record already holds its destination.
            self.update(record, true);
        }
    }

    /// Delivers a custom model fetch result. Agents that stopped waiting are not revived.
    pub fn resolve_custom_model(&mut self, key: &str, result: Result<CustomModel>) {
        if !matches!(self.models.get(key), Some(ModelState::Loading)) {
            debug!(model = %key, "dropping unrequested model resolution");
            return;
        }
        let model = match result {
            Ok(model) => {
                let model = Rc::new(model);
                self.models.insert(key.to_string(), ModelState::Loaded(Rc::clone(&model)));
                Some(model)
            }
            Err(err) => {
                warn!(model = %key, "custom model failed to load, falling back to default avatar: {err:#}");
                self.models.insert(key.to_string(), ModelState::Failed);
                None
            }
        };
        let waiting: Vec<AgentId> = self
            .awaiting_model
            .iter()
            .filter(|(_, record)| record.custom_model.as_deref() == Some(key))
            .map(|(id, _)| id.clone())
            .collect();
        if waiting.is_empty() {
            debug!(model = %key, "model resolved with no agent waiting for it");
        }
        for id in waiting {
            let Some(record) = self.awaiting_model.shift_remove(&id) else {
                continue;
            };
            match &model {
                Some(model) => {
                    self.create(record, Some(model.as_ref()));
                }
                None if self.shared.is_ready() => {
                    self.create(record, None);
                }
                None => {
                    self.pending.insert(record.id.clone(), record);
                }
            }
        }
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = brightness;
        for entity in self.entities.values() {
            self.scene.apply_brightness(&entity.subtree.nodes, brightness);
        }
    }

    pub fn set_character_scale(&mut self, scale: f32) {
        if !scale.is_finite() || scale <= 0.0 {
            warn!(scale, "ignoring invalid character scale");
            return;
        }
        self.character_scale = scale;
        for entity in self.entities.values() {
            self.scene.set_scale(entity.subtree.root, Vec3::splat(scale));
        }
    }

    pub fn set_idle_animation(&mut self, clip: impl Into<String>) {
        self.selector.set_idle_animation(clip);
        self.reanimate_all();
    }

    pub fn set_working_animation(&mut self, clip: impl Into<String>) {
        self.selector.set_working_animation(clip);
        self.reanimate_all();
    }

    fn reanimate_all(&mut self) {
        for entity in self.entities.values_mut() {
            animate(&self.selector, self.player.as_mut(), entity);
        }
    }
}

impl AgentPicker for AgentMeshPool {
    fn pick_agent(&self, ray: &Ray) -> Option<(AgentId, f32)> {
        let mut best: Option<(Entity, f32)> = None;
        for entity in self.entities.values() {
            if let Some((node, distance)) = self.scene.pick(ray, &entity.subtree.nodes) {
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((node, distance));
                }
            }
        }
        let (node, distance) = best?;
        Some((self.node_owner.get(&node)?.clone(), distance))
    }
}

/// Selection ring follows the selected flag, the alert sprite follows the error status and the
/// status bar is tinted for the current status.
fn sync_decorations(scene: &mut SceneGraph, entity: &AgentEntity, brightness: f32) {
    let selected = entity.record.selected;
    let alert = entity.record.status == AgentStatus::Error;
    for &node in &entity.subtree.nodes {
        match scene.role(node) {
            Some(NodeRole::StatusBar) => {
                scene.set_base_color(node, status_color(entity.record.status), brightness);
            }
            Some(NodeRole::SelectionRing) => {
                scene.set_visible(node, selected);
            }
            Some(NodeRole::Effect) => {
                scene.set_visible(node, alert);
            }
            _ => {}
        }
    }
}

/// Walk clip while an interpolation is in flight, the status clip otherwise.
fn animate(selector: &AnimationSelector, player: &mut dyn AnimationPlayer, entity: &mut AgentEntity) {
    let record = &entity.record;
    let target = entity
        .heading_to
        .and_then(|_| selector.walk_target(&entity.clips))
        .unwrap_or_else(|| selector.resolve(record.status, &record.visual_class, &entity.clips));
    if !entity.animation.transition(target.clone()) {
        return;
    }
    match target {
        AnimationTarget::Clip { name, one_shot } => player.play_clip(&record.id, &name, !one_shot),
        AnimationTarget::Procedural(mode) => player.set_procedural(&record.id, mode),
    }
}
