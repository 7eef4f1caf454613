use crate::agent_pool::{AddOutcome, AgentMeshPool};
use crate::animation::{AnimationPlayer, NullPlayer};
use crate::assets::{AssetTier, AvatarFactory, CustomModel, PrimitiveAvatarFactory};
use crate::camera::ViewportCamera;
use crate::config::{DeckConfig, PickingConfig};
use crate::dispatch::{CommandDispatcher, DispatchContext};
use crate::events::{DeckCommand, Subscription};
use crate::input::{Millis, PointerEvent};
use crate::picking::{HitTestScene, Target};
use crate::roster::{AgentId, AgentRecord, AreaRecord, BuildingRecord, RosterSnapshot};
use anyhow::Result;
use glam::{Vec2, Vec3};
use tracing::{debug, info};
use winit::dpi::PhysicalSize;

/// State the dispatcher reads but never writes.
struct DeckWorld {
    camera: ViewportCamera,
    picking: PickingConfig,
    buildings: Vec<BuildingRecord>,
    areas: Vec<AreaRecord>,
    draw_mode: bool,
    resize_armed: Option<String>,
    selection: Vec<AgentId>,
    pool: AgentMeshPool,
}

impl DeckWorld {
    fn context<'a>(&'a self, agent_positions: &'a [(AgentId, Vec3)]) -> DispatchContext<'a> {
        DispatchContext {
            projector: &self.camera,
            agents: &self.pool,
            agent_positions,
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

/// Single entry point for hosts: pointer input in, commands out, roster snapshots in, avatars
/// kept in step.
pub struct CommandDeck {
    world: DeckWorld,
    dispatcher: CommandDispatcher,
}

impl CommandDeck {
    pub fn new(
        config: DeckConfig,
        camera: ViewportCamera,
        factory: Box<dyn AvatarFactory>,
        player: Box<dyn AnimationPlayer>,
    ) -> Self {
        let DeckConfig { gesture, picking, formation, pool, animation } = config;
        Self {
            world: DeckWorld {
                camera,
                picking,
                buildings: Vec::new(),
                areas: Vec::new(),
                draw_mode: false,
                resize_armed: None,
                selection: Vec::new(),
                pool: AgentMeshPool::new(pool, &animation, factory, player),
            },
            dispatcher: CommandDispatcher::new(gesture, formation),
        }
    }

    /// Primitive avatars, no animation player, overview camera.
    pub fn headless(config: DeckConfig, viewport: PhysicalSize<u32>) -> Self {
        Self::new(
            config,
            ViewportCamera::overview(viewport),
            Box::new(PrimitiveAvatarFactory::default()),
            Box::new(NullPlayer),
        )
    }

    pub fn camera(&self) -> &ViewportCamera {
        &self.world.camera
    }

    pub fn camera_mut(&mut self) -> &mut ViewportCamera {
        &mut self.world.camera
    }

    pub fn pool(&self) -> &AgentMeshPool {
        &self.world.pool
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn selection(&self) -> &[AgentId] {
        &self.world.selection
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Vec<DeckCommand> {
        let positions = self.world.pool.positions();
        let ctx = self.world.context(&positions);
        self.dispatcher.handle(event, &ctx)
    }

    /// Per-frame update: walks avatars by `dt` seconds and fires due long-press timers.
    pub fn tick(&mut self, now: Millis, dt: f32) -> Vec<DeckCommand> {
        self.world.pool.tick(dt);
        let positions = self.world.pool.positions();
        let ctx = self.world.context(&positions);
        self.dispatcher.tick(now, &ctx)
    }

    pub fn cancel_all(&mut self) -> Vec<DeckCommand> {
        self.dispatcher.cancel_all()
    }

    /// What lies under a screen point right now.
    pub fn hit_test(&self, screen: Vec2) -> Target {
        let positions = Vec::new();
        self.world.context(&positions).resolver().resolve(screen)
    }

    /// Incremental roster update; the selection follows the roster's selected flags.
    pub fn apply_roster(&mut self, roster: &RosterSnapshot) {
        self.world.selection = roster.selection();
        self.world.pool.apply_roster(roster);
    }

    /// Rebuilds every avatar from scratch.
    pub fn resync(&mut self, roster: &RosterSnapshot) {
        info!(agents = roster.agents.len(), "full resync");
        self.world.selection = roster.selection();
        self.world.pool.sync_all(roster);
    }

    pub fn add_agent(&mut self, record: AgentRecord) -> AddOutcome {
        self.world.pool.add(record)
    }

    pub fn remove_agent(&mut self, id: &str) -> bool {
        self.world.selection.retain(|selected| selected != id);
        self.world.pool.remove(id)
    }

    pub fn update_agent(&mut self, record: AgentRecord, moving: bool) {
        self.world.pool.update(record, moving);
    }

    /// Overrides the roster-derived selection until the next roster snapshot.
    pub fn set_selection(&mut self, selection: Vec<AgentId>) {
        self.world.selection = selection;
    }

    pub fn set_buildings(&mut self, buildings: Vec<BuildingRecord>) {
        self.world.buildings = buildings;
    }

    pub fn set_areas(&mut self, areas: Vec<AreaRecord>) {
        if let Some(armed) = &self.world.resize_armed {
            if !areas.iter().any(|area| &area.id == armed) {
                debug!(area = %armed, "armed area disappeared, disarming resize");
                self.world.resize_armed = None;
            }
        }
        self.world.areas = areas;
    }

    pub fn set_draw_mode(&mut self, enabled: bool) {
        self.world.draw_mode = enabled;
    }

    /// Makes the corner handles of `area` hit-testable; `None` disarms.
    pub fn arm_resize(&mut self, area: Option<String>) {
        self.world.resize_armed = area;
    }

    pub fn on_character_assets_ready(&mut self, tier: AssetTier) {
        self.world.pool.on_character_assets_ready(tier);
    }

    pub fn resolve_custom_model(&mut self, key: &str, result: Result<CustomModel>) {
        self.world.pool.resolve_custom_model(key, result);
    }

    pub fn take_model_requests(&mut self) -> Vec<String> {
        self.world.pool.take_model_requests()
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.world.pool.set_brightness(brightness);
    }

    pub fn set_character_scale(&mut self, scale: f32) {
        self.world.pool.set_character_scale(scale);
    }

    pub fn set_idle_animation(&mut self, clip: impl Into<String>) {
        self.world.pool.set_idle_animation(clip);
    }

    pub fn set_working_animation(&mut self, clip: impl Into<String>) {
        self.world.pool.set_working_animation(clip);
    }

    pub fn subscribe<F>(&mut self, handler: F) -> Subscription
    where
        F: FnMut(&DeckCommand) + 'static,
    {
        self.dispatcher.subscribe(handler)
    }

    pub fn subscribe_once<F>(&mut self, handler: F) -> Subscription
    where
        F: FnMut(&DeckCommand) + 'static,
    {
        self.dispatcher.bus_mut().subscribe_once(handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.dispatcher.bus_mut().unsubscribe(subscription)
    }
}
