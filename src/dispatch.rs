//! Gesture + target → domain command.
//!
//! Draw and resize interactions capture their pointer from the press onwards: every raw move,
//! up or cancel of that pointer goes to the capture and none of its gestures are dispatched.
//! A building drag captures from the moment the drag is recognised.

use crate::camera::Projector;
use crate::config::{FormationConfig, GestureConfig, PickingConfig};
use crate::events::{CommandBus, DeckCommand, Subscription};
use crate::formation::FormationPlanner;
use crate::gesture::{Gesture, GestureDisambiguator, Gestures};
use crate::input::{Millis, Modifiers, PointerButton, PointerEvent, PointerKey, PointerKind};
use crate::picking::{rect_contains, AgentPicker, HitTestResolver, HitTestScene, Target};
use crate::roster::{AgentId, AreaCorner};
use glam::{Vec2, Vec3};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Everything the dispatcher reads about the world for one event.
#[derive(Clone, Copy)]
pub struct DispatchContext<'a> {
    pub projector: &'a dyn Projector,
    pub agents: &'a dyn AgentPicker,
    /// Rendered agent positions, for box selection.
    pub agent_positions: &'a [(AgentId, Vec3)],
    pub scene: HitTestScene<'a>,
    pub picking: &'a PickingConfig,
    /// Currently selected agents, in selection order.
    pub selection: &'a [AgentId],
}

impl<'a> DispatchContext<'a> {
    pub fn resolver(&self) -> HitTestResolver<'a> {
        HitTestResolver { projector: self.projector, agents: self.agents, scene: self.scene, config: self.picking }
    }

    fn ground_point(&self, screen: Vec2) -> Option<Vec3> {
        self.resolver().ground_point(screen)
    }
}

#[derive(Debug, Clone)]
enum Capture {
    Draw { start: Vec3, last: Vec3 },
    Resize { area: String, corner: AreaCorner },
    BuildingDrag { id: String, last: Vec3 },
}

impl Capture {
    fn consumes_raw(&self) -> bool {
        matches!(self, Capture::Draw { .. } | Capture::Resize { .. })
    }
}

pub struct CommandDispatcher {
    gestures: GestureDisambiguator,
    planner: FormationPlanner,
    bus: CommandBus,
    captures: HashMap<PointerKey, Capture>,
    wheel_sensitivity: f32,
}

impl CommandDispatcher {
    pub fn new(gesture: GestureConfig, formation: FormationConfig) -> Self {
        Self {
            wheel_sensitivity: gesture.wheel_zoom_sensitivity,
            gestures: GestureDisambiguator::new(gesture),
            planner: FormationPlanner::new(formation),
            bus: CommandBus::new(),
            captures: HashMap::new(),
        }
    }

    pub fn gestures(&self) -> &GestureDisambiguator {
        &self.gestures
    }

    pub fn planner(&self) -> &FormationPlanner {
        &self.planner
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut CommandBus {
        &mut self.bus
    }

    pub fn subscribe<F>(&mut self, handler: F) -> Subscription
    where
        F: FnMut(&DeckCommand) + 'static,
    {
        self.bus.subscribe(handler)
    }

    pub fn has_capture(&self, pointer: PointerKey) -> bool {
        self.captures.contains_key(&pointer)
    }

    /// Feeds one pointer event; returns the commands it produced, already published.
    pub fn handle(&mut self, event: &PointerEvent, ctx: &DispatchContext<'_>) -> Vec<DeckCommand> {
        let mut out = Vec::new();
        let captured = event
            .pointer()
            .filter(|pointer| self.captures.get(pointer).is_some_and(Capture::consumes_raw))
            .filter(|_| !matches!(event, PointerEvent::Down { .. }));
        if let Some(pointer) = captured {
            self.on_captured(pointer, event, ctx, &mut out);
        }
        let gestures = self.gestures.handle(event, |screen| ctx.resolver().resolve(screen));
        self.dispatch(gestures, captured, ctx, &mut out);
        self.publish(&out);
        out
    }

    /// Fires due long-press timers.
    pub fn tick(&mut self, now: Millis, ctx: &DispatchContext<'_>) -> Vec<DeckCommand> {
        let mut out = Vec::new();
        let gestures = self.gestures.tick(now);
        self.dispatch(gestures, None, ctx, &mut out);
        self.publish(&out);
        out
    }

    /// Drops every session and capture, e.g. on focus loss. Captures are ended at their last point.
    pub fn cancel_all(&mut self) -> Vec<DeckCommand> {
        let mut out = Vec::new();
        self.gestures.cancel_all();
        let mut captures: Vec<(PointerKey, Capture)> = self.captures.drain().collect();
        captures.sort_by_key(|(key, _)| (key.kind == PointerKind::Touch, key.id));
        for (_, capture) in captures {
            out.push(end_capture(capture, None));
        }
        self.publish(&out);
        out
    }

    fn publish(&mut self, commands: &[DeckCommand]) {
        for command in commands {
            debug!(command = %command, "dispatch");
            self.bus.publish(command);
        }
    }

    fn dispatch(
        &mut self,
        gestures: Gestures,
        captured: Option<PointerKey>,
        ctx: &DispatchContext<'_>,
        out: &mut Vec<DeckCommand>,
    ) {
        for gesture in gestures {
            if self.suppressed(&gesture, captured) {
                continue;
            }
            self.on_gesture(gesture, ctx, out);
        }
    }

    /// A pointer owned by a draw or resize capture only reaches the host through the capture,
    /// including gestures that fire later from `tick`.
    fn suppressed(&self, gesture: &Gesture, captured: Option<PointerKey>) -> bool {
        let Some(pointer) = gesture.pointer() else {
            return false;
        };
        if captured == Some(pointer) {
            return true;
        }
        if matches!(gesture, Gesture::Press { .. } | Gesture::Cancelled { .. }) {
            return false;
        }
        self.captures.get(&pointer).is_some_and(Capture::consumes_raw)
    }

    fn on_captured(
        &mut self,
        pointer: PointerKey,
        event: &PointerEvent,
        ctx: &DispatchContext<'_>,
        out: &mut Vec<DeckCommand>,
    ) {
        match *event {
            PointerEvent::Move { position, .. } => {
                let Some(point) = ctx.ground_point(position) else {
                    return;
                };
                match self.captures.get_mut(&pointer) {
                    Some(Capture::Draw { start, last }) => {
                        *last = point;
                        out.push(DeckCommand::DrawAreaMove { start: *start, point });
                    }
                    Some(Capture::Resize { area, corner }) => {
                        out.push(DeckCommand::ResizeAreaMove { area: area.clone(), corner: *corner, point });
                    }
                    _ => {}
                }
            }
            PointerEvent::Up { position, .. } => {
                if let Some(capture) = self.captures.remove(&pointer) {
                    out.push(end_capture(capture, ctx.ground_point(position)));
                }
            }
            PointerEvent::Cancel { .. } => {
                if let Some(capture) = self.captures.remove(&pointer) {
                    out.push(end_capture(capture, None));
                }
            }
            PointerEvent::Down { .. } | PointerEvent::Wheel { .. } => {}
        }
    }

    fn on_gesture(&mut self, gesture: Gesture, ctx: &DispatchContext<'_>, out: &mut Vec<DeckCommand>) {
        match gesture {
            Gesture::Press { pointer, button: PointerButton::Primary, target, .. } => match target {
                Target::ResizeHandle { area, corner } => {
                    self.captures.insert(pointer, Capture::Resize { area: area.clone(), corner });
                    out.push(DeckCommand::ResizeAreaStart { area, corner });
                }
                Target::DrawPoint(point) => {
                    self.captures.insert(pointer, Capture::Draw { start: point, last: point });
                    out.push(DeckCommand::DrawAreaStart { point });
                }
                _ => {}
            },
            Gesture::Press { .. } => {}
            Gesture::Click { button: PointerButton::Secondary, position, target, .. } => {
                self.on_secondary_click(position, target, ctx, out);
            }
            Gesture::Click { button: PointerButton::Primary, modifiers, target, .. } => {
                on_primary_click(modifiers, target, out);
            }
            Gesture::Click { .. } => {}
            Gesture::DoubleClick { target, .. } => match target {
                Target::Agent(id) => out.push(DeckCommand::OpenAgentDetail { id }),
                Target::Building(id) => out.push(DeckCommand::OpenBuildingDetail { id }),
                Target::Area { id, .. } => out.push(DeckCommand::OpenArea { id }),
                _ => {}
            },
            Gesture::DragStart { pointer, button, origin, position, target, .. } => {
                self.on_drag_start(pointer, button, origin, position, target, ctx, out);
            }
            Gesture::DragMove { pointer, position, delta, .. } => match pointer.kind {
                PointerKind::Touch => out.push(DeckCommand::PanCamera { delta }),
                PointerKind::Mouse => {
                    if let Some(Capture::BuildingDrag { id, last }) = self.captures.get_mut(&pointer) {
                        if let Some(point) = ctx.ground_point(position) {
                            *last = point;
                            out.push(DeckCommand::BuildingDragMove { id: id.clone(), point });
                        }
                    }
                }
            },
            Gesture::DragEnd { pointer, button, origin, position, modifiers, target } => {
                if let Some(capture) = self.captures.remove(&pointer) {
                    out.push(end_capture(capture, ctx.ground_point(position)));
                    return;
                }
                let boxable = matches!(target, Target::Ground(_) | Target::Agent(_) | Target::Area { .. } | Target::None);
                if pointer.kind == PointerKind::Mouse && button == PointerButton::Primary && boxable {
                    out.push(select_box(origin, position, modifiers, ctx));
                }
            }
            Gesture::LongPress { position, .. } => {
                // Re-resolved: the press target may have moved under the finger.
                let target = ctx.resolver().resolve(position);
                if target.is_agent() {
                    trace!("long-press over an agent ignored");
                    return;
                }
                self.move_selection(position, ctx, out);
            }
            Gesture::Pinch { ratio, center } => {
                if self.captures.values().any(Capture::consumes_raw) {
                    return;
                }
                out.push(DeckCommand::ZoomCamera { factor: ratio, anchor: center });
            }
            Gesture::Zoom { delta, position } => {
                let factor = (-delta * self.wheel_sensitivity).exp();
                out.push(DeckCommand::ZoomCamera { factor, anchor: position });
            }
            Gesture::Cancelled { pointer } => {
                if let Some(capture) = self.captures.remove(&pointer) {
                    out.push(end_capture(capture, None));
                }
            }
            Gesture::PinchEnd { .. } => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_drag_start(
        &mut self,
        pointer: PointerKey,
        button: PointerButton,
        origin: Vec2,
        position: Vec2,
        target: Target,
        ctx: &DispatchContext<'_>,
        out: &mut Vec<DeckCommand>,
    ) {
        match pointer.kind {
            PointerKind::Touch => {
                let delta = position - origin;
                if delta != Vec2::ZERO {
                    out.push(DeckCommand::PanCamera { delta });
                }
            }
            PointerKind::Mouse => {
                let Target::Building(id) = target else {
                    return;
                };
                if button != PointerButton::Primary {
                    return;
                }
                if let Some(point) = ctx.ground_point(position) {
                    self.captures.insert(pointer, Capture::BuildingDrag { id: id.clone(), last: point });
                    out.push(DeckCommand::BuildingDragStart { id, point });
                }
            }
        }
    }

    fn on_secondary_click(&self, position: Vec2, target: Target, ctx: &DispatchContext<'_>, out: &mut Vec<DeckCommand>) {
        if !ctx.selection.is_empty() {
            self.move_selection(position, ctx, out);
            return;
        }
        if let Target::Area { id, .. } = target {
            out.push(DeckCommand::AreaContextMenu { id, screen: position });
        }
    }

    fn move_selection(&self, position: Vec2, ctx: &DispatchContext<'_>, out: &mut Vec<DeckCommand>) {
        if ctx.selection.is_empty() {
            return;
        }
        let Some(center) = ctx.ground_point(position) else {
            return;
        };
        let plan = self.planner.plan(center, ctx.selection);
        out.push(DeckCommand::MoveAgents { plan });
    }
}

fn on_primary_click(modifiers: Modifiers, target: Target, out: &mut Vec<DeckCommand>) {
    match target {
        Target::Agent(id) => out.push(DeckCommand::SelectAgent { id, additive: modifiers.additive() }),
        Target::Building(id) => out.push(DeckCommand::SelectBuilding { id }),
        Target::Area { id, .. } => out.push(DeckCommand::SelectArea { id }),
        Target::Ground(_) if modifiers.is_empty() => out.push(DeckCommand::ClearSelection),
        _ => {}
    }
}

/// Agents and buildings whose projected positions fall inside the dragged rectangle.
fn select_box(origin: Vec2, position: Vec2, modifiers: Modifiers, ctx: &DispatchContext<'_>) -> DeckCommand {
    let inside = |world: Vec3| {
        ctx.projector.project_point(world).is_some_and(|screen| rect_contains(origin, position, screen))
    };
    let agents = ctx
        .agent_positions
        .iter()
        .filter(|(_, world)| inside(*world))
        .map(|(id, _)| id.clone())
        .collect();
    let buildings = ctx
        .scene
        .buildings
        .iter()
        .filter(|building| inside(building.position))
        .map(|building| building.id.clone())
        .collect();
    DeckCommand::SelectionBox { agents, buildings, additive: modifiers.additive() }
}

fn end_capture(capture: Capture, point: Option<Vec3>) -> DeckCommand {
    match capture {
        Capture::Draw { start, last } => DeckCommand::DrawAreaEnd { start, end: point.unwrap_or(last) },
        Capture::Resize { area, corner } => DeckCommand::ResizeAreaEnd { area, corner },
        Capture::BuildingDrag { id, last } => DeckCommand::BuildingDragEnd { id, point: point.unwrap_or(last) },
    }
}
