use crate::formation::FormationPlan;
use crate::roster::{AgentId, AreaCorner};
use glam::{Vec2, Vec3};
use std::fmt;

/// Domain commands produced from pointer input.
#[derive(Debug, Clone, PartialEq)]
pub enum DeckCommand {
    SelectAgent { id: AgentId, additive: bool },
    OpenAgentDetail { id: AgentId },
    SelectBuilding { id: String },
    OpenBuildingDetail { id: String },
    SelectArea { id: String },
    OpenArea { id: String },
    ClearSelection,
    MoveAgents { plan: FormationPlan },
    SelectionBox { agents: Vec<AgentId>, buildings: Vec<String>, additive: bool },
    DrawAreaStart { point: Vec3 },
    DrawAreaMove { start: Vec3, point: Vec3 },
    DrawAreaEnd { start: Vec3, end: Vec3 },
    ResizeAreaStart { area: String, corner: AreaCorner },
    ResizeAreaMove { area: String, corner: AreaCorner, point: Vec3 },
    ResizeAreaEnd { area: String, corner: AreaCorner },
    BuildingDragStart { id: String, point: Vec3 },
    BuildingDragMove { id: String, point: Vec3 },
    BuildingDragEnd { id: String, point: Vec3 },
    AreaContextMenu { id: String, screen: Vec2 },
    /// Factor > 1 zooms in, anchored at a screen point.
    ZoomCamera { factor: f32, anchor: Vec2 },
    PanCamera { delta: Vec2 },
}

impl DeckCommand {
    pub fn name(&self) -> &'static str {
        match self {
            DeckCommand::SelectAgent { .. } => "SelectAgent",
            DeckCommand::OpenAgentDetail { .. } => "OpenAgentDetail",
            DeckCommand::SelectBuilding { .. } => "SelectBuilding",
            DeckCommand::OpenBuildingDetail { .. } => "OpenBuildingDetail",
            DeckCommand::SelectArea { .. } => "SelectArea",
            DeckCommand::OpenArea { .. } => "OpenArea",
            DeckCommand::ClearSelection => "ClearSelection",
            DeckCommand::MoveAgents { .. } => "MoveAgents",
            DeckCommand::SelectionBox { .. } => "SelectionBox",
            DeckCommand::DrawAreaStart { .. } => "DrawAreaStart",
            DeckCommand::DrawAreaMove { .. } => "DrawAreaMove",
            DeckCommand::DrawAreaEnd { .. } => "DrawAreaEnd",
            DeckCommand::ResizeAreaStart { .. } => "ResizeAreaStart",
            DeckCommand::ResizeAreaMove { .. } => "ResizeAreaMove",
            DeckCommand::ResizeAreaEnd { .. } => "ResizeAreaEnd",
            DeckCommand::BuildingDragStart { .. } => "BuildingDragStart",
            DeckCommand::BuildingDragMove { .. } => "BuildingDragMove",
            DeckCommand::BuildingDragEnd { .. } => "BuildingDragEnd",
            DeckCommand::AreaContextMenu { .. } => "AreaContextMenu",
            DeckCommand::ZoomCamera { .. } => "ZoomCamera",
            DeckCommand::PanCamera { .. } => "PanCamera",
        }
    }
}

impl fmt::Display for DeckCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckCommand::SelectAgent { id, additive } => write!(f, "SelectAgent id={id} additive={additive}"),
            DeckCommand::OpenAgentDetail { id } => write!(f, "OpenAgentDetail id={id}"),
            DeckCommand::SelectBuilding { id } => write!(f, "SelectBuilding id={id}"),
            DeckCommand::OpenBuildingDetail { id } => write!(f, "OpenBuildingDetail id={id}"),
            DeckCommand::SelectArea { id } => write!(f, "SelectArea id={id}"),
            DeckCommand::OpenArea { id } => write!(f, "OpenArea id={id}"),
            DeckCommand::ClearSelection => f.write_str("ClearSelection"),
            DeckCommand::MoveAgents { plan } => {
                write!(f, "MoveAgents")?;
                for (id, dest) in &plan.slots {
                    write!(f, " {id}=({:.2},{:.2},{:.2})", dest.x, dest.y, dest.z)?;
                }
                Ok(())
            }
            DeckCommand::SelectionBox { agents, buildings, additive } => write!(
                f,
                "SelectionBox agents=[{}] buildings=[{}] additive={additive}",
                agents.join(","),
                buildings.join(",")
            ),
            DeckCommand::DrawAreaStart { point } => write!(f, "DrawAreaStart point=({:.2},{:.2})", point.x, point.z),
            DeckCommand::DrawAreaMove { point, .. } => write!(f, "DrawAreaMove point=({:.2},{:.2})", point.x, point.z),
            DeckCommand::DrawAreaEnd { start, end } => write!(
                f,
                "DrawAreaEnd start=({:.2},{:.2}) end=({:.2},{:.2})",
                start.x, start.z, end.x, end.z
            ),
            DeckCommand::ResizeAreaStart { area, corner } => write!(f, "ResizeAreaStart area={area} corner={corner:?}"),
            DeckCommand::ResizeAreaMove { area, corner, point } => write!(
                f,
                "ResizeAreaMove area={area} corner={corner:?} point=({:.2},{:.2})",
                point.x, point.z
            ),
            DeckCommand::ResizeAreaEnd { area, corner } => write!(f, "ResizeAreaEnd area={area} corner={corner:?}"),
            DeckCommand::BuildingDragStart { id, point } => {
                write!(f, "BuildingDragStart id={id} point=({:.2},{:.2})", point.x, point.z)
            }
            DeckCommand::BuildingDragMove { id, point } => {
                write!(f, "BuildingDragMove id={id} point=({:.2},{:.2})", point.x, point.z)
            }
            DeckCommand::BuildingDragEnd { id, point } => {
                write!(f, "BuildingDragEnd id={id} point=({:.2},{:.2})", point.x, point.z)
            }
            DeckCommand::AreaContextMenu { id, screen } => {
                write!(f, "AreaContextMenu id={id} screen=({:.1},{:.1})", screen.x, screen.y)
            }
            DeckCommand::ZoomCamera { factor, anchor } => {
                write!(f, "ZoomCamera factor={factor:.3} anchor=({:.1},{:.1})", anchor.x, anchor.y)
            }
            DeckCommand::PanCamera { delta } => write!(f, "PanCamera delta=({:.1},{:.1})", delta.x, delta.y),
        }
    }
}

/// Handle returned by [`CommandBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Handler = Box<dyn FnMut(&DeckCommand)>;

struct Subscriber {
    id: Subscription,
    once: bool,
    handler: Handler,
}

/// Synchronous fan-out of commands to subscribers, in subscription order.
#[derive(Default)]
pub struct CommandBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
    published: u64,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, handler: F) -> Subscription
    where
        F: FnMut(&DeckCommand) + 'static,
    {
        self.insert(Box::new(handler), false)
    }

    /// Subscribes for the next command only.
    pub fn subscribe_once<F>(&mut self, handler: F) -> Subscription
    where
        F: FnMut(&DeckCommand) + 'static,
    {
        self.insert(Box::new(handler), true)
    }

    fn insert(&mut self, handler: Handler, once: bool) -> Subscription {
        let id = Subscription(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, once, handler });
        id
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|sub| sub.id != subscription);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn publish(&mut self, command: &DeckCommand) {
        self.published += 1;
        for sub in &mut self.subscribers {
            (sub.handler)(command);
        }
        self.subscribers.retain(|sub| !sub.once);
    }
}
