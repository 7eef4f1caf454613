use crate::camera::Ray;
use crate::material::{self, AdjustableMaterial};
use crate::picking::{ray_hit_obb, world_matrix};
use bevy_ecs::component::Component;
use bevy_ecs::entity::Entity;
use bevy_ecs::world::World;
use glam::{Mat4, Quat, Vec3};

#[derive(Component, Clone, Copy, Debug)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

#[derive(Component, Clone, Copy)]
pub struct Parent(pub Entity);

#[derive(Component, Default)]
pub struct Children(pub Vec<Entity>);

/// Local-space box used for ray picking.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct PickBounds {
    pub min: Vec3,
    pub max: Vec3,
}

#[derive(Component, Default)]
pub struct NodeMaterials(pub Vec<AdjustableMaterial>);

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Root,
    Body,
    Label,
    StatusBar,
    SelectionRing,
    Effect,
}

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visible(pub bool);

#[derive(Component, Clone, Debug)]
pub struct NodeName(pub String);

/// Description of a subtree handed out by avatar factories.
#[derive(Debug, Clone)]
pub struct NodeBlueprint {
    pub name: String,
    pub role: NodeRole,
    pub transform: NodeTransform,
    pub bounds: Option<PickBounds>,
    pub materials: Vec<AdjustableMaterial>,
    pub visible: bool,
    pub children: Vec<NodeBlueprint>,
}

impl NodeBlueprint {
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            role,
            transform: NodeTransform::default(),
            bounds: None,
            materials: Vec::new(),
            visible: true,
            children: Vec::new(),
        }
    }

    pub fn at(mut self, translation: Vec3) -> Self {
        self.transform.translation = translation;
        self
    }

    pub fn with_bounds(mut self, min: Vec3, max: Vec3) -> Self {
        self.bounds = Some(PickBounds { min, max });
        self
    }

    pub fn with_material(mut self, material: AdjustableMaterial) -> Self {
        self.materials.push(material);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_child(mut self, child: NodeBlueprint) -> Self {
        self.children.push(child);
        self
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeBlueprint::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub struct SpawnedSubtree {
    pub root: Entity,
    /// Every node of the subtree, root first.
    pub nodes: Vec<Entity>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisposeStats {
    pub nodes: usize,
    pub materials: usize,
}

/// Scene graph of avatar subtrees. Only the agent pool mutates it.
pub struct SceneGraph {
    world: World,
    live_nodes: usize,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self { world: World::new(), live_nodes: 0 }
    }

    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    pub fn spawn(&mut self, blueprint: &NodeBlueprint) -> SpawnedSubtree {
        let mut nodes = Vec::with_capacity(blueprint.node_count());
        let root = self.spawn_node(blueprint, None, &mut nodes);
        SpawnedSubtree { root, nodes }
    }

    fn spawn_node(&mut self, blueprint: &NodeBlueprint, parent: Option<Entity>, nodes: &mut Vec<Entity>) -> Entity {
        let mut entity = self.world.spawn((
            blueprint.transform,
            blueprint.role,
            Visible(blueprint.visible),
            NodeName(blueprint.name.clone()),
            NodeMaterials(blueprint.materials.clone()),
        ));
        if let Some(parent) = parent {
            entity.insert(Parent(parent));
        }
        if let Some(bounds) = blueprint.bounds {
            entity.insert(bounds);
        }
        let id = entity.id();
        self.live_nodes += 1;
        nodes.push(id);
        let children: Vec<Entity> =
            blueprint.children.iter().map(|child| self.spawn_node(child, Some(id), nodes)).collect();
        if !children.is_empty() {
            self.world.entity_mut(id).insert(Children(children));
        }
        id
    }

    /// Despawns `root` and everything below it, releasing their materials.
    pub fn despawn_subtree(&mut self, root: Entity) -> DisposeStats {
        let mut stats = DisposeStats::default();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if let Some(children) = self.world.get::<Children>(node) {
                stack.extend(children.0.iter().copied());
            }
            stats.materials += self.world.get::<NodeMaterials>(node).map_or(0, |m| m.0.len());
            if self.world.despawn(node) {
                self.live_nodes = self.live_nodes.saturating_sub(1);
                stats.nodes += 1;
            }
        }
        stats
    }

    pub fn contains(&self, node: Entity) -> bool {
        self.world.get::<NodeRole>(node).is_some()
    }

    pub fn translation(&self, node: Entity) -> Option<Vec3> {
        self.world.get::<NodeTransform>(node).map(|tx| tx.translation)
    }

    pub fn set_translation(&mut self, node: Entity, translation: Vec3) -> bool {
        match self.world.get_mut::<NodeTransform>(node) {
            Some(mut tx) => {
                tx.translation = translation;
                true
            }
            None => false,
        }
    }

    pub fn scale(&self, node: Entity) -> Option<Vec3> {
        self.world.get::<NodeTransform>(node).map(|tx| tx.scale)
    }

    pub fn set_scale(&mut self, node: Entity, scale: Vec3) -> bool {
        match self.world.get_mut::<NodeTransform>(node) {
            Some(mut tx) => {
                tx.scale = scale;
                true
            }
            None => false,
        }
    }

    pub fn is_visible(&self, node: Entity) -> bool {
        self.world.get::<Visible>(node).is_some_and(|v| v.0)
    }

    pub fn set_visible(&mut self, node: Entity, visible: bool) -> bool {
        match self.world.get_mut::<Visible>(node) {
            Some(mut v) => {
                v.0 = visible;
                true
            }
            None => false,
        }
    }

    pub fn role(&self, node: Entity) -> Option<NodeRole> {
        self.world.get::<NodeRole>(node).copied()
    }

    pub fn name(&self, node: Entity) -> Option<&str> {
        self.world.get::<NodeName>(node).map(|n| n.0.as_str())
    }

    pub fn materials(&self, node: Entity) -> &[AdjustableMaterial] {
        self.world.get::<NodeMaterials>(node).map_or(&[], |m| m.0.as_slice())
    }

    pub fn apply_brightness(&mut self, nodes: &[Entity], brightness: f32) {
        for &node in nodes {
            if let Some(mut materials) = self.world.get_mut::<NodeMaterials>(node) {
                material::apply_brightness(&mut materials.0, brightness);
            }
        }
    }

    pub fn set_base_color(&mut self, node: Entity, color: Vec3, brightness: f32) {
        if let Some(mut materials) = self.world.get_mut::<NodeMaterials>(node) {
            for material in materials.0.iter_mut() {
                material.set_base_color(color, brightness);
            }
        }
    }

    /// Composed transform of a node, walking its parent chain.
    pub fn world_matrix(&self, node: Entity) -> Option<Mat4> {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(node);
        while let Some(entity) = current {
            let tx = self.world.get::<NodeTransform>(entity)?;
            let local = world_matrix(tx.translation, tx.rotation, tx.scale)?;
            matrix = local * matrix;
            current = self.world.get::<Parent>(entity).map(|p| p.0);
        }
        Some(matrix)
    }

    /// Nearest visible pickable node among `nodes` hit by the ray.
    pub fn pick(&self, ray: &Ray, nodes: &[Entity]) -> Option<(Entity, f32)> {
        let mut best: Option<(Entity, f32)> = None;
        for &node in nodes {
            if !self.is_visible(node) {
                continue;
            }
            let Some(bounds) = self.world.get::<PickBounds>(node) else {
                continue;
            };
            let Some(world) = self.world_matrix(node) else {
                continue;
            };
            if let Some(distance) = ray_hit_obb(ray.origin, ray.dir, &world, bounds.min, bounds.max) {
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((node, distance));
                }
            }
        }
        best
    }
}
