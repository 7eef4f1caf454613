use crate::camera::{Projector, Ray};
use crate::config::PickingConfig;
use crate::roster::{ground_xz, AgentId, AreaCorner, AreaRecord, BuildingRecord};
use glam::{Mat4, Quat, Vec2, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    ResizeHandle { area: String, corner: AreaCorner },
    DrawPoint(Vec3),
    Building(String),
    Agent(AgentId),
    Area { id: String, point: Vec3 },
    Ground(Vec3),
    None,
}

/// Click-memory slot a target pairs in. Ground and empty targets never pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetCategory {
    Agent,
    Building,
    Area,
}

impl Target {
    pub fn pairing_key(&self) -> Option<(TargetCategory, &str)> {
        match self {
            Target::Agent(id) => Some((TargetCategory::Agent, id.as_str())),
            Target::Building(id) => Some((TargetCategory::Building, id.as_str())),
            Target::Area { id, .. } => Some((TargetCategory::Area, id.as_str())),
            _ => None,
        }
    }

    pub fn is_agent(&self) -> bool {
        matches!(self, Target::Agent(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Target::ResizeHandle { .. } => "resize_handle",
            Target::DrawPoint(_) => "draw_point",
            Target::Building(_) => "building",
            Target::Agent(_) => "agent",
            Target::Area { .. } => "area",
            Target::Ground(_) => "ground",
            Target::None => "none",
        }
    }
}

/// Ray queries against live avatars. Implemented by the agent pool.
pub trait AgentPicker {
    /// Nearest agent hit along the ray and its distance.
    fn pick_agent(&self, ray: &Ray) -> Option<(AgentId, f32)>;
}

/// Domain state the resolver reads; everything here is owned by collaborators.
#[derive(Clone, Copy)]
pub struct HitTestScene<'a> {
    pub buildings: &'a [BuildingRecord],
    pub areas: &'a [AreaRecord],
    /// Area whose corner handles are live, if a resize interaction is armed.
    pub resize_armed: Option<&'a str>,
    pub draw_mode: bool,
}

pub struct HitTestResolver<'a> {
    pub projector: &'a dyn Projector,
    pub agents: &'a dyn AgentPicker,
    pub scene: HitTestScene<'a>,
    pub config: &'a PickingConfig,
}

impl<'a> HitTestResolver<'a> {
    pub fn resolve(&self, screen: Vec2) -> Target {
        if let Some((area, corner)) = self.resize_handle_at(screen) {
            return Target::ResizeHandle { area, corner };
        }
        let Some(ray) = self.projector.screen_ray(screen) else {
            return Target::None;
        };
        let ground = ray_ground_intersection(&ray, self.config.ground_height);
        if self.scene.draw_mode {
            if let Some(point) = ground {
                return Target::DrawPoint(point);
            }
        }
        if let Some(id) = self.building_hit(&ray) {
            return Target::Building(id);
        }
        if let Some((id, _)) = self.agents.pick_agent(&ray) {
            return Target::Agent(id);
        }
        let Some(point) = ground else {
            return Target::None;
        };
        if let Some(area) = self.scene.areas.iter().find(|area| area.contains(ground_xz(point))) {
            return Target::Area { id: area.id.clone(), point };
        }
        Target::Ground(point)
    }

    pub fn ground_point(&self, screen: Vec2) -> Option<Vec3> {
        let ray = self.projector.screen_ray(screen)?;
        ray_ground_intersection(&ray, self.config.ground_height)
    }

    fn resize_handle_at(&self, screen: Vec2) -> Option<(String, AreaCorner)> {
        let armed = self.scene.resize_armed?;
        let area = self.scene.areas.iter().find(|area| area.id == armed)?;
        let radius = self.config.resize_handle_radius_px;
        let mut best: Option<(AreaCorner, f32)> = None;
        for corner in AreaCorner::ALL {
            let ground = area.corner(corner);
            let world = Vec3::new(ground.x, self.config.ground_height, ground.y);
            let Some(projected) = self.projector.project_point(world) else {
                continue;
            };
            let dist = projected.distance(screen);
            if dist <= radius && best.map_or(true, |(_, d)| dist < d) {
                best = Some((corner, dist));
            }
        }
        best.map(|(corner, _)| (area.id.clone(), corner))
    }

    fn building_hit(&self, ray: &Ray) -> Option<String> {
        let mut best: Option<(&BuildingRecord, f32)> = None;
        for building in self.scene.buildings {
            let (min, max) = building.bounds();
            if let Some((t, _)) = ray_aabb_intersection(ray.origin, ray.dir, min, max) {
                if best.map_or(true, |(_, d)| t < d) {
                    best = Some((building, t));
                }
            }
        }
        best.map(|(building, _)| building.id.clone())
    }
}

pub fn ray_ground_intersection(ray: &Ray, ground_height: f32) -> Option<Vec3> {
    intersect_ray_plane(ray.origin, ray.dir, Vec3::new(0.0, ground_height, 0.0), Vec3::Y)
}

pub fn intersect_ray_plane(origin: Vec3, dir: Vec3, plane_origin: Vec3, plane_normal: Vec3) -> Option<Vec3> {
    let denom = plane_normal.dot(dir);
    if denom.abs() < 1e-4 {
        return None;
    }
    let t = (plane_origin - origin).dot(plane_normal) / denom;
    if t < 0.0 {
        return None;
    }
    Some(origin + dir * t)
}

/// Ray against a box given in local space and placed by `world`.
pub fn ray_hit_obb(origin: Vec3, dir: Vec3, world: &Mat4, min: Vec3, max: Vec3) -> Option<f32> {
    let inv = world.inverse();
    if !matrix_is_finite(&inv) {
        return None;
    }
    let origin_local = inv.transform_point3(origin);
    let dir_local = inv.transform_vector3(dir);
    if dir_local.length_squared() <= f32::EPSILON {
        return None;
    }
    let dir_local = dir_local.normalize();
    let (t_local, hit_local) = ray_aabb_intersection(origin_local, dir_local, min, max)?;
    if t_local < 0.0 {
        return None;
    }
    let hit_world = world.transform_point3(hit_local);
    Some((hit_world - origin).length())
}

pub fn world_matrix(translation: Vec3, rotation: Quat, scale: Vec3) -> Option<Mat4> {
    if !scale.is_finite() {
        return None;
    }
    let min_scale = 0.0001;
    let scale = Vec3::new(scale.x.abs().max(min_scale), scale.y.abs().max(min_scale), scale.z.abs().max(min_scale));
    Some(Mat4::from_scale_rotation_translation(scale, rotation, translation))
}

pub fn matrix_is_finite(mat: &Mat4) -> bool {
    mat.to_cols_array().iter().all(|v| v.is_finite())
}

pub fn ray_aabb_intersection(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_min: f32 = 0.0;
    let mut t_max: f32 = f32::INFINITY;
    let origin_arr = origin.to_array();
    let dir_arr = dir.to_array();
    let min_arr = min.to_array();
    let max_arr = max.to_array();
    for i in 0..3 {
        let o = origin_arr[i];
        let d = dir_arr[i];
        if d.abs() < 1e-6 {
            if o < min_arr[i] || o > max_arr[i] {
                return None;
            }
        } else {
            let inv_d = 1.0 / d;
            let mut t1 = (min_arr[i] - o) * inv_d;
            let mut t2 = (max_arr[i] - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    if t_max < 0.0 {
        return None;
    }
    let t_hit = if t_min >= 0.0 { t_min } else { t_max };
    Some((t_hit, origin + dir * t_hit))
}

/// Screen-space rectangle spanned by two corners, inclusive on every edge.
pub fn rect_contains(a: Vec2, b: Vec2, point: Vec2) -> bool {
    let min = a.min(b);
    let max = a.max(b);
    point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
}
