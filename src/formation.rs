use crate::config::FormationConfig;
use crate::roster::AgentId;
use glam::Vec3;
use std::f32::consts::{PI, TAU};

/// Destinations for a multi-agent move, in the order the agents were given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormationPlan {
    pub slots: Vec<(AgentId, Vec3)>,
}

impl FormationPlan {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn destination(&self, id: &str) -> Option<Vec3> {
        self.slots.iter().find(|(agent, _)| agent == id).map(|(_, dest)| *dest)
    }
}

#[derive(Debug, Clone)]
pub struct FormationPlanner {
    config: FormationConfig,
}

impl FormationPlanner {
    pub fn new(config: FormationConfig) -> Self {
        Self { config }
    }

    pub fn plan(&self, center: Vec3, ids: &[AgentId]) -> FormationPlan {
        let count = ids.len();
        let offsets: Vec<Vec3> = match count {
            0 => Vec::new(),
            1 => vec![Vec3::ZERO],
            n if n <= self.config.circle_max.max(1) => circle_offsets(n, self.config.spacing),
            n => grid_offsets(n, self.config.spacing),
        };
        let slots = ids.iter().cloned().zip(offsets).map(|(id, offset)| (id, center + offset)).collect();
        FormationPlan { slots }
    }
}

/// Evenly spaced on a circle whose chord between neighbours equals `spacing`.
fn circle_offsets(count: usize, spacing: f32) -> Vec<Vec3> {
    let radius = spacing / (2.0 * (PI / count as f32).sin());
    (0..count)
        .map(|slot| {
            let angle = TAU * slot as f32 / count as f32;
            Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
        })
        .collect()
}

/// Row-major square grid centred on the origin.
fn grid_offsets(count: usize, spacing: f32) -> Vec<Vec3> {
    let side = (count as f32).sqrt().ceil() as usize;
    let half = (side as f32 - 1.0) * 0.5;
    (0..count)
        .map(|slot| {
            let row = slot / side;
            let col = slot % side;
            Vec3::new((col as f32 - half) * spacing, 0.0, (row as f32 - half) * spacing)
        })
        .collect()
}
