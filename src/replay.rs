//! Scripted replay of host activity through a [`CommandDeck`].

use crate::animation::ClipInfo;
use crate::assets::{AssetTier, CustomModel};
use crate::cli::CliOverrides;
use crate::config::DeckConfig;
use crate::deck::CommandDeck;
use crate::events::DeckCommand;
use crate::input::{Millis, PointerEvent};
use crate::roster::{AreaRecord, BuildingRecord, RosterSnapshot};
use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, Deserialize)]
pub struct Trace {
    #[serde(default = "Trace::default_viewport")]
    pub viewport: [u32; 2],
    #[serde(default)]
    pub steps: Vec<TraceStep>,
}

impl Trace {
    fn default_viewport() -> [u32; 2] {
        [1280, 720]
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read trace file {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse trace file {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TraceStep {
    AssetsReady { tier: AssetTier },
    Roster {
        #[serde(flatten)]
        snapshot: RosterSnapshot,
        #[serde(default)]
        full: bool,
    },
    Buildings { buildings: Vec<BuildingRecord> },
    Areas { areas: Vec<AreaRecord> },
    DrawMode { enabled: bool },
    ArmResize { area: Option<String> },
    Pointer { event: PointerEvent },
    Tick { now: Millis, #[serde(default)] dt: f32 },
    Model {
        key: String,
        #[serde(default)]
        clips: Vec<String>,
        #[serde(default)]
        error: Option<String>,
    },
    Brightness { value: f32 },
    Scale { value: f32 },
    IdleAnimation { clip: String },
    WorkingAnimation { clip: String },
}

#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub steps: usize,
    pub commands: Vec<DeckCommand>,
}

impl ReplaySummary {
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for command in &self.commands {
            *counts.entry(command.name()).or_insert(0) += 1;
        }
        counts
    }
}

pub fn replay(deck: &mut CommandDeck, trace: &Trace) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for step in &trace.steps {
        summary.steps += 1;
        let produced = apply_step(deck, step);
        for command in &produced {
            info!(step = summary.steps, "{command}");
        }
        summary.commands.extend(produced);
        for key in deck.take_model_requests() {
            info!(model = %key, "custom model requested");
        }
    }
    summary
}

fn apply_step(deck: &mut CommandDeck, step: &TraceStep) -> Vec<DeckCommand> {
    match step {
        TraceStep::AssetsReady { tier } => deck.on_character_assets_ready(*tier),
        TraceStep::Roster { snapshot, full: true } => deck.resync(snapshot),
        TraceStep::Roster { snapshot, full: false } => deck.apply_roster(snapshot),
        TraceStep::Buildings { buildings } => deck.set_buildings(buildings.clone()),
        TraceStep::Areas { areas } => deck.set_areas(areas.clone()),
        TraceStep::DrawMode { enabled } => deck.set_draw_mode(*enabled),
        TraceStep::ArmResize { area } => deck.arm_resize(area.clone()),
        TraceStep::Pointer { event } => return deck.handle_pointer(event),
        TraceStep::Tick { now, dt } => return deck.tick(*now, *dt),
        TraceStep::Model { key, clips, error } => {
            let result = match error {
                Some(message) => Err(anyhow!("{message}")),
                None => {
                    let clips = clips.iter().map(|name| ClipInfo::new(name.clone(), 1.0)).collect();
                    Ok(CustomModel::primitive(key.clone(), Vec3::new(0.7, 0.7, 0.9), clips))
                }
            };
            deck.resolve_custom_model(key, result);
        }
        TraceStep::Brightness { value } => deck.set_brightness(*value),
        TraceStep::Scale { value } => deck.set_character_scale(*value),
        TraceStep::IdleAnimation { clip } => deck.set_idle_animation(clip.clone()),
        TraceStep::WorkingAnimation { clip } => deck.set_working_animation(clip.clone()),
    }
    Vec::new()
}

/// Loads config and trace named on the command line and replays the trace.
pub fn run(cli: &CliOverrides) -> Result<ReplaySummary> {
    let mut config = match &cli.config {
        Some(path) => DeckConfig::load(path)?,
        None => DeckConfig::default(),
    };
    let overrides = cli.config_overrides();
    if !overrides.is_empty() {
        info!(fields = ?overrides.applied_fields(), "applying command-line overrides");
        config.apply_overrides(&overrides);
    }
    let trace = match &cli.trace {
        Some(path) => Trace::load(path)?,
        None => {
            warn!("no --trace given, replaying an empty trace");
            Trace { viewport: Trace::default_viewport(), steps: Vec::new() }
        }
    };
    let [width, height] = trace.viewport;
    let mut deck = CommandDeck::headless(config, PhysicalSize::new(width, height));
    let summary = replay(&mut deck, &trace);
    let stats = deck.pool().stats();
    info!(
        steps = summary.steps,
        commands = summary.commands.len(),
        live = stats.live,
        pending = stats.pending,
        awaiting = stats.awaiting_model,
        "replay finished"
    );
    for (name, count) in summary.counts() {
        info!(command = name, count, "command total");
    }
    Ok(summary)
}
