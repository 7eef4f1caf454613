mod common;

use agent_deck::agent_pool::AgentMeshPool;
use agent_deck::animation::{
    AnimationBindingState, AnimationSelector, AnimationTarget, ClassAnimationMapping, ClipInfo, ProceduralMode,
};
use agent_deck::assets::{AssetTier, CustomModel, PrimitiveAvatarFactory};
use agent_deck::config::{AnimationConfig, PoolConfig};
use agent_deck::roster::{AgentRecord, AgentStatus};
use common::{PlayerCall, RecordingPlayer};
use glam::Vec3;

fn clips(names: &[&str]) -> Vec<ClipInfo> {
    names.iter().map(|name| ClipInfo::new(*name, 1.0)).collect()
}

fn selector_with_robot_class() -> AnimationSelector {
    let mut config = AnimationConfig::default();
    config.classes.insert(
        "robot".to_string(),
        ClassAnimationMapping { idle: Some("Hover".to_string()), working: Some("Weld".to_string()) },
    );
    AnimationSelector::new(&config)
}

fn clip(name: &str, one_shot: bool) -> AnimationTarget {
    AnimationTarget::Clip { name: name.to_string(), one_shot }
}

#[test]
fn class_mapping_wins_when_the_clip_exists() {
    let selector = selector_with_robot_class();
    let available = clips(&["Hover", "Weld", "Idle", "Working"]);
    assert_eq!(selector.resolve(AgentStatus::Idle, "robot", &available), clip("Hover", false));
    assert_eq!(selector.resolve(AgentStatus::Working, "robot", &available), clip("Weld", false));
    assert_eq!(selector.resolve(AgentStatus::Idle, "human", &available), clip("Idle", false));
}

#[test]
fn missing_class_clip_falls_back_to_global_mapping() {
    let selector = selector_with_robot_class();
    let available = clips(&["Idle", "Working"]);
    assert_eq!(selector.resolve(AgentStatus::Working, "robot", &available), clip("Working", false));
}

#[test]
fn missing_global_clip_falls_back_to_class_idle_then_first() {
    let selector = selector_with_robot_class();
    let with_hover = clips(&["Run", "Hover"]);
    assert_eq!(selector.resolve(AgentStatus::Waiting, "robot", &with_hover), clip("Hover", false));
    let bare = clips(&["Run", "Jump"]);
    assert_eq!(selector.resolve(AgentStatus::Waiting, "robot", &bare), clip("Run", false));
    assert_eq!(selector.resolve(AgentStatus::Error, "human", &bare), clip("Run", false));
}

#[test]
fn status_clips_carry_one_shot_flags() {
    let selector = AnimationSelector::new(&AnimationConfig::default());
    let available = clips(&["Idle", "Working", "Wave", "Yes", "No", "Death", "Sitting"]);
    assert_eq!(selector.resolve(AgentStatus::Offline, "x", &available), clip("Death", true));
    assert_eq!(selector.resolve(AgentStatus::Error, "x", &available), clip("No", true));
    assert_eq!(selector.resolve(AgentStatus::WaitingPermission, "x", &available), clip("Yes", true));
    assert_eq!(selector.resolve(AgentStatus::Waiting, "x", &available), clip("Wave", false));
    assert_eq!(selector.resolve(AgentStatus::Orphaned, "x", &available), clip("Sitting", false));
}

#[test]
fn zero_clips_select_a_procedural_mode() {
    let selector = AnimationSelector::new(&AnimationConfig::default());
    let cases = [
        (AgentStatus::Idle, ProceduralMode::Idle),
        (AgentStatus::Working, ProceduralMode::Working),
        (AgentStatus::Waiting, ProceduralMode::Waiting),
        (AgentStatus::WaitingPermission, ProceduralMode::Waiting),
        (AgentStatus::Error, ProceduralMode::Error),
        (AgentStatus::Offline, ProceduralMode::Static),
        (AgentStatus::Orphaned, ProceduralMode::Static),
    ];
    for (status, mode) in cases {
        assert_eq!(selector.resolve(status, "any", &[]), AnimationTarget::Procedural(mode), "{status}");
    }
}

#[test]
fn binding_state_only_reports_changes() {
    let mut state = AnimationBindingState::default();
    assert!(state.transition(clip("Death", true)));
    assert!(state.is_one_shot());
    assert!(!state.transition(clip("Death", true)), "a current one-shot is not restarted");
    assert!(state.transition(clip("Idle", false)));
    assert!(!state.transition(clip("Idle", false)));
    assert!(state.transition(AnimationTarget::Procedural(ProceduralMode::Idle)));
    assert_eq!(state.current_clip(), None);
    state.reset();
    assert!(state.current().is_none());
}

fn full_pool(player: &RecordingPlayer) -> AgentMeshPool {
    let mut pool = AgentMeshPool::new(
        PoolConfig::default(),
        &AnimationConfig::default(),
        Box::new(PrimitiveAvatarFactory::default()),
        Box::new(player.clone()),
    );
    pool.on_character_assets_ready(AssetTier::Full);
    pool
}

#[test]
fn status_changes_replay_looping_clips_and_hold_one_shots() {
    let player = RecordingPlayer::default();
    let mut pool = full_pool(&player);
    pool.add(AgentRecord::new("a", Vec3::ZERO));
    pool.update(AgentRecord::new("a", Vec3::ZERO).with_status(AgentStatus::Offline), false);
    pool.update(AgentRecord::new("a", Vec3::ZERO).with_status(AgentStatus::Offline), false);
    pool.update(AgentRecord::new("a", Vec3::ZERO).with_status(AgentStatus::Working), false);
    assert_eq!(player.plays_for("a"), vec!["Idle", "Death", "Working"]);
    assert!(player.calls().contains(&PlayerCall::Play { agent: "a".into(), clip: "Death".into(), looped: false }));
    assert!(player.calls().contains(&PlayerCall::Play { agent: "a".into(), clip: "Working".into(), looped: true }));
}

#[test]
fn basic_avatars_switch_procedural_modes() {
    let player = RecordingPlayer::default();
    let mut pool = AgentMeshPool::new(
        PoolConfig::default(),
        &AnimationConfig::default(),
        Box::new(PrimitiveAvatarFactory::default()),
        Box::new(player.clone()),
    );
    pool.on_character_assets_ready(AssetTier::Basic);
    pool.add(AgentRecord::new("a", Vec3::ZERO).with_status(AgentStatus::Error));
    pool.update(AgentRecord::new("a", Vec3::ZERO).with_status(AgentStatus::Orphaned), false);
    let modes: Vec<_> = player
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            PlayerCall::Procedural { mode, .. } => Some(mode),
            _ => None,
        })
        .collect();
    assert_eq!(modes, vec![ProceduralMode::Error, ProceduralMode::Static]);
    assert!(player.plays_for("a").is_empty());
}

#[test]
fn runtime_overrides_reanimate_matching_agents() {
    let player = RecordingPlayer::default();
    let mut pool = full_pool(&player);
    pool.add(AgentRecord::new("idle", Vec3::ZERO));
    pool.add(AgentRecord::new("busy", Vec3::X).with_status(AgentStatus::Working));
    player.clear();

    pool.set_idle_animation("Sitting");
    assert_eq!(player.plays_for("idle"), vec!["Sitting"]);
    assert!(player.plays_for("busy").is_empty());

    pool.set_working_animation("ThumbsUp");
    assert_eq!(player.plays_for("busy"), vec!["ThumbsUp"]);
    assert_eq!(pool.animation_state("busy").and_then(|state| state.current_clip()), Some("ThumbsUp"));
}

#[test]
fn avatars_without_a_walk_clip_keep_their_status_clip_while_moving() {
    let player = RecordingPlayer::default();
    let mut pool = full_pool(&player);
    pool.add(AgentRecord::new("m", Vec3::ZERO).with_custom_model("mech"));
    pool.resolve_custom_model("mech", Ok(CustomModel::primitive("mech", Vec3::ONE, clips(&["Idle"]))));
    pool.update(AgentRecord::new("m", Vec3::new(8.0, 0.0, 0.0)).with_custom_model("mech"), true);
    assert!(pool.is_moving("m"));
    assert_eq!(player.plays_for("m"), vec!["Idle"]);
}
