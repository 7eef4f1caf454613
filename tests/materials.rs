mod common;

use agent_deck::agent_pool::AgentMeshPool;
use agent_deck::animation::NullPlayer;
use agent_deck::assets::{AssetTier, CustomModel};
use agent_deck::config::{AnimationConfig, PoolConfig};
use agent_deck::material::{AdjustableMaterial, MaterialKind};
use agent_deck::roster::AgentRecord;
use agent_deck::scene::{NodeBlueprint, NodeRole};
use common::RecordingFactory;
use glam::Vec3;

fn pool(factory: &RecordingFactory) -> AgentMeshPool {
    let mut pool = AgentMeshPool::new(
        PoolConfig::default(),
        &AnimationConfig::default(),
        Box::new(factory.clone()),
        Box::new(NullPlayer),
    );
    pool.on_character_assets_ready(AssetTier::Basic);
    pool
}

fn materials_with_role(pool: &AgentMeshPool, id: &str, role: NodeRole) -> Vec<AdjustableMaterial> {
    pool.nodes(id)
        .iter()
        .filter(|node| pool.scene().role(**node) == Some(role))
        .flat_map(|node| pool.scene().materials(*node).to_vec())
        .collect()
}

#[test]
fn each_material_kind_follows_its_own_curve() {
    let factory = RecordingFactory::default();
    let mut pool = pool(&factory);
    pool.add(AgentRecord::new("std", Vec3::ZERO));
    pool.add(AgentRecord::new("cus", Vec3::X).with_custom_model("mech"));
    pool.resolve_custom_model("mech", Ok(CustomModel::primitive("mech", Vec3::ONE, Vec::new())));
    pool.set_brightness(0.5);

    let standard = &materials_with_role(&pool, "std", NodeRole::Body)[0];
    assert_eq!(standard.kind(), MaterialKind::Standard);
    assert!(standard.live().color.abs_diff_eq(standard.base().color * 0.5, 1e-6));

    let custom = &materials_with_role(&pool, "cus", NodeRole::Body)[0];
    assert_eq!(custom.kind(), MaterialKind::Custom);
    assert!(custom.live().color.x < custom.base().color.x * 0.5);
    assert!(custom.live().reflectivity < custom.base().reflectivity);

    let label = &materials_with_role(&pool, "std", NodeRole::Label)[0];
    assert_eq!(label.kind(), MaterialKind::Billboard);
    assert_eq!(label.live().color, label.base().color);
    assert!((label.live().opacity - 0.5).abs() < 1e-6);
}

#[test]
fn repeated_brightness_does_not_compound() {
    let factory = RecordingFactory::default();
    let mut pool = pool(&factory);
    pool.add(AgentRecord::new("a", Vec3::ZERO));
    pool.set_brightness(0.5);
    let once = materials_with_role(&pool, "a", NodeRole::Body);
    pool.set_brightness(0.5);
    pool.set_brightness(0.5);
    assert_eq!(materials_with_role(&pool, "a", NodeRole::Body), once);
}

#[test]
fn entities_created_later_pick_up_the_current_brightness() {
    let factory = RecordingFactory::default();
    let mut pool = pool(&factory);
    pool.set_brightness(0.25);
    pool.add(AgentRecord::new("late", Vec3::ZERO));
    let body = &materials_with_role(&pool, "late", NodeRole::Body)[0];
    assert!(body.live().color.abs_diff_eq(body.base().color * 0.25, 1e-6));
}

#[test]
fn broken_custom_model_falls_back_to_the_shared_avatar() {
    let factory = RecordingFactory::default();
    let mut pool = pool(&factory);
    pool.add(AgentRecord::new("a", Vec3::ZERO).with_custom_model("bad"));
    let headless = CustomModel { key: "bad".to_string(), body: NodeBlueprint::new("hat", NodeRole::Label), clips: Vec::new() };
    pool.resolve_custom_model("bad", Ok(headless));

    assert_eq!(pool.tier("a"), Some(AssetTier::Basic));
    assert_eq!(
        factory.builds(),
        vec![("a".to_string(), "custom:bad".to_string()), ("a".to_string(), "basic".to_string())]
    );
    let body = &materials_with_role(&pool, "a", NodeRole::Body)[0];
    assert_eq!(body.kind(), MaterialKind::Standard);
}
