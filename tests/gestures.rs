use agent_deck::config::GestureConfig;
use agent_deck::gesture::{Classification, Gesture, GestureDisambiguator, Gestures};
use agent_deck::input::{PointerEvent, PointerKey};
use agent_deck::picking::Target;
use glam::{Vec2, Vec3};

fn classifications(gestures: &Gestures) -> Vec<(PointerKey, Classification)> {
    gestures.iter().filter_map(Gesture::classification).collect()
}

fn agent(id: &'static str) -> impl FnOnce(Vec2) -> Target {
    move |_| Target::Agent(id.to_string())
}

fn ground(pos: Vec2) -> Target {
    Target::Ground(Vec3::new(pos.x, 0.0, pos.y))
}

fn click(engine: &mut GestureDisambiguator, target: Target, at: u64) -> Gestures {
    let pos = Vec2::new(10.0, 10.0);
    engine.handle(&PointerEvent::mouse_down(pos, at), |_| target);
    engine.handle(&PointerEvent::released(PointerKey::MOUSE, pos, at + 20), |_| Target::None)
}

#[test]
fn movement_exactly_at_threshold_is_still_a_click() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let down = engine.handle(&PointerEvent::mouse_down(Vec2::ZERO, 0), ground);
    assert!(matches!(down.as_slice(), [Gesture::Press { .. }]));

    let moved = engine.handle(&PointerEvent::moved(PointerKey::MOUSE, Vec2::new(3.0, 4.0), 10), ground);
    assert!(moved.is_empty(), "a 5px move must not start a drag");

    let up = engine.handle(&PointerEvent::released(PointerKey::MOUSE, Vec2::new(3.0, 4.0), 40), ground);
    assert_eq!(classifications(&up), vec![(PointerKey::MOUSE, Classification::Click)]);
    assert_eq!(engine.active_sessions(), 0);
}

#[test]
fn movement_past_threshold_drags_with_deltas() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    engine.handle(&PointerEvent::mouse_down(Vec2::ZERO, 0), ground);
    let start = engine.handle(&PointerEvent::moved(PointerKey::MOUSE, Vec2::new(5.5, 0.0), 10), ground);
    assert!(matches!(start.as_slice(), [Gesture::DragStart { origin, .. }] if *origin == Vec2::ZERO));

    let step = engine.handle(&PointerEvent::moved(PointerKey::MOUSE, Vec2::new(8.0, 2.0), 20), ground);
    match step.as_slice() {
        [Gesture::DragMove { delta, .. }] => assert!(delta.abs_diff_eq(Vec2::new(2.5, 2.0), 1e-5)),
        other => panic!("expected a drag move, got {other:?}"),
    }

    let end = engine.handle(&PointerEvent::released(PointerKey::MOUSE, Vec2::new(8.0, 2.0), 30), ground);
    assert_eq!(classifications(&end), vec![(PointerKey::MOUSE, Classification::Drag)]);
}

#[test]
fn double_click_pairs_only_the_same_target() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let first = click(&mut engine, Target::Agent("a".into()), 0);
    assert_eq!(classifications(&first)[0].1, Classification::Click);
    let other = click(&mut engine, Target::Agent("b".into()), 100);
    assert_eq!(classifications(&other)[0].1, Classification::Click);
    let paired = click(&mut engine, Target::Agent("b".into()), 200);
    assert_eq!(classifications(&paired)[0].1, Classification::DoubleClick);
    let after = click(&mut engine, Target::Agent("b".into()), 300);
    assert_eq!(classifications(&after)[0].1, Classification::Click, "a consumed pair does not chain");
}

#[test]
fn each_category_has_its_own_window() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    click(&mut engine, Target::Agent("a".into()), 0);
    let late = click(&mut engine, Target::Agent("a".into()), 340);
    assert_eq!(classifications(&late)[0].1, Classification::Click, "agent window is 300ms");

    click(&mut engine, Target::Building("hq".into()), 1_000);
    let building = click(&mut engine, Target::Building("hq".into()), 1_350);
    assert_eq!(classifications(&building)[0].1, Classification::DoubleClick, "building window is 400ms");
}

#[test]
fn ground_never_pairs_and_modalities_do_not_mix() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let g = ground(Vec2::ZERO);
    click(&mut engine, g.clone(), 0);
    let second = click(&mut engine, g, 50);
    assert_eq!(classifications(&second)[0].1, Classification::Click);

    click(&mut engine, Target::Agent("a".into()), 1_000);
    engine.handle(&PointerEvent::touch_down(1, Vec2::ZERO, 1_050), agent("a"));
    let tap = engine.handle(&PointerEvent::released(PointerKey::touch(1), Vec2::ZERO, 1_100), ground);
    assert_eq!(classifications(&tap), vec![(PointerKey::touch(1), Classification::Click)]);
}

#[test]
fn touch_double_tap_uses_touch_window() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let finger = PointerKey::touch(3);
    engine.handle(&PointerEvent::touch_down(3, Vec2::ZERO, 0), agent("a"));
    engine.handle(&PointerEvent::released(finger, Vec2::ZERO, 100), ground);
    engine.handle(&PointerEvent::touch_down(3, Vec2::ZERO, 420), agent("a"));
    let second = engine.handle(&PointerEvent::released(finger, Vec2::ZERO, 440), ground);
    assert_eq!(classifications(&second), vec![(finger, Classification::DoubleClick)]);
}

#[test]
fn long_press_fires_once_and_release_is_silent() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let finger = PointerKey::touch(7);
    engine.handle(&PointerEvent::touch_down(7, Vec2::new(50.0, 50.0), 1_000), ground);
    assert_eq!(engine.pending_timers(), 1);
    assert!(engine.tick(1_499).is_empty());
    let fired = engine.tick(1_500);
    assert_eq!(classifications(&fired), vec![(finger, Classification::LongPress)]);
    assert!(engine.tick(5_000).is_empty());
    let up = engine.handle(&PointerEvent::released(finger, Vec2::new(50.0, 50.0), 2_000), ground);
    assert!(up.is_empty());
    assert_eq!(engine.active_sessions(), 0);
}

#[test]
fn slow_release_without_long_press_is_cancelled() {
    let config = GestureConfig { long_press_ms: 2_000, ..GestureConfig::default() };
    let mut engine = GestureDisambiguator::new(config);
    let finger = PointerKey::touch(1);
    engine.handle(&PointerEvent::touch_down(1, Vec2::ZERO, 0), ground);
    let up = engine.handle(&PointerEvent::released(finger, Vec2::ZERO, 301), ground);
    assert_eq!(classifications(&up), vec![(finger, Classification::Cancelled)]);
    assert_eq!(engine.pending_timers(), 0);
}

#[test]
fn touch_pan_cancels_the_long_press_timer() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let finger = PointerKey::touch(2);
    engine.handle(&PointerEvent::touch_down(2, Vec2::ZERO, 0), ground);
    let small = engine.handle(&PointerEvent::moved(finger, Vec2::new(12.0, 0.0), 50), ground);
    assert!(small.is_empty(), "touch threshold is 12px and exclusive");
    let pan = engine.handle(&PointerEvent::moved(finger, Vec2::new(13.0, 0.0), 60), ground);
    assert!(matches!(pan.as_slice(), [Gesture::DragStart { .. }]));
    assert_eq!(engine.pending_timers(), 0);
    assert!(engine.tick(10_000).is_empty());
    let end = engine.handle(&PointerEvent::released(finger, Vec2::new(13.0, 0.0), 900), ground);
    assert_eq!(classifications(&end), vec![(finger, Classification::Drag)]);
}

#[test]
fn two_fingers_pinch_then_remaining_finger_pans() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let (one, two) = (PointerKey::touch(1), PointerKey::touch(2));
    engine.handle(&PointerEvent::touch_down(1, Vec2::ZERO, 0), ground);
    let second = engine.handle(&PointerEvent::touch_down(2, Vec2::new(10.0, 0.0), 10), ground);
    assert!(second.is_empty());
    assert_eq!(engine.pending_timers(), 0, "pinching cancels the first finger's long press");

    let spread = engine.handle(&PointerEvent::moved(two, Vec2::new(20.0, 0.0), 20), ground);
    match spread.as_slice() {
        [Gesture::Pinch { ratio, center }] => {
            assert!((ratio - 2.0).abs() < 1e-5);
            assert!(center.abs_diff_eq(Vec2::new(10.0, 0.0), 1e-5));
        }
        other => panic!("expected a pinch, got {other:?}"),
    }

    let lifted = engine.handle(&PointerEvent::released(two, Vec2::new(20.0, 0.0), 30), ground);
    assert_eq!(classifications(&lifted), vec![(two, Classification::Pinch)]);
    assert!(lifted
        .iter()
        .any(|g| matches!(g, Gesture::DragStart { pointer, target: Target::None, .. } if *pointer == one)));

    let pan = engine.handle(&PointerEvent::moved(one, Vec2::new(0.0, 5.0), 40), ground);
    assert!(matches!(pan.as_slice(), [Gesture::DragMove { delta, .. }] if *delta == Vec2::new(0.0, 5.0)));
    let end = engine.handle(&PointerEvent::released(one, Vec2::new(0.0, 5.0), 50), ground);
    assert_eq!(classifications(&end), vec![(one, Classification::Drag)]);
}

#[test]
fn third_finger_is_inert() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    engine.handle(&PointerEvent::touch_down(1, Vec2::ZERO, 0), ground);
    engine.handle(&PointerEvent::touch_down(2, Vec2::new(10.0, 0.0), 5), ground);
    let third = engine.handle(&PointerEvent::touch_down(3, Vec2::new(20.0, 0.0), 10), ground);
    assert!(third.is_empty());
    let moved = engine.handle(&PointerEvent::moved(PointerKey::touch(3), Vec2::new(60.0, 0.0), 20), ground);
    assert!(moved.is_empty());
    let up = engine.handle(&PointerEvent::released(PointerKey::touch(3), Vec2::new(60.0, 0.0), 30), ground);
    assert_eq!(classifications(&up), vec![(PointerKey::touch(3), Classification::Cancelled)]);
}

#[test]
fn cancel_clears_timers_and_late_ticks_are_ignored() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let finger = PointerKey::touch(4);
    engine.handle(&PointerEvent::touch_down(4, Vec2::ZERO, 0), ground);
    let cancelled = engine.handle(&PointerEvent::Cancel { pointer: finger, time: 100 }, ground);
    assert_eq!(classifications(&cancelled), vec![(finger, Classification::Cancelled)]);
    assert_eq!(engine.pending_timers(), 0);
    assert!(engine.tick(1_000).is_empty());
    assert_eq!(engine.active_sessions(), 0);
}

#[test]
fn every_session_gets_exactly_one_classification() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let mut all = Vec::new();
    let script = [
        PointerEvent::mouse_down(Vec2::ZERO, 0),
        PointerEvent::touch_down(1, Vec2::new(100.0, 0.0), 5),
        PointerEvent::moved(PointerKey::MOUSE, Vec2::new(30.0, 0.0), 10),
        PointerEvent::touch_down(2, Vec2::new(120.0, 0.0), 15),
        PointerEvent::moved(PointerKey::touch(2), Vec2::new(140.0, 0.0), 20),
        PointerEvent::released(PointerKey::MOUSE, Vec2::new(30.0, 0.0), 30),
        PointerEvent::released(PointerKey::touch(1), Vec2::new(100.0, 0.0), 40),
        PointerEvent::released(PointerKey::touch(2), Vec2::new(140.0, 0.0), 50),
        PointerEvent::touch_down(1, Vec2::ZERO, 2_000),
        PointerEvent::mouse_down(Vec2::ZERO, 2_000),
        PointerEvent::mouse_down(Vec2::ZERO, 2_010),
        PointerEvent::released(PointerKey::MOUSE, Vec2::ZERO, 2_020),
    ];
    for event in &script {
        all.extend(classifications(&engine.handle(event, ground)));
    }
    all.extend(classifications(&engine.tick(3_000)));
    all.extend(classifications(&engine.handle(&PointerEvent::released(PointerKey::touch(1), Vec2::ZERO, 3_100), ground)));

    // mouse drag, pinch finger, pan finger, long press, re-pressed mouse, final mouse click
    assert_eq!(all.len(), 6, "{all:?}");
    assert_eq!(engine.active_sessions(), 0);
}

#[test]
fn wheel_zooms_without_a_session() {
    let mut engine = GestureDisambiguator::new(GestureConfig::default());
    let out = engine.handle(&PointerEvent::Wheel { delta: 120.0, position: Vec2::new(5.0, 5.0), time: 0 }, ground);
    assert!(matches!(out.as_slice(), [Gesture::Zoom { delta, .. }] if *delta == 120.0));
    assert_eq!(engine.active_sessions(), 0);
}
