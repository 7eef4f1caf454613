//! Pointer gesture disambiguation.
//!
//! Every pointer session (one per mouse or touch id) is resolved to exactly one
//! [`Classification`]. Mouse and touch sessions are tracked independently, and so is their
//! click memory, so a mouse click never pairs with a touch tap.

use crate::config::GestureConfig;
use crate::input::{Millis, Modifiers, PointerButton, PointerEvent, PointerKey, PointerKind};
use crate::picking::{Target, TargetCategory};
use crate::timer::{TimerHandle, TimerQueue};
use glam::Vec2;
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::trace;

pub type Gestures = SmallVec<[Gesture; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Click,
    DoubleClick,
    Drag,
    LongPress,
    Pinch,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// A pointer went down. Not a classification; lets the dispatcher arm captures.
    Press {
        pointer: PointerKey,
        button: PointerButton,
        position: Vec2,
        modifiers: Modifiers,
        target: Target,
    },
    Click {
        pointer: PointerKey,
        button: PointerButton,
        position: Vec2,
        modifiers: Modifiers,
        target: Target,
    },
    DoubleClick {
        pointer: PointerKey,
        button: PointerButton,
        position: Vec2,
        modifiers: Modifiers,
        target: Target,
    },
    DragStart {
        pointer: PointerKey,
        button: PointerButton,
        origin: Vec2,
        position: Vec2,
        modifiers: Modifiers,
        target: Target,
    },
    DragMove {
        pointer: PointerKey,
        button: PointerButton,
        origin: Vec2,
        position: Vec2,
        delta: Vec2,
    },
    DragEnd {
        pointer: PointerKey,
        button: PointerButton,
        origin: Vec2,
        position: Vec2,
        modifiers: Modifiers,
        target: Target,
    },
    LongPress {
        pointer: PointerKey,
        position: Vec2,
    },
    /// Ratio of the current inter-finger distance to the previous one.
    Pinch {
        ratio: f32,
        center: Vec2,
    },
    PinchEnd {
        pointer: PointerKey,
    },
    Zoom {
        delta: f32,
        position: Vec2,
    },
    Cancelled {
        pointer: PointerKey,
    },
}

impl Gesture {
    /// The classification this gesture completes, if it is a session's terminal gesture.
    pub fn classification(&self) -> Option<(PointerKey, Classification)> {
        match self {
            Gesture::Click { pointer, .. } => Some((*pointer, Classification::Click)),
            Gesture::DoubleClick { pointer, .. } => Some((*pointer, Classification::DoubleClick)),
            Gesture::DragEnd { pointer, .. } => Some((*pointer, Classification::Drag)),
            Gesture::LongPress { pointer, .. } => Some((*pointer, Classification::LongPress)),
            Gesture::PinchEnd { pointer } => Some((*pointer, Classification::Pinch)),
            Gesture::Cancelled { pointer } => Some((*pointer, Classification::Cancelled)),
            _ => None,
        }
    }

    pub fn pointer(&self) -> Option<PointerKey> {
        match self {
            Gesture::Press { pointer, .. }
            | Gesture::Click { pointer, .. }
            | Gesture::DoubleClick { pointer, .. }
            | Gesture::DragStart { pointer, .. }
            | Gesture::DragMove { pointer, .. }
            | Gesture::DragEnd { pointer, .. }
            | Gesture::LongPress { pointer, .. }
            | Gesture::PinchEnd { pointer }
            | Gesture::Cancelled { pointer } => Some(*pointer),
            Gesture::Pinch { .. } | Gesture::Zoom { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Pressed,
    Dragging,
    LongPressed,
    Pinching,
    /// Extra fingers beyond a pinch; resolved as cancelled.
    Inert,
}

#[derive(Debug)]
struct PointerSession {
    button: PointerButton,
    modifiers: Modifiers,
    origin: Vec2,
    last: Vec2,
    started_at: Millis,
    target: Target,
    phase: SessionPhase,
    long_press: Option<TimerHandle>,
}

#[derive(Debug, Clone, Copy)]
struct PinchState {
    a: PointerKey,
    b: PointerKey,
    distance: f32,
}

#[derive(Debug)]
struct ClickSlot {
    id: String,
    at: Millis,
}

#[derive(Debug, Default)]
struct ClickMemory {
    slots: HashMap<(PointerKind, TargetCategory), ClickSlot>,
}

impl ClickMemory {
    /// Records an accepted click; returns true when it completes a double click.
    fn register(&mut self, kind: PointerKind, category: TargetCategory, id: &str, at: Millis, window: Millis) -> bool {
        let key = (kind, category);
        if let Some(slot) = self.slots.get(&key) {
            if slot.id == id && at.saturating_sub(slot.at) <= window {
                self.slots.remove(&key);
                return true;
            }
        }
        self.slots.insert(key, ClickSlot { id: id.to_string(), at });
        false
    }
}

pub struct GestureDisambiguator {
    config: GestureConfig,
    sessions: HashMap<PointerKey, PointerSession>,
    timers: TimerQueue<PointerKey>,
    clicks: ClickMemory,
    pinch: Option<PinchState>,
}

impl GestureDisambiguator {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
            timers: TimerQueue::new(),
            clicks: ClickMemory::default(),
            pinch: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_active(&self, pointer: PointerKey) -> bool {
        self.sessions.contains_key(&pointer)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Feeds one event. `resolve` is only consulted for pointer-down, to find what lies under
    /// the press.
    pub fn handle<F>(&mut self, event: &PointerEvent, resolve: F) -> Gestures
    where
        F: FnOnce(Vec2) -> Target,
    {
        let mut out = Gestures::new();
        self.fire_due(event.time(), &mut out);
        match *event {
            PointerEvent::Down { pointer, button, position, modifiers, time } => {
                self.on_down(pointer, button, position, modifiers, time, resolve, &mut out);
            }
            PointerEvent::Move { pointer, position, .. } => self.on_move(pointer, position, &mut out),
            PointerEvent::Up { pointer, position, time } => self.on_up(pointer, position, time, &mut out),
            PointerEvent::Cancel { pointer, .. } => self.on_cancel(pointer, &mut out),
            PointerEvent::Wheel { delta, position, .. } => out.push(Gesture::Zoom { delta, position }),
        }
        out
    }

    /// Fires due long-press timers. Called once per frame by the host.
    pub fn tick(&mut self, now: Millis) -> Gestures {
        let mut out = Gestures::new();
        self.fire_due(now, &mut out);
        out
    }

    /// Drops every session, e.g. when the canvas loses focus.
    pub fn cancel_all(&mut self) -> Gestures {
        let mut out = Gestures::new();
        let mut keys: Vec<PointerKey> = self.sessions.keys().copied().collect();
        keys.sort_by_key(|key| (key.kind == PointerKind::Touch, key.id));
        for key in keys {
            if let Some(session) = self.sessions.remove(&key) {
                if session.phase != SessionPhase::LongPressed {
                    out.push(Gesture::Cancelled { pointer: key });
                }
            }
        }
        self.timers.clear();
        self.pinch = None;
        out
    }

    fn fire_due(&mut self, now: Millis, out: &mut Gestures) {
        for (handle, key) in self.timers.drain_due(now) {
            let Some(session) = self.sessions.get_mut(&key) else {
                trace!(pointer = ?key, "long-press timer fired for a closed session");
                continue;
            };
            if session.long_press != Some(handle) || session.phase != SessionPhase::Pressed {
                trace!(pointer = ?key, "stale long-press timer ignored");
                continue;
            }
            session.long_press = None;
            session.phase = SessionPhase::LongPressed;
            out.push(Gesture::LongPress { pointer: key, position: session.last });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_down<F>(
        &mut self,
        pointer: PointerKey,
        button: PointerButton,
        position: Vec2,
        modifiers: Modifiers,
        time: Millis,
        resolve: F,
        out: &mut Gestures,
    ) where
        F: FnOnce(Vec2) -> Target,
    {
        if self.sessions.contains_key(&pointer) {
            // Down without a matching up: close the previous session first.
            self.on_cancel(pointer, out);
        }

        let mut session = PointerSession {
            button,
            modifiers,
            origin: position,
            last: position,
            started_at: time,
            target: Target::None,
            phase: SessionPhase::Pressed,
            long_press: None,
        };

        if pointer.kind == PointerKind::Touch {
            let active: Vec<PointerKey> = self
                .sessions
                .iter()
                .filter(|(key, s)| key.kind == PointerKind::Touch && s.phase != SessionPhase::Inert)
                .map(|(key, _)| *key)
                .collect();
            if self.pinch.is_some() || active.len() >= 2 {
                session.phase = SessionPhase::Inert;
                self.sessions.insert(pointer, session);
                return;
            }
            if let Some(&other) = active.first() {
                let mut other_pos = position;
                if let Some(other_session) = self.sessions.get_mut(&other) {
                    if let Some(handle) = other_session.long_press.take() {
                        self.timers.cancel(handle);
                    }
                    if other_session.phase == SessionPhase::LongPressed {
                        // Already classified; it stays out of the pinch.
                        session.target = resolve(position);
                        self.start_touch_press(pointer, session, out);
                        return;
                    }
                    other_session.phase = SessionPhase::Pinching;
                    other_pos = other_session.last;
                }
                session.phase = SessionPhase::Pinching;
                self.sessions.insert(pointer, session);
                self.pinch = Some(PinchState { a: other, b: pointer, distance: other_pos.distance(position) });
                return;
            }
            session.target = resolve(position);
            self.start_touch_press(pointer, session, out);
            return;
        }

        session.target = resolve(position);
        out.push(Gesture::Press { pointer, button, position, modifiers, target: session.target.clone() });
        self.sessions.insert(pointer, session);
    }

    fn start_touch_press(&mut self, pointer: PointerKey, mut session: PointerSession, out: &mut Gestures) {
        let deadline = session.started_at + self.config.long_press_ms;
        session.long_press = Some(self.timers.schedule(deadline, pointer));
        out.push(Gesture::Press {
            pointer,
            button: session.button,
            position: session.origin,
            modifiers: session.modifiers,
            target: session.target.clone(),
        });
        self.sessions.insert(pointer, session);
    }

    fn on_move(&mut self, pointer: PointerKey, position: Vec2, out: &mut Gestures) {
        let threshold = self.drag_threshold(pointer.kind);
        let Some(session) = self.sessions.get_mut(&pointer) else {
            return;
        };
        let previous = session.last;
        session.last = position;
        let phase = session.phase;
        match phase {
            SessionPhase::Pressed => {
                // Strictly greater: a move landing exactly on the threshold is still a click.
                if session.origin.distance(position) > threshold {
                    if let Some(handle) = session.long_press.take() {
                        self.timers.cancel(handle);
                    }
                    session.phase = SessionPhase::Dragging;
                    out.push(Gesture::DragStart {
                        pointer,
                        button: session.button,
                        origin: session.origin,
                        position,
                        modifiers: session.modifiers,
                        target: session.target.clone(),
                    });
                }
            }
            SessionPhase::Dragging => {
                out.push(Gesture::DragMove {
                    pointer,
                    button: session.button,
                    origin: session.origin,
                    position,
                    delta: position - previous,
                });
            }
            SessionPhase::Pinching => self.update_pinch(out),
            SessionPhase::LongPressed | SessionPhase::Inert => {}
        }
    }

    fn update_pinch(&mut self, out: &mut Gestures) {
        let Some(mut pinch) = self.pinch else {
            return;
        };
        let (Some(a), Some(b)) = (self.sessions.get(&pinch.a), self.sessions.get(&pinch.b)) else {
            return;
        };
        let distance = a.last.distance(b.last);
        let center = (a.last + b.last) * 0.5;
        if pinch.distance > f32::EPSILON && distance > f32::EPSILON {
            out.push(Gesture::Pinch { ratio: distance / pinch.distance, center });
        }
        pinch.distance = distance;
        self.pinch = Some(pinch);
    }

    fn on_up(&mut self, pointer: PointerKey, position: Vec2, time: Millis, out: &mut Gestures) {
        let Some(mut session) = self.sessions.remove(&pointer) else {
            return;
        };
        session.last = position;
        if let Some(handle) = session.long_press.take() {
            self.timers.cancel(handle);
        }
        match session.phase {
            SessionPhase::Pressed => {
                if pointer.kind == PointerKind::Touch
                    && time.saturating_sub(session.started_at) > self.config.touch_tap_max_ms
                {
                    out.push(Gesture::Cancelled { pointer });
                    return;
                }
                out.push(self.classify_click(pointer, session, time));
            }
            SessionPhase::Dragging => out.push(Gesture::DragEnd {
                pointer,
                button: session.button,
                origin: session.origin,
                position,
                modifiers: session.modifiers,
                target: session.target,
            }),
            SessionPhase::LongPressed => {}
            SessionPhase::Pinching => {
                out.push(Gesture::PinchEnd { pointer });
                self.end_pinch(pointer, out);
            }
            SessionPhase::Inert => out.push(Gesture::Cancelled { pointer }),
        }
    }

    fn on_cancel(&mut self, pointer: PointerKey, out: &mut Gestures) {
        let Some(mut session) = self.sessions.remove(&pointer) else {
            return;
        };
        if let Some(handle) = session.long_press.take() {
            self.timers.cancel(handle);
        }
        let was_pinching = session.phase == SessionPhase::Pinching;
        if session.phase != SessionPhase::LongPressed {
            out.push(Gesture::Cancelled { pointer });
        }
        if was_pinching {
            self.end_pinch(pointer, out);
        }
    }

    /// The finger left behind after a pinch pans from where it is now.
    fn end_pinch(&mut self, lifted: PointerKey, out: &mut Gestures) {
        let Some(pinch) = self.pinch.take() else {
            return;
        };
        let remaining = if pinch.a == lifted { pinch.b } else { pinch.a };
        if let Some(session) = self.sessions.get_mut(&remaining) {
            if session.phase == SessionPhase::Pinching {
                session.phase = SessionPhase::Dragging;
                session.origin = session.last;
                session.target = Target::None;
                out.push(Gesture::DragStart {
                    pointer: remaining,
                    button: session.button,
                    origin: session.last,
                    position: session.last,
                    modifiers: session.modifiers,
                    target: Target::None,
                });
            }
        }
    }

    fn classify_click(&mut self, pointer: PointerKey, session: PointerSession, time: Millis) -> Gesture {
        let paired = session.button == PointerButton::Primary
            && match session.target.pairing_key() {
                Some((category, id)) => {
                    let window = self.double_click_window(pointer.kind, category);
                    self.clicks.register(pointer.kind, category, id, time, window)
                }
                None => false,
            };
        let PointerSession { button, modifiers, last, target, .. } = session;
        if paired {
            Gesture::DoubleClick { pointer, button, position: last, modifiers, target }
        } else {
            Gesture::Click { pointer, button, position: last, modifiers, target }
        }
    }

    fn drag_threshold(&self, kind: PointerKind) -> f32 {
        match kind {
            PointerKind::Mouse => self.config.mouse_drag_threshold_px,
            PointerKind::Touch => self.config.touch_drag_threshold_px,
        }
    }

    fn double_click_window(&self, kind: PointerKind, category: TargetCategory) -> Millis {
        match (kind, category) {
            (PointerKind::Touch, _) => self.config.touch_double_tap_ms,
            (PointerKind::Mouse, TargetCategory::Agent) => self.config.agent_double_click_ms,
            (PointerKind::Mouse, TargetCategory::Building) => self.config.building_double_click_ms,
            (PointerKind::Mouse, TargetCategory::Area) => self.config.area_double_click_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_memory_is_per_category() {
        let mut memory = ClickMemory::default();
        assert!(!memory.register(PointerKind::Mouse, TargetCategory::Building, "a", 0, 400));
        assert!(!memory.register(PointerKind::Mouse, TargetCategory::Agent, "x", 50, 300));
        assert!(memory.register(PointerKind::Mouse, TargetCategory::Building, "a", 100, 400));
        // consumed by the double click
        assert!(!memory.register(PointerKind::Mouse, TargetCategory::Building, "a", 150, 400));
    }

    #[test]
    fn click_memory_expires() {
        let mut memory = ClickMemory::default();
        assert!(!memory.register(PointerKind::Touch, TargetCategory::Agent, "a", 0, 300));
        assert!(!memory.register(PointerKind::Touch, TargetCategory::Agent, "a", 301, 300));
        assert!(memory.register(PointerKind::Touch, TargetCategory::Agent, "a", 601, 300));
    }
}
