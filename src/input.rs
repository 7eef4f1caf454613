use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

/// Milliseconds on the host's monotonic clock.
pub type Millis = u64;

pub type PointerId = u64;

/// Mouse events all share this id; touch ids come from the platform.
pub const MOUSE_POINTER_ID: PointerId = 0;

/// Pixels of wheel travel that winit reports per scrolled line.
const LINE_DELTA_PX: f32 = 100.0;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL = 0b0010;
        const ALT = 0b0100;
        const META = 0b1000;
    }
}

impl Modifiers {
    /// Shift, ctrl or meta extend a selection instead of replacing it.
    pub fn additive(self) -> bool {
        self.intersects(Modifiers::SHIFT | Modifiers::CTRL | Modifiers::META)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Mouse,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Identity of one pointer session. Mouse and touch ids live in separate spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerKey {
    pub kind: PointerKind,
    pub id: PointerId,
}

impl PointerKey {
    pub const MOUSE: PointerKey = PointerKey { kind: PointerKind::Mouse, id: MOUSE_POINTER_ID };

    pub fn touch(id: PointerId) -> Self {
        Self { kind: PointerKind::Touch, id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        pointer: PointerKey,
        #[serde(default)]
        button: PointerButton,
        position: Vec2,
        #[serde(default)]
        modifiers: Modifiers,
        time: Millis,
    },
    Move {
        pointer: PointerKey,
        position: Vec2,
        time: Millis,
    },
    Up {
        pointer: PointerKey,
        position: Vec2,
        time: Millis,
    },
    Cancel {
        pointer: PointerKey,
        time: Millis,
    },
    Wheel {
        delta: f32,
        position: Vec2,
        time: Millis,
    },
}

impl PointerEvent {
    pub fn time(&self) -> Millis {
        match self {
            PointerEvent::Down { time, .. }
            | PointerEvent::Move { time, .. }
            | PointerEvent::Up { time, .. }
            | PointerEvent::Cancel { time, .. }
            | PointerEvent::Wheel { time, .. } => *time,
        }
    }

    pub fn pointer(&self) -> Option<PointerKey> {
        match self {
            PointerEvent::Down { pointer, .. }
            | PointerEvent::Move { pointer, .. }
            | PointerEvent::Up { pointer, .. }
            | PointerEvent::Cancel { pointer, .. } => Some(*pointer),
            PointerEvent::Wheel { .. } => None,
        }
    }

    pub fn mouse_down(position: Vec2, time: Millis) -> Self {
        PointerEvent::Down {
            pointer: PointerKey::MOUSE,
            button: PointerButton::Primary,
            position,
            modifiers: Modifiers::empty(),
            time,
        }
    }

    pub fn mouse_press(button: PointerButton, modifiers: Modifiers, position: Vec2, time: Millis) -> Self {
        PointerEvent::Down { pointer: PointerKey::MOUSE, button, position, modifiers, time }
    }

    pub fn touch_down(id: PointerId, position: Vec2, time: Millis) -> Self {
        PointerEvent::Down {
            pointer: PointerKey::touch(id),
            button: PointerButton::Primary,
            position,
            modifiers: Modifiers::empty(),
            time,
        }
    }

    pub fn moved(pointer: PointerKey, position: Vec2, time: Millis) -> Self {
        PointerEvent::Move { pointer, position, time }
    }

    pub fn released(pointer: PointerKey, position: Vec2, time: Millis) -> Self {
        PointerEvent::Up { pointer, position, time }
    }
}

/// Tracks cursor and modifier state so that stateless winit events can be turned into
/// positioned pointer events.
#[derive(Debug, Default)]
pub struct PointerTranslator {
    cursor_pos: Option<Vec2>,
    modifiers: Modifiers,
}

impl PointerTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor_pos
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn translate(&mut self, ev: &WindowEvent, time: Millis) -> Option<PointerEvent> {
        match ev {
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                let mut flags = Modifiers::empty();
                flags.set(Modifiers::SHIFT, state.shift_key());
                flags.set(Modifiers::CTRL, state.control_key());
                flags.set(Modifiers::ALT, state.alt_key());
                flags.set(Modifiers::META, state.super_key());
                self.modifiers = flags;
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                self.cursor_pos = Some(position);
                Some(PointerEvent::Move { pointer: PointerKey::MOUSE, position, time })
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor_pos = None;
                None
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Left => PointerButton::Primary,
                    MouseButton::Right => PointerButton::Secondary,
                    MouseButton::Middle => PointerButton::Middle,
                    _ => return None,
                };
                let position = self.cursor_pos?;
                match state {
                    ElementState::Pressed => Some(PointerEvent::Down {
                        pointer: PointerKey::MOUSE,
                        button,
                        position,
                        modifiers: self.modifiers,
                        time,
                    }),
                    ElementState::Released => Some(PointerEvent::Up { pointer: PointerKey::MOUSE, position, time }),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y * LINE_DELTA_PX,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32,
                };
                let position = self.cursor_pos.unwrap_or(Vec2::ZERO);
                Some(PointerEvent::Wheel { delta, position, time })
            }
            WindowEvent::Touch(touch) => {
                let pointer = PointerKey::touch(touch.id);
                let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                Some(match touch.phase {
                    TouchPhase::Started => PointerEvent::Down {
                        pointer,
                        button: PointerButton::Primary,
                        position,
                        modifiers: self.modifiers,
                        time,
                    },
                    TouchPhase::Moved => PointerEvent::Move { pointer, position, time },
                    TouchPhase::Ended => PointerEvent::Up { pointer, position, time },
                    TouchPhase::Cancelled => PointerEvent::Cancel { pointer, time },
                })
            }
            _ => None,
        }
    }
}
