//! Per-frame input snapshot consumed by layer updates.
//!
//! Device polling lives outside the engine; the application fills an
//! [`InputState`] each frame and hands it to
//! [`ViewSystem::update_all`](crate::view::ViewSystem::update_all), which
//! routes it front-to-back with claim propagation.

use glam::Vec2;
use rustc_hash::FxHashSet;
use winit::keyboard::KeyCode;

/// Gamepad stick snapshot (values in [-1, 1], untreated)
#[derive(Debug, Clone, Copy, Default)]
pub struct GamepadState {
    /// Left stick (movement)
    pub left_stick: Vec2,
    /// Right stick (look)
    pub right_stick: Vec2,
    /// Whether a gamepad is present this frame
    pub connected: bool,
}

/// Snapshot of input for one frame.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pressed: FxHashSet<KeyCode>,
    /// Mouse movement since the previous frame, in pixels
    pub mouse_delta: Vec2,
    /// Scroll wheel movement since the previous frame
    pub wheel_delta: f32,
    /// Whether the window currently captures the mouse
    pub mouse_captured: bool,
    /// Gamepad sticks
    pub gamepad: GamepadState,
}

impl InputState {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key as held
    pub fn press(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    /// Record a key as released
    pub fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    /// Whether a key is held this frame
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Clear per-frame deltas (key state persists across frames)
    pub fn begin_frame(&mut self) {
        self.mouse_delta = Vec2::ZERO;
        self.wheel_delta = 0.0;
    }
}
