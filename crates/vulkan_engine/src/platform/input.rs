//! Keyboard and mouse state accumulated from window events

use std::collections::HashSet;

use glfw::{Action, Key, MouseButton};

/// Read-only view of the input state for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Keys currently held down
    pub pressed_keys: HashSet<Key>,
    /// Mouse buttons currently held down
    pub pressed_buttons: HashSet<MouseButton>,
    /// Cursor X in window coordinates
    pub cursor_x: f64,
    /// Cursor Y in window coordinates
    pub cursor_y: f64,
}

impl InputSnapshot {
    /// Whether `key` is held
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Whether `button` is held
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }
}

/// Input state fed by window events
#[derive(Debug, Default)]
pub struct InputState {
    current: InputSnapshot,
}

impl InputState {
    /// Create an empty input state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a key event
    pub fn on_key(&mut self, key: Key, action: Action) {
        match action {
            Action::Press | Action::Repeat => {
                self.current.pressed_keys.insert(key);
            }
            Action::Release => {
                self.current.pressed_keys.remove(&key);
            }
        }
    }

    /// Apply a mouse button event
    pub fn on_mouse_button(&mut self, button: MouseButton, action: Action) {
        match action {
            Action::Press | Action::Repeat => {
                self.current.pressed_buttons.insert(button);
            }
            Action::Release => {
                self.current.pressed_buttons.remove(&button);
            }
        }
    }

    /// Apply a cursor move event
    pub fn on_cursor_pos(&mut self, x: f64, y: f64) {
        self.current.cursor_x = x;
        self.current.cursor_y = y;
    }

    /// Current snapshot
    pub const fn snapshot(&self) -> &InputSnapshot {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_press_and_release() {
        let mut input = InputState::new();
        input.on_key(Key::W, Action::Press);
        input.on_key(Key::A, Action::Repeat);
        assert!(input.snapshot().is_key_pressed(Key::W));
        assert!(input.snapshot().is_key_pressed(Key::A));

        input.on_key(Key::W, Action::Release);
        assert!(!input.snapshot().is_key_pressed(Key::W));
    }

    #[test]
    fn test_mouse_and_cursor() {
        let mut input = InputState::new();
        input.on_mouse_button(MouseButton::Button1, Action::Press);
        input.on_cursor_pos(10.5, 20.0);

        let snapshot = input.snapshot();
        assert!(snapshot.is_button_pressed(MouseButton::Button1));
        assert!((snapshot.cursor_x - 10.5).abs() < f64::EPSILON);
        assert!((snapshot.cursor_y - 20.0).abs() < f64::EPSILON);
    }
}
