pub mod keyboard;
pub mod mouse;

pub use keyboard::{KeyCode, KeyState};
pub use mouse::MouseButton;

use std::fmt;
use std::time::Instant;

/// Переход клавиши или кнопки, пойманный слушателем
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key {
        code: KeyCode,
        state: KeyState,
        timestamp: Instant,
    },
    Button {
        button: MouseButton,
        state: KeyState,
        timestamp: Instant,
    },
}

// Конструкторы с текущим временем, для тестов
#[cfg(test)]
impl InputEvent {
    pub fn key_down(code: KeyCode) -> Self {
        Self::key_at(code, KeyState::Pressed, Instant::now())
    }

    pub fn key_up(code: KeyCode) -> Self {
        Self::key_at(code, KeyState::Released, Instant::now())
    }

    pub fn button_down(button: MouseButton) -> Self {
        Self::button_at(button, KeyState::Pressed, Instant::now())
    }

    pub fn button_up(button: MouseButton) -> Self {
        Self::button_at(button, KeyState::Released, Instant::now())
    }
}

impl InputEvent {
    pub fn key_at(code: KeyCode, state: KeyState, timestamp: Instant) -> Self {
        InputEvent::Key { code, state, timestamp }
    }

    pub fn button_at(button: MouseButton, state: KeyState, timestamp: Instant) -> Self {
        InputEvent::Button { button, state, timestamp }
    }

    /// Переводит сырое evdev событие типа KEY в наше представление.
    /// Кнопки BTN_* мыши становятся `Button`, прочие BTN_* (джойстики, тач) отбрасываются.
    pub fn from_evdev(code: u16, value: i32, timestamp: Instant) -> Option<Self> {
        let state = KeyState::from_evdev_value(value)?;

        if let Some(button) = MouseButton::from_evdev_code(code) {
            return Some(Self::button_at(button, state, timestamp));
        }

        // BTN_MISC..KEY_OK: диапазон кнопок, не являющихся клавишами
        if (0x100..0x160).contains(&code) {
            return None;
        }

        Some(Self::key_at(KeyCode(code), state, timestamp))
    }

    pub fn state(&self) -> KeyState {
        match self {
            InputEvent::Key { state, .. } | InputEvent::Button { state, .. } => *state,
        }
    }

    pub fn timestamp(&self) -> Instant {
        match self {
            InputEvent::Key { timestamp, .. } | InputEvent::Button { timestamp, .. } => *timestamp,
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputEvent::Key { code, state, .. } => write!(f, "{} {:?}", code, state),
            InputEvent::Button { button, state, .. } => write!(f, "{} {:?}", button, state),
        }
    }
}
